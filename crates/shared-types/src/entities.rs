//! # Core Marketplace Documents
//!
//! Every document stored by the marketplace, with its status enums.
//!
//! ## Validation
//!
//! Documents are validated when they cross the transaction boundary. A stored
//! document failing [`Document::validate`] is treated as corrupt; a
//! caller-supplied document failing it is rejected as an invalid argument.

use crate::errors::{require_non_empty, validate_entity_id, ValidationError};
use crate::paths::Collection;
use crate::time::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A typed record stored under one collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection this document type lives in.
    const COLLECTION: Collection;

    /// Document id within the collection.
    fn doc_id(&self) -> String;

    /// Structural checks applied on every read and write.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Wallet and eligibility state of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDoc {
    pub uid: String,
    /// Coin balance. Only the wallet ledger writes it.
    #[serde(default)]
    pub wallet_balance: u64,
    /// Derived by the eligibility engine; never written elsewhere.
    #[serde(default)]
    pub allowed_category_ids: BTreeSet<String>,
    #[serde(default)]
    pub basic_approved: bool,
    #[serde(default)]
    pub allowed_updated_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl UserDoc {
    pub fn new(uid: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            uid: uid.into(),
            wallet_balance: 0,
            allowed_category_ids: BTreeSet::new(),
            basic_approved: false,
            allowed_updated_at: None,
            created_at,
        }
    }

    #[must_use]
    pub fn is_allowed(&self, category_id: &str) -> bool {
        self.allowed_category_ids.contains(category_id)
    }
}

impl Document for UserDoc {
    const COLLECTION: Collection = Collection::Users;

    fn doc_id(&self) -> String {
        self.uid.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id("uid", &self.uid)
    }
}

// =============================================================================
// TASKS
// =============================================================================

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Draft,
    /// Accepting offers. Older records spell this `open`.
    #[serde(alias = "open")]
    Listed,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    UnderReview,
}

impl TaskStatus {
    /// States in which `assigned_helper_id` must be set.
    #[must_use]
    pub fn has_helper(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress | Self::Completed)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Listed => "listed",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::UnderReview => "under_review",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work posted by a poster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDoc {
    pub task_id: String,
    /// Immutable owner. Authoritative for every ownership check.
    pub poster_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Normalized category slug.
    pub category_id: String,
    #[serde(default)]
    pub budget: Option<u64>,
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_helper_id: Option<String>,
    #[serde(default)]
    pub accepted_offer_id: Option<String>,
    #[serde(default)]
    pub final_amount: Option<u64>,
    /// Ledger key of the post-fee entry once charged.
    #[serde(default)]
    pub post_fee_txn_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Stands in for the task in invite ids and direct-contact keys when an
/// invite names no task. Never a valid task id.
pub const NO_TASK: &str = "none";

impl Document for TaskDoc {
    const COLLECTION: Collection = Collection::Tasks;

    fn doc_id(&self) -> String {
        self.task_id.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id("task_id", &self.task_id)?;
        if self.task_id == NO_TASK {
            return Err(ValidationError::InvalidField {
                field: "task_id",
                reason: format!("`{NO_TASK}` is reserved for task-less invites"),
            });
        }
        validate_entity_id("poster_id", &self.poster_id)?;
        require_non_empty("category_id", &self.category_id)?;
        if self.status != TaskStatus::Draft {
            require_non_empty("title", &self.title)?;
        }
        if self.status.has_helper() != self.assigned_helper_id.is_some() {
            return Err(ValidationError::Inconsistent(format!(
                "task {} in status {} has assigned_helper_id={:?}",
                self.task_id, self.status, self.assigned_helper_id
            )));
        }
        Ok(())
    }
}

// =============================================================================
// OFFERS
// =============================================================================

/// Offer negotiation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Negotiating,
    Counter,
    Accepted,
    Rejected,
    Withdrawn,
    AwaitingTopup,
}

impl OfferStatus {
    /// Accepted, rejected and withdrawn offers are immutable.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Withdrawn)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Negotiating => "negotiating",
            Self::Counter => "counter",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::AwaitingTopup => "awaiting_topup",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested negotiation move on an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferAction {
    /// Helper proposes a different price.
    HelperCounter,
    /// Poster proposes a different price.
    ProposeCounter,
    /// Helper agrees to the poster's counter price.
    AgreeToCounter,
    /// Poster accepts the offer.
    Accept,
    /// Poster rejects the offer.
    Reject,
    /// Helper withdraws the offer.
    Withdraw,
}

impl OfferAction {
    /// Whether the poster (as opposed to the helper) performs this move.
    #[must_use]
    pub fn by_poster(&self) -> bool {
        matches!(self, Self::ProposeCounter | Self::Accept | Self::Reject)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HelperCounter => "helper_counter",
            Self::ProposeCounter => "propose_counter",
            Self::AgreeToCounter => "agree_to_counter",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for OfferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the helper came to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferOrigin {
    /// Found the listing; pays the acceptance fee.
    #[default]
    Public,
    /// Invited by the poster, who already paid the direct contact fee.
    Direct,
}

/// A helper's bid on a task and its negotiation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDoc {
    pub offer_id: String,
    pub task_id: String,
    pub helper_id: String,
    /// Cached copy of the task owner, refreshed by every transition.
    pub poster_id: String,
    pub amount: u64,
    #[serde(default)]
    pub counter_price: Option<u64>,
    #[serde(default)]
    pub counter_note: Option<String>,
    #[serde(default)]
    pub helper_counter_price: Option<u64>,
    #[serde(default)]
    pub helper_agreed: bool,
    #[serde(default)]
    pub origin: OfferOrigin,
    pub status: OfferStatus,
    /// Status to fall back to once a top-up hold lapses.
    #[serde(default)]
    pub held_from: Option<OfferStatus>,
    #[serde(default)]
    pub top_up_deadline: Option<Timestamp>,
    #[serde(default)]
    pub reject_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Document for OfferDoc {
    const COLLECTION: Collection = Collection::Offers;

    fn doc_id(&self) -> String {
        self.offer_id.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id("offer_id", &self.offer_id)?;
        validate_entity_id("task_id", &self.task_id)?;
        validate_entity_id("helper_id", &self.helper_id)?;
        if self.amount == 0 {
            return Err(ValidationError::InvalidField {
                field: "amount",
                reason: "must be positive".into(),
            });
        }
        if self.counter_price == Some(0) || self.helper_counter_price == Some(0) {
            return Err(ValidationError::InvalidField {
                field: "counter_price",
                reason: "must be positive".into(),
            });
        }
        let holding = self.status == OfferStatus::AwaitingTopup;
        if holding != (self.held_from.is_some() && self.top_up_deadline.is_some()) {
            return Err(ValidationError::Inconsistent(format!(
                "offer {} in status {} has held_from={:?} top_up_deadline={:?}",
                self.offer_id, self.status, self.held_from, self.top_up_deadline
            )));
        }
        if let Some(prior) = self.held_from {
            if prior.is_terminal() || prior == OfferStatus::AwaitingTopup {
                return Err(ValidationError::InvalidField {
                    field: "held_from",
                    reason: format!("cannot hold from {prior}"),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// WALLET LEDGER
// =============================================================================

/// Reason a ledger entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    PostFee,
    Commission,
    AcceptFee,
    DirectContactFee,
    Topup,
    DisputeAdjustment,
}

impl LedgerKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostFee => "post_fee",
            Self::Commission => "commission",
            Self::AcceptFee => "accept_fee",
            Self::DirectContactFee => "direct_contact_fee",
            Self::Topup => "topup",
            Self::DisputeAdjustment => "dispute_adjustment",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-once record of one balance mutation, stored under its idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: String,
    pub uid: String,
    pub kind: LedgerKind,
    /// Negative for charges, positive for credits.
    pub amount: i64,
    pub balance_after: u64,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub offer_id: Option<String>,
    #[serde(default)]
    pub dispute_id: Option<String>,
    pub created_at: Timestamp,
}

impl Document for LedgerEntry {
    const COLLECTION: Collection = Collection::WalletLedger;

    fn doc_id(&self) -> String {
        self.key.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id("key", &self.key)?;
        validate_entity_id("uid", &self.uid)?;
        if self.amount == 0 {
            return Err(ValidationError::InvalidField {
                field: "amount",
                reason: "ledger entries record non-zero mutations".into(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// CATEGORY PROOFS
// =============================================================================

/// Review status of a proof. Parsed case-insensitively; `verified` is an
/// alias of `approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProofStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProofStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        *self == Self::Approved
    }
}

impl FromStr for ProofStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" | "verified" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ValidationError::InvalidField {
                field: "status",
                reason: format!("unknown proof status `{other}`"),
            }),
        }
    }
}

impl TryFrom<String> for ProofStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProofStatus> for String {
    fn from(status: ProofStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the category is performed remotely or in person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofMode {
    #[default]
    Online,
    Physical,
}

/// Evidence a user is qualified for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProof {
    pub uid: String,
    pub category_id: String,
    pub status: ProofStatus,
    #[serde(default)]
    pub mode: ProofMode,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    pub updated_at: Timestamp,
}

impl CategoryProof {
    /// Id of the proof for `(uid, category_id)`.
    #[must_use]
    pub fn proof_id(uid: &str, category_id: &str) -> String {
        format!("{uid}:{category_id}")
    }

    /// Id prefix shared by every proof of `uid`.
    #[must_use]
    pub fn prefix_for(uid: &str) -> String {
        format!("{uid}:")
    }
}

impl Document for CategoryProof {
    const COLLECTION: Collection = Collection::CategoryProofs;

    fn doc_id(&self) -> String {
        Self::proof_id(&self.uid, &self.category_id)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id("uid", &self.uid)?;
        require_non_empty("category_id", &self.category_id)?;
        if self.uid.contains(':') {
            return Err(ValidationError::InvalidField {
                field: "uid",
                reason: "must not contain ':'".into(),
            });
        }
        Ok(())
    }
}

/// Basic identity verification; gates physical-mode categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicApproval {
    pub uid: String,
    pub status: ProofStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    pub updated_at: Timestamp,
}

impl Document for BasicApproval {
    const COLLECTION: Collection = Collection::BasicDocs;

    fn doc_id(&self) -> String {
        self.uid.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id("uid", &self.uid)
    }
}

// =============================================================================
// DISPUTES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    Resolved,
}

/// A contested task between a poster and a helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeDoc {
    pub dispute_id: String,
    pub poster_id: String,
    pub helper_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub opened_by: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub status: DisputeStatus,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub poster_delta: i64,
    #[serde(default)]
    pub helper_delta: i64,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<Timestamp>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

impl Document for DisputeDoc {
    const COLLECTION: Collection = Collection::Disputes;

    fn doc_id(&self) -> String {
        self.dispute_id.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id("dispute_id", &self.dispute_id)?;
        validate_entity_id("poster_id", &self.poster_id)?;
        validate_entity_id("helper_id", &self.helper_id)?;
        if self.status == DisputeStatus::Resolved
            && (self.resolution.is_none() || self.resolved_by.is_none())
        {
            return Err(ValidationError::Inconsistent(format!(
                "resolved dispute {} lacks resolution or resolver",
                self.dispute_id
            )));
        }
        Ok(())
    }
}

/// Append-only trail of privileged actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: String,
    pub actor: String,
    pub action: String,
    #[serde(default)]
    pub dispute_id: Option<String>,
    #[serde(default)]
    pub poster_delta: i64,
    #[serde(default)]
    pub helper_delta: i64,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

impl Document for AuditRecord {
    const COLLECTION: Collection = Collection::AdminAudit;

    fn doc_id(&self) -> String {
        self.audit_id.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id("audit_id", &self.audit_id)?;
        require_non_empty("actor", &self.actor)?;
        require_non_empty("action", &self.action)
    }
}

// =============================================================================
// MODERATION, INVITES, SETTINGS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Closed,
}

/// Record of a task flagged by automated classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationReport {
    pub report_id: String,
    pub task_id: String,
    pub poster_id: String,
    /// Task title at flag time.
    #[serde(default)]
    pub snippet: String,
    pub reason: String,
    pub reporter: String,
    pub status: ReportStatus,
    pub created_at: Timestamp,
}

impl ModerationReport {
    /// Reporter recorded for automated flags.
    pub const SYSTEM_REPORTER: &'static str = "system_ai";

    #[must_use]
    pub fn report_id_for(task_id: &str) -> String {
        format!("task:{task_id}")
    }
}

impl Document for ModerationReport {
    const COLLECTION: Collection = Collection::Reports;

    fn doc_id(&self) -> String {
        self.report_id.clone()
    }
}

/// Poster-initiated first contact with a helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteDoc {
    pub invite_id: String,
    pub poster_id: String,
    pub helper_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub category_id: String,
    /// Ledger key of the direct contact fee.
    pub fee_key: String,
    pub created_at: Timestamp,
}

impl InviteDoc {
    /// Id of the invite from `poster_id` to `helper_id`, per task.
    #[must_use]
    pub fn invite_id_for(task_id: Option<&str>, poster_id: &str, helper_id: &str) -> String {
        format!("{}:{poster_id}:{helper_id}", task_id.unwrap_or(NO_TASK))
    }
}

impl Document for InviteDoc {
    const COLLECTION: Collection = Collection::Invites;

    fn doc_id(&self) -> String {
        self.invite_id.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("invite_id", &self.invite_id)?;
        validate_entity_id("poster_id", &self.poster_id)?;
        validate_entity_id("helper_id", &self.helper_id)?;
        require_non_empty("category_id", &self.category_id)
    }
}

/// Operator overrides read inside the publish transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSettings {
    #[serde(default)]
    pub min_post_balance: Option<u64>,
    #[serde(default)]
    pub post_fee: Option<u64>,
}

impl PlatformSettings {
    pub const DOC_ID: &'static str = "platform";
}

impl Document for PlatformSettings {
    const COLLECTION: Collection = Collection::Settings;

    fn doc_id(&self) -> String {
        Self::DOC_ID.to_string()
    }
}
