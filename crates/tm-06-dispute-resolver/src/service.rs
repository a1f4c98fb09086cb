//! Dispute operations, each one transaction.

use crate::domain::{DisputeError, OpenDispute, Resolution, ResolveOutcome};
use shared_types::{AuditRecord, DisputeDoc, DisputeStatus, LedgerKind, TaskDoc};
use tm_01_document_store::{StoreClient, Transaction};
use tm_02_wallet_ledger::{adjust_in, keys, EntryRefs};
use tm_03_task_lifecycle::TaskError;
use tracing::{debug, info};

const RESOLVE_ACTION: &str = "resolve_dispute";

#[derive(Clone)]
pub struct DisputeResolver {
    client: StoreClient,
}

impl DisputeResolver {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub fn get(&self, dispute_id: &str) -> Result<Option<DisputeDoc>, DisputeError> {
        Ok(self.client.get::<DisputeDoc>(dispute_id)?)
    }

    /// Audit record written when `dispute_id` was resolved.
    pub fn audit_for(&self, dispute_id: &str) -> Result<Option<AuditRecord>, DisputeError> {
        Ok(self.client.get::<AuditRecord>(&audit_id(dispute_id))?)
    }

    /// Opens a dispute. `opened_by` must be one of the two parties.
    ///
    /// With a task, the parties must be its poster and assigned helper.
    /// Reopening the same id with the same parties returns the stored dispute.
    pub fn open_dispute(
        &self,
        opened_by: &str,
        request: &OpenDispute,
    ) -> Result<(DisputeDoc, bool), DisputeError> {
        if request.poster_id == request.helper_id {
            return Err(DisputeError::Invalid("poster and helper must differ".into()));
        }
        if opened_by != request.poster_id && opened_by != request.helper_id {
            return Err(DisputeError::NotParty {
                dispute_id: request.dispute_id.clone(),
                uid: opened_by.to_string(),
            });
        }

        let (dispute, created) = self.client.run_transaction(|tx| {
            if let Some(existing) = tx.get::<DisputeDoc>(&request.dispute_id)? {
                if existing.poster_id == request.poster_id && existing.helper_id == request.helper_id {
                    return Ok((existing, false));
                }
                return Err(DisputeError::DisputeIdTaken(request.dispute_id.clone()));
            }
            if let Some(task_id) = &request.task_id {
                let task = tx
                    .get::<TaskDoc>(task_id)?
                    .ok_or_else(|| TaskError::NotFound(task_id.clone()))?;
                if task.poster_id != request.poster_id
                    || task.assigned_helper_id.as_deref() != Some(request.helper_id.as_str())
                {
                    return Err(DisputeError::PartiesMismatch {
                        task_id: task_id.clone(),
                    });
                }
            }

            let dispute = DisputeDoc {
                dispute_id: request.dispute_id.clone(),
                poster_id: request.poster_id.clone(),
                helper_id: request.helper_id.clone(),
                task_id: request.task_id.clone(),
                opened_by: opened_by.to_string(),
                reason: request.reason.clone(),
                status: DisputeStatus::Open,
                resolution: None,
                poster_delta: 0,
                helper_delta: 0,
                resolved_by: None,
                resolved_at: None,
                notes: None,
                created_at: tx.now(),
            };
            tx.set(&dispute)?;
            Ok((dispute, true))
        })?;

        if created {
            info!(dispute_id = %dispute.dispute_id, opened_by, "Dispute opened");
        }
        Ok((dispute, created))
    }

    /// Applies an admin resolution: both deltas, the status change and the
    /// audit record in one commit.
    pub fn resolve(
        &self,
        admin: &str,
        dispute_id: &str,
        resolution: &Resolution,
    ) -> Result<ResolveOutcome, DisputeError> {
        resolution.validate()?;

        let outcome = self.client.run_transaction(|tx| {
            let mut dispute = tx
                .get::<DisputeDoc>(dispute_id)?
                .ok_or_else(|| DisputeError::NotFound(dispute_id.to_string()))?;

            if dispute.status == DisputeStatus::Resolved {
                if !resolution.matches(&dispute) {
                    return Err(DisputeError::AlreadyResolved(dispute_id.to_string()));
                }
                let audit = tx
                    .get::<AuditRecord>(&audit_id(dispute_id))?
                    .ok_or_else(|| DisputeError::NotFound(audit_id(dispute_id)))?;
                return Ok(ResolveOutcome {
                    dispute,
                    audit,
                    applied: false,
                    poster_balance: None,
                    helper_balance: None,
                });
            }

            let refs = EntryRefs {
                task_id: dispute.task_id.clone(),
                offer_id: None,
                dispute_id: Some(dispute_id.to_string()),
            };
            let poster_balance =
                settle_party_in(tx, dispute_id, &dispute.poster_id, resolution.poster_delta, &refs)?;
            let helper_balance =
                settle_party_in(tx, dispute_id, &dispute.helper_id, resolution.helper_delta, &refs)?;

            let now = tx.now();
            dispute.status = DisputeStatus::Resolved;
            dispute.resolution = Some(resolution.resolution.trim().to_string());
            dispute.poster_delta = resolution.poster_delta;
            dispute.helper_delta = resolution.helper_delta;
            dispute.resolved_by = Some(admin.to_string());
            dispute.resolved_at = Some(now);
            dispute.notes = resolution.notes.clone();
            tx.set(&dispute)?;

            let audit = AuditRecord {
                audit_id: audit_id(dispute_id),
                actor: admin.to_string(),
                action: RESOLVE_ACTION.to_string(),
                dispute_id: Some(dispute_id.to_string()),
                poster_delta: resolution.poster_delta,
                helper_delta: resolution.helper_delta,
                notes: resolution.notes.clone(),
                created_at: now,
            };
            tx.set(&audit)?;

            Ok(ResolveOutcome {
                dispute,
                audit,
                applied: true,
                poster_balance,
                helper_balance,
            })
        })?;

        if outcome.applied {
            info!(
                dispute_id,
                admin,
                poster_delta = resolution.poster_delta,
                helper_delta = resolution.helper_delta,
                "Dispute resolved"
            );
        } else {
            debug!(dispute_id, "Dispute resolution replay ignored");
        }
        Ok(outcome)
    }
}

fn audit_id(dispute_id: &str) -> String {
    format!("{RESOLVE_ACTION}:{dispute_id}")
}

fn settle_party_in(
    tx: &mut Transaction<'_>,
    dispute_id: &str,
    uid: &str,
    delta: i64,
    refs: &EntryRefs,
) -> Result<Option<u64>, DisputeError> {
    let receipt = adjust_in(
        tx,
        uid,
        delta,
        LedgerKind::DisputeAdjustment,
        &keys::dispute(dispute_id, uid),
        refs.clone(),
    )?;
    Ok(receipt.map(|r| r.balance))
}
