//! In-transaction ledger primitives.

use crate::domain::LedgerError;
use shared_types::{LedgerEntry, LedgerKind, UserDoc};
use tm_01_document_store::Transaction;
use tracing::debug;

/// Optional references recorded on a ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryRefs {
    pub task_id: Option<String>,
    pub offer_id: Option<String>,
    pub dispute_id: Option<String>,
}

/// A requested balance mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub uid: String,
    /// Strictly positive; direction comes from the operation.
    pub amount: u64,
    pub kind: LedgerKind,
    pub key: String,
    pub refs: EntryRefs,
}

impl Posting {
    pub fn new(uid: impl Into<String>, amount: u64, kind: LedgerKind, key: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            amount,
            kind,
            key: key.into(),
            refs: EntryRefs::default(),
        }
    }

    #[must_use]
    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.refs.task_id = Some(task_id.into());
        self
    }

    #[must_use]
    pub fn with_offer(mut self, offer_id: impl Into<String>) -> Self {
        self.refs.offer_id = Some(offer_id.into());
        self
    }

    #[must_use]
    pub fn with_dispute(mut self, dispute_id: impl Into<String>) -> Self {
        self.refs.dispute_id = Some(dispute_id.into());
        self
    }
}

/// Outcome of a charge or credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// `false` when the key already existed and nothing was written.
    pub applied: bool,
    /// Balance right after the (original) mutation.
    pub balance: u64,
    pub entry: LedgerEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Debit,
    Credit,
}

/// Debits `posting.amount` from the user inside `tx`.
///
/// Fails with `InsufficientFunds` and writes nothing when the balance is
/// below the amount.
pub fn charge_in(tx: &mut Transaction<'_>, posting: &Posting) -> Result<LedgerReceipt, LedgerError> {
    apply(tx, posting, Direction::Debit)
}

/// Credits `posting.amount` to the user inside `tx`.
pub fn credit_in(tx: &mut Transaction<'_>, posting: &Posting) -> Result<LedgerReceipt, LedgerError> {
    apply(tx, posting, Direction::Credit)
}

/// Signed mutation: negative deltas charge, positive deltas credit, zero is
/// a no-op returning `None`.
pub fn adjust_in(
    tx: &mut Transaction<'_>,
    uid: &str,
    delta: i64,
    kind: LedgerKind,
    key: &str,
    refs: EntryRefs,
) -> Result<Option<LedgerReceipt>, LedgerError> {
    if delta == 0 {
        return Ok(None);
    }
    let posting = Posting {
        uid: uid.to_string(),
        amount: delta.unsigned_abs(),
        kind,
        key: key.to_string(),
        refs,
    };
    let receipt = if delta < 0 {
        charge_in(tx, &posting)?
    } else {
        credit_in(tx, &posting)?
    };
    Ok(Some(receipt))
}

fn apply(
    tx: &mut Transaction<'_>,
    posting: &Posting,
    direction: Direction,
) -> Result<LedgerReceipt, LedgerError> {
    let signed = i64::try_from(posting.amount)
        .ok()
        .filter(|amount| *amount > 0)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("{} is out of range", posting.amount)))?;

    if let Some(entry) = tx.get::<LedgerEntry>(&posting.key)? {
        if entry.uid != posting.uid {
            return Err(LedgerError::KeyConflict {
                key: posting.key.clone(),
                owner: entry.uid,
            });
        }
        debug!(key = %posting.key, uid = %posting.uid, "Ledger key already applied");
        return Ok(LedgerReceipt {
            applied: false,
            balance: entry.balance_after,
            entry,
        });
    }

    let mut user: UserDoc = tx
        .get(&posting.uid)?
        .ok_or_else(|| LedgerError::UserNotFound(posting.uid.clone()))?;

    let (balance, amount) = match direction {
        Direction::Debit => {
            let balance = user.wallet_balance.checked_sub(posting.amount).ok_or_else(|| {
                LedgerError::InsufficientFunds {
                    uid: posting.uid.clone(),
                    balance: user.wallet_balance,
                    required: posting.amount,
                }
            })?;
            (balance, -signed)
        }
        Direction::Credit => {
            let balance = user
                .wallet_balance
                .checked_add(posting.amount)
                .ok_or_else(|| LedgerError::InvalidAmount("balance overflow".into()))?;
            (balance, signed)
        }
    };

    user.wallet_balance = balance;
    let entry = LedgerEntry {
        key: posting.key.clone(),
        uid: posting.uid.clone(),
        kind: posting.kind,
        amount,
        balance_after: balance,
        task_id: posting.refs.task_id.clone(),
        offer_id: posting.refs.offer_id.clone(),
        dispute_id: posting.refs.dispute_id.clone(),
        created_at: tx.now(),
    };
    tx.set(&user)?;
    tx.set(&entry)?;

    Ok(LedgerReceipt {
        applied: true,
        balance,
        entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm_01_document_store::{StoreClient, StoreError};

    fn client_with_user(uid: &str, balance: u64) -> StoreClient {
        let client = StoreClient::in_memory();
        client
            .run_transaction(|tx| {
                let mut user = UserDoc::new(uid, 0);
                user.wallet_balance = balance;
                tx.set(&user)
            })
            .unwrap();
        client
    }

    fn balance(client: &StoreClient, uid: &str) -> u64 {
        client.get::<UserDoc>(uid).unwrap().unwrap().wallet_balance
    }

    #[test]
    fn test_charge_writes_entry_and_balance() {
        let client = client_with_user("P", 1000);
        let posting = Posting::new("P", 20, LedgerKind::PostFee, "post_fee:T1").with_task("T1");

        let receipt = client.run_transaction(|tx| charge_in(tx, &posting)).unwrap();

        assert!(receipt.applied);
        assert_eq!(receipt.balance, 980);
        assert_eq!(receipt.entry.amount, -20);
        assert_eq!(receipt.entry.task_id.as_deref(), Some("T1"));
        assert_eq!(balance(&client, "P"), 980);
        let stored: LedgerEntry = client.get("post_fee:T1").unwrap().unwrap();
        assert_eq!(stored, receipt.entry);
    }

    #[test]
    fn test_replay_returns_prior_result() {
        let client = client_with_user("P", 1000);
        let posting = Posting::new("P", 20, LedgerKind::PostFee, "post_fee:T1");

        client.run_transaction(|tx| charge_in(tx, &posting)).unwrap();
        let replay = client.run_transaction(|tx| charge_in(tx, &posting)).unwrap();

        assert!(!replay.applied);
        assert_eq!(replay.balance, 980);
        assert_eq!(balance(&client, "P"), 980);
    }

    #[test]
    fn test_insufficient_funds_writes_nothing() {
        let client = client_with_user("H", 10);
        let posting = Posting::new("H", 25, LedgerKind::AcceptFee, "accept:O1");

        let err = client
            .run_transaction(|tx| charge_in(tx, &posting))
            .unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                uid: "H".into(),
                balance: 10,
                required: 25
            }
        );
        assert_eq!(balance(&client, "H"), 10);
        assert!(client.get::<LedgerEntry>("accept:O1").unwrap().is_none());
    }

    #[test]
    fn test_exact_balance_can_be_spent() {
        let client = client_with_user("H", 25);
        let posting = Posting::new("H", 25, LedgerKind::AcceptFee, "accept:O1");
        let receipt = client.run_transaction(|tx| charge_in(tx, &posting)).unwrap();
        assert_eq!(receipt.balance, 0);
    }

    #[test]
    fn test_unknown_user() {
        let client = StoreClient::in_memory();
        let posting = Posting::new("ghost", 5, LedgerKind::Topup, "topup:ghost:1");
        let err = client
            .run_transaction(|tx| credit_in(tx, &posting))
            .unwrap_err();
        assert_eq!(err, LedgerError::UserNotFound("ghost".into()));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let client = client_with_user("P", 10);
        let posting = Posting::new("P", 0, LedgerKind::Topup, "topup:P:0");
        let err = client
            .run_transaction(|tx| credit_in(tx, &posting))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn test_key_bound_to_other_user() {
        let client = client_with_user("A", 100);
        client
            .run_transaction(|tx| {
                tx.set(&UserDoc::new("B", 0))?;
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let first = Posting::new("A", 10, LedgerKind::Topup, "shared");
        client.run_transaction(|tx| credit_in(tx, &first)).unwrap();

        let second = Posting::new("B", 10, LedgerKind::Topup, "shared");
        let err = client
            .run_transaction(|tx| credit_in(tx, &second))
            .unwrap_err();
        assert!(matches!(err, LedgerError::KeyConflict { .. }));
    }

    #[test]
    fn test_adjust_directions() {
        let client = client_with_user("P", 100);

        let none = client
            .run_transaction(|tx| adjust_in(tx, "P", 0, LedgerKind::DisputeAdjustment, "d0", EntryRefs::default()))
            .unwrap();
        assert!(none.is_none());

        let debit = client
            .run_transaction(|tx| adjust_in(tx, "P", -30, LedgerKind::DisputeAdjustment, "d1", EntryRefs::default()))
            .unwrap()
            .unwrap();
        assert_eq!(debit.balance, 70);
        assert_eq!(debit.entry.amount, -30);

        let credit = client
            .run_transaction(|tx| adjust_in(tx, "P", 5, LedgerKind::DisputeAdjustment, "d2", EntryRefs::default()))
            .unwrap()
            .unwrap();
        assert_eq!(credit.balance, 75);
    }

    #[test]
    fn test_two_postings_for_same_user_in_one_transaction() {
        let client = client_with_user("P", 100);
        let a = Posting::new("P", 30, LedgerKind::PostFee, "a");
        let b = Posting::new("P", 50, LedgerKind::DirectContactFee, "b");

        let last = client
            .run_transaction(|tx| {
                charge_in(tx, &a)?;
                charge_in(tx, &b)
            })
            .unwrap();

        assert_eq!(last.balance, 20);
        assert_eq!(balance(&client, "P"), 20);
    }
}
