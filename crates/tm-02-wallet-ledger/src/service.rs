//! Standalone ledger operations, each one transaction.

use crate::domain::{charge_in, credit_in, keys, LedgerError, LedgerReceipt, Posting};
use shared_types::{LedgerEntry, LedgerKind, UserDoc};
use tm_01_document_store::StoreClient;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct WalletLedger {
    client: StoreClient,
}

impl WalletLedger {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Idempotent debit keyed by `key`.
    pub fn charge(
        &self,
        uid: &str,
        amount: u64,
        kind: LedgerKind,
        key: &str,
    ) -> Result<LedgerReceipt, LedgerError> {
        let posting = Posting::new(uid, amount, kind, key);
        let receipt = self.client.run_transaction(|tx| charge_in(tx, &posting))?;
        if receipt.applied {
            info!(uid, amount, kind = %kind, key, balance = receipt.balance, "Wallet charged");
        }
        Ok(receipt)
    }

    /// Idempotent credit keyed by `key`.
    pub fn credit(
        &self,
        uid: &str,
        amount: u64,
        kind: LedgerKind,
        key: &str,
    ) -> Result<LedgerReceipt, LedgerError> {
        let posting = Posting::new(uid, amount, kind, key);
        let receipt = self.client.run_transaction(|tx| credit_in(tx, &posting))?;
        if receipt.applied {
            info!(uid, amount, kind = %kind, key, balance = receipt.balance, "Wallet credited");
        }
        Ok(receipt)
    }

    /// Creates the user's wallet with a zero balance if it does not exist.
    ///
    /// Returns the user document and whether it was created by this call.
    pub fn open_account(&self, uid: &str) -> Result<(UserDoc, bool), LedgerError> {
        let (user, created) = self.client.run_transaction(|tx| {
            if let Some(existing) = tx.get::<UserDoc>(uid)? {
                return Ok::<_, LedgerError>((existing, false));
            }
            let user = UserDoc::new(uid, tx.now());
            tx.set(&user)?;
            Ok((user, true))
        })?;
        if created {
            info!(uid, "Account opened");
        }
        Ok((user, created))
    }

    /// Credits purchased coins.
    ///
    /// Without a `client_key` every call is a distinct top-up; clients that
    /// retry must send the same key.
    pub fn top_up(
        &self,
        uid: &str,
        amount: u64,
        client_key: Option<&str>,
    ) -> Result<LedgerReceipt, LedgerError> {
        let client_key = match client_key {
            Some(k) if !k.trim().is_empty() => k.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        self.credit(uid, amount, LedgerKind::Topup, &keys::topup(uid, &client_key))
    }

    /// The ledger entry stored under `key`, if any.
    pub fn entry(&self, key: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.client.get(key)?)
    }

    /// Current balance of `uid`.
    pub fn balance(&self, uid: &str) -> Result<u64, LedgerError> {
        self.client
            .get::<UserDoc>(uid)?
            .map(|user| user.wallet_balance)
            .ok_or_else(|| LedgerError::UserNotFound(uid.to_string()))
    }
}
