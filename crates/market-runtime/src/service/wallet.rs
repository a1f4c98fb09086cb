//! Wallet operations.

use market_telemetry::metric_inc;
use market_telemetry::metrics::LEDGER_REPLAYS;
use shared_bus::MarketEvent;
use shared_types::{AuthenticatedCall, ServiceError, UserDoc};
use tm_02_wallet_ledger::LedgerReceipt;
use tracing::{debug, info};

use super::{MarketplaceService, TopUpRequest};

impl MarketplaceService {
    /// Registers the caller with a zero balance. Idempotent.
    pub async fn open_account(&self, call: AuthenticatedCall<()>) -> Result<UserDoc, ServiceError> {
        let (user, created) = self.observe("open_account", || {
            let caller = call.require_caller()?;
            Ok(self.container.ledger.open_account(&caller.uid)?)
        })?;
        if created {
            self.emit(
                call.correlation_id,
                MarketEvent::AccountOpened {
                    uid: user.uid.clone(),
                },
            )
            .await;
        }
        Ok(user)
    }

    /// Credits coins to the caller's wallet (or, for admins, any wallet).
    ///
    /// Retrying with the same `idempotency_key` returns the original receipt.
    pub async fn top_up_coins(
        &self,
        call: AuthenticatedCall<TopUpRequest>,
    ) -> Result<LedgerReceipt, ServiceError> {
        let receipt = self.observe("top_up_coins", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            let target = match request.target_uid.as_deref() {
                Some(uid) if uid != caller.uid => {
                    call.require_admin()?;
                    uid
                }
                _ => caller.uid.as_str(),
            };
            Ok(self.container.ledger.top_up(
                target,
                request.amount,
                request.idempotency_key.as_deref(),
            )?)
        })?;

        if receipt.applied {
            info!(
                uid = %receipt.entry.uid,
                amount = receipt.entry.amount,
                balance = receipt.balance,
                "Wallet topped up"
            );
            self.emit_posting(
                call.correlation_id,
                &receipt.entry.uid,
                receipt.entry.kind,
                receipt.entry.key.clone(),
                receipt.entry.amount,
                receipt.balance,
            )
            .await;
        } else {
            metric_inc!(LEDGER_REPLAYS, &[receipt.entry.kind.as_str()]);
            debug!(key = %receipt.entry.key, "Top-up replayed");
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use shared_types::FailureReason;

    #[tokio::test]
    async fn test_open_account_once() {
        let mut h = harness();
        h.service.open_account(as_user("u1", ())).await.unwrap();
        h.service.open_account(as_user("u1", ())).await.unwrap();
        let opened = h
            .drain()
            .into_iter()
            .filter(|e| matches!(e, MarketEvent::AccountOpened { .. }))
            .count();
        assert_eq!(opened, 1);
    }

    #[tokio::test]
    async fn test_top_up_replay_credits_once() {
        let mut h = harness();
        h.service.open_account(as_user("u1", ())).await.unwrap();
        let request = TopUpRequest {
            amount: 100,
            idempotency_key: Some("order-7".into()),
            target_uid: None,
        };
        let first = h.service.top_up_coins(as_user("u1", request.clone())).await.unwrap();
        let second = h.service.top_up_coins(as_user("u1", request)).await.unwrap();
        assert!(first.applied);
        assert!(!second.applied);
        assert_eq!(second.balance, 100);
        assert_eq!(h.balance("u1"), 100);

        let postings = h
            .drain()
            .into_iter()
            .filter(|e| matches!(e, MarketEvent::WalletMutated { .. }))
            .count();
        assert_eq!(postings, 1);
    }

    #[tokio::test]
    async fn test_top_up_other_wallet_needs_admin() {
        let h = harness();
        h.funded("u1", 0).await;
        let request = TopUpRequest {
            amount: 10,
            idempotency_key: None,
            target_uid: Some("u1".into()),
        };
        let err = h
            .service
            .top_up_coins(as_user("u2", request.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        h.service.top_up_coins(as_admin(request)).await.unwrap();
        assert_eq!(h.balance("u1"), 10);
    }

    #[tokio::test]
    async fn test_top_up_without_account() {
        let h = harness();
        let err = h
            .service
            .top_up_coins(as_user(
                "ghost",
                TopUpRequest {
                    amount: 10,
                    idempotency_key: None,
                    target_uid: None,
                },
            ))
            .await
            .unwrap_err();
        assert!(err.is_precondition(FailureReason::UserNotFound));
    }

    #[tokio::test]
    async fn test_unauthenticated_call() {
        let h = harness();
        let call = AuthenticatedCall::new(None, 0, ());
        assert_eq!(
            h.service.open_account(call).await.unwrap_err(),
            ServiceError::Unauthenticated
        );
    }
}
