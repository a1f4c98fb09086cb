//! Dispute operations.

use market_telemetry::metric_inc;
use market_telemetry::metrics::DISPUTES_RESOLVED;
use shared_bus::MarketEvent;
use shared_types::{AuthenticatedCall, DisputeDoc, LedgerKind, ServiceError};
use tm_02_wallet_ledger::keys;
use tm_06_dispute_resolver::{OpenDispute, Resolution, ResolveOutcome};

use super::{MarketplaceService, OpenDisputeRequest, ResolveDisputeRequest};

impl MarketplaceService {
    /// Either party opens a dispute between a poster and a helper.
    pub async fn open_dispute(
        &self,
        call: AuthenticatedCall<OpenDisputeRequest>,
    ) -> Result<DisputeDoc, ServiceError> {
        let (dispute, created) = self.observe("open_dispute", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            let open = OpenDispute {
                dispute_id: request.dispute_id.clone(),
                poster_id: request.poster_id.clone(),
                helper_id: request.helper_id.clone(),
                task_id: request.task_id.clone(),
                reason: request.reason.clone(),
            };
            Ok(self.container.disputes.open_dispute(&caller.uid, &open)?)
        })?;

        if created {
            self.emit(
                call.correlation_id,
                MarketEvent::DisputeOpened {
                    dispute_id: dispute.dispute_id.clone(),
                    poster_id: dispute.poster_id.clone(),
                    helper_id: dispute.helper_id.clone(),
                },
            )
            .await;
        }
        Ok(dispute)
    }

    /// Admin resolution: both balance adjustments, the status change and the
    /// audit record commit together. Resubmitting the same resolution is a
    /// no-op; a different one fails with `already_resolved`.
    pub async fn resolve_dispute(
        &self,
        call: AuthenticatedCall<ResolveDisputeRequest>,
    ) -> Result<ResolveOutcome, ServiceError> {
        let outcome = self.observe("resolve_dispute", || {
            let admin = call.require_admin()?;
            let request = &call.payload;
            let resolution = Resolution {
                resolution: request.resolution.clone(),
                poster_delta: request.poster_delta,
                helper_delta: request.helper_delta,
                notes: request.notes.clone(),
            };
            Ok(self
                .container
                .disputes
                .resolve(&admin.uid, &request.dispute_id, &resolution)?)
        })?;

        if !outcome.applied {
            return Ok(outcome);
        }
        let dispute = &outcome.dispute;
        let parties = [
            (&dispute.poster_id, dispute.poster_delta, outcome.poster_balance),
            (&dispute.helper_id, dispute.helper_delta, outcome.helper_balance),
        ];
        for (uid, delta, balance) in parties {
            if let (true, Some(balance)) = (delta != 0, balance) {
                self.emit_posting(
                    call.correlation_id,
                    uid,
                    LedgerKind::DisputeAdjustment,
                    keys::dispute(&dispute.dispute_id, uid),
                    delta,
                    balance,
                )
                .await;
            }
        }

        metric_inc!(DISPUTES_RESOLVED);
        self.emit(
            call.correlation_id,
            MarketEvent::DisputeResolved {
                dispute_id: dispute.dispute_id.clone(),
                poster_id: dispute.poster_id.clone(),
                helper_id: dispute.helper_id.clone(),
                poster_delta: dispute.poster_delta,
                helper_delta: dispute.helper_delta,
            },
        )
        .await;
        Ok(outcome)
    }
}
