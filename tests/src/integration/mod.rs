//! # Integration Tests
//!
//! Flows that cross component boundaries, driven through the authenticated
//! service surface the way a client would.

pub mod event_flow;
pub mod ledger_races;
pub mod marketplace_flows;
