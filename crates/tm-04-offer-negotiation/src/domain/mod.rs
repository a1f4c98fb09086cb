//! Domain layer for offer negotiation.

pub mod errors;
pub mod outcomes;
pub mod state_machine;

pub use errors::OfferError;
pub use outcomes::{AcceptOutcome, InviteOutcome, OfferSubmission, OfferTransition};
pub use state_machine::{agreed_price, check_edge, effective_status, lapse_hold, next_status};
