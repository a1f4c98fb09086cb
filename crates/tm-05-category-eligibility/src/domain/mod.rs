//! Domain layer for category eligibility.

pub mod allowed;
pub mod category;
pub mod errors;

pub use allowed::compute_allowed;
pub use errors::EligibilityError;
