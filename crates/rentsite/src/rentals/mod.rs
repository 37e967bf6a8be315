//! Rental microsite lifecycle: intake, approval, public lookup, and expiration.

pub mod clock;
pub mod domain;
pub mod duration;
pub mod repository;
pub mod router;
pub mod service;
pub mod sweeper;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{
    ActiveRental, ActiveRentalId, ApprovalDecision, ApprovalOutcome, BusinessProfile,
    PublicRental, RentalRequest, RentalRequestId, RentalStatus, RentalSubmission, Slug,
};
pub use duration::{expires_at, DurationUnit, RentalTerm};
pub use repository::{Activation, RentalRepository, RepositoryError, Transition, LIST_CAP};
pub use router::rental_router;
pub use service::{RentalLifecycleService, RentalServiceError};
pub use sweeper::{sweep_expired, ExpirationSweeper};
