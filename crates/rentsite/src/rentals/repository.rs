use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    ActiveRental, ActiveRentalId, RentalRequest, RentalRequestId, RentalStatus, Slug,
};

/// Upper bound on any listing so a scan can never run away.
pub const LIST_CAP: usize = 1000;

/// Everything needed to move a pending request to active in one write.
#[derive(Debug, Clone)]
pub struct Activation {
    pub request_id: RentalRequestId,
    pub approved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub rental: ActiveRental,
}

/// Result of a guarded status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied(RentalRequest),
    Missing,
    AlreadyDecided(RentalStatus),
}

/// Storage abstraction over the `rental_requests` and `active_rentals` collections.
///
/// Status changes are conditional on the request still being pending, and
/// `activate` must flip the status and insert the rental atomically.
#[async_trait]
pub trait RentalRepository: Send + Sync {
    async fn insert_request(&self, request: RentalRequest)
        -> Result<RentalRequest, RepositoryError>;
    async fn list_requests(&self, limit: usize) -> Result<Vec<RentalRequest>, RepositoryError>;
    async fn fetch_request(
        &self,
        id: &RentalRequestId,
    ) -> Result<Option<RentalRequest>, RepositoryError>;
    async fn slug_in_use(&self, slug: &Slug) -> Result<bool, RepositoryError>;
    async fn activate(&self, activation: Activation) -> Result<Transition, RepositoryError>;
    async fn reject(
        &self,
        id: &RentalRequestId,
        at: DateTime<Utc>,
    ) -> Result<Transition, RepositoryError>;

    async fn list_active(&self, limit: usize) -> Result<Vec<ActiveRental>, RepositoryError>;
    async fn find_live_by_slug(
        &self,
        slug: &Slug,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveRental>, RepositoryError>;
    async fn touch_rental(
        &self,
        id: &ActiveRentalId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    /// Returns the number of rentals removed (0 or 1).
    async fn delete_rental(&self, id: &ActiveRentalId) -> Result<u64, RepositoryError>;
    /// Removes rentals whose expiration is strictly before `now`, active or not.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("stored record is malformed: {0}")]
    Corrupt(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
