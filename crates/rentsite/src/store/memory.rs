use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::checks::{StatusCheck, StatusCheckRepository};
use crate::rentals::{
    Activation, ActiveRental, ActiveRentalId, RentalRepository, RentalRequest, RentalRequestId,
    RentalStatus, RepositoryError, Slug, Transition,
};

#[derive(Debug, Default)]
struct Collections {
    requests: Vec<RentalRequest>,
    rentals: Vec<ActiveRental>,
    checks: Vec<StatusCheck>,
}

impl Collections {
    fn request_mut(&mut self, id: &RentalRequestId) -> Option<&mut RentalRequest> {
        self.requests.iter_mut().find(|request| &request.id == id)
    }
}

/// Process-local store. Every collection sits behind one lock, so a status
/// flip and the rental it provisions land together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rental directly, bypassing approval. Used to seed fixtures.
    pub async fn insert_rental(&self, rental: ActiveRental) {
        self.collections.write().await.rentals.push(rental);
    }

    pub async fn rentals(&self) -> Vec<ActiveRental> {
        self.collections.read().await.rentals.clone()
    }
}

#[async_trait]
impl RentalRepository for MemoryStore {
    async fn insert_request(
        &self,
        request: RentalRequest,
    ) -> Result<RentalRequest, RepositoryError> {
        let mut guard = self.collections.write().await;
        let duplicate = guard.requests.iter().any(|existing| {
            existing.id == request.id || existing.unique_slug == request.unique_slug
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.requests.push(request.clone());
        Ok(request)
    }

    async fn list_requests(&self, limit: usize) -> Result<Vec<RentalRequest>, RepositoryError> {
        let guard = self.collections.read().await;
        Ok(guard.requests.iter().take(limit).cloned().collect())
    }

    async fn fetch_request(
        &self,
        id: &RentalRequestId,
    ) -> Result<Option<RentalRequest>, RepositoryError> {
        let guard = self.collections.read().await;
        Ok(guard.requests.iter().find(|request| &request.id == id).cloned())
    }

    async fn slug_in_use(&self, slug: &Slug) -> Result<bool, RepositoryError> {
        let guard = self.collections.read().await;
        Ok(guard.requests.iter().any(|request| &request.unique_slug == slug))
    }

    async fn activate(&self, activation: Activation) -> Result<Transition, RepositoryError> {
        let mut guard = self.collections.write().await;
        let Some(request) = guard.request_mut(&activation.request_id) else {
            return Ok(Transition::Missing);
        };
        if request.status != RentalStatus::Pending {
            return Ok(Transition::AlreadyDecided(request.status));
        }

        request.status = RentalStatus::Active;
        request.approval_date = Some(activation.approved_at);
        request.expiration_date = Some(activation.expires_at);
        request.updated_at = activation.approved_at;
        let updated = request.clone();

        guard.rentals.push(activation.rental);
        Ok(Transition::Applied(updated))
    }

    async fn reject(
        &self,
        id: &RentalRequestId,
        at: DateTime<Utc>,
    ) -> Result<Transition, RepositoryError> {
        let mut guard = self.collections.write().await;
        let Some(request) = guard.request_mut(id) else {
            return Ok(Transition::Missing);
        };
        if request.status != RentalStatus::Pending {
            return Ok(Transition::AlreadyDecided(request.status));
        }

        request.status = RentalStatus::Rejected;
        request.updated_at = at;
        Ok(Transition::Applied(request.clone()))
    }

    async fn list_active(&self, limit: usize) -> Result<Vec<ActiveRental>, RepositoryError> {
        let guard = self.collections.read().await;
        Ok(guard
            .rentals
            .iter()
            .filter(|rental| rental.is_active)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_live_by_slug(
        &self,
        slug: &Slug,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveRental>, RepositoryError> {
        let guard = self.collections.read().await;
        Ok(guard
            .rentals
            .iter()
            .find(|rental| &rental.slug == slug && rental.is_live(now))
            .cloned())
    }

    async fn touch_rental(
        &self,
        id: &ActiveRentalId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.collections.write().await;
        if let Some(rental) = guard.rentals.iter_mut().find(|rental| &rental.id == id) {
            rental.last_accessed = at;
        }
        Ok(())
    }

    async fn delete_rental(&self, id: &ActiveRentalId) -> Result<u64, RepositoryError> {
        let mut guard = self.collections.write().await;
        let before = guard.rentals.len();
        guard.rentals.retain(|rental| &rental.id != id);
        Ok((before - guard.rentals.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut guard = self.collections.write().await;
        let before = guard.rentals.len();
        guard.rentals.retain(|rental| !rental.is_expired(now));
        Ok((before - guard.rentals.len()) as u64)
    }
}

#[async_trait]
impl StatusCheckRepository for MemoryStore {
    async fn insert_check(&self, check: StatusCheck) -> Result<StatusCheck, RepositoryError> {
        self.collections.write().await.checks.push(check.clone());
        Ok(check)
    }

    async fn list_checks(&self, limit: usize) -> Result<Vec<StatusCheck>, RepositoryError> {
        let guard = self.collections.read().await;
        Ok(guard.checks.iter().take(limit).cloned().collect())
    }
}
