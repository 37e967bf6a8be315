use std::sync::Arc;

use tracing::{info, warn};

use super::clock::Clock;
use super::domain::{
    ActiveRental, ActiveRentalId, ApprovalDecision, ApprovalOutcome, PublicRental, RentalRequest,
    RentalRequestId, RentalStatus, RentalSubmission, Slug,
};
use super::repository::{Activation, RentalRepository, RepositoryError, Transition, LIST_CAP};
use super::sweeper::sweep_expired;

/// Attempts at drawing a slug no existing request already uses.
const SLUG_ATTEMPTS: usize = 5;

/// Service owning the rental request and active rental lifecycle.
pub struct RentalLifecycleService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> RentalLifecycleService<R>
where
    R: RentalRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Record a new pending request with a fresh identifier and slug.
    pub async fn submit(
        &self,
        submission: RentalSubmission,
    ) -> Result<RentalRequest, RentalServiceError> {
        for _ in 0..SLUG_ATTEMPTS {
            let slug = Slug::generate();
            if self.repository.slug_in_use(&slug).await? {
                continue;
            }

            let request = RentalRequest::pending(
                submission.clone(),
                RentalRequestId::generate(),
                slug,
                self.clock.now(),
            );

            match self.repository.insert_request(request).await {
                Ok(stored) => {
                    info!(
                        request_id = %stored.id,
                        slug = %stored.unique_slug,
                        duration = stored.duration_type.label(),
                        count = stored.duration_value,
                        "rental request submitted"
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::Conflict) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(RepositoryError::Conflict.into())
    }

    /// Approve or reject a pending request.
    ///
    /// Approval flips the request to active and provisions its rental in one
    /// guarded write, so a request can be decided at most once.
    pub async fn approve(
        &self,
        request_id: &RentalRequestId,
        decision: ApprovalDecision,
    ) -> Result<ApprovalOutcome, RentalServiceError> {
        let request = self
            .repository
            .fetch_request(request_id)
            .await?
            .ok_or_else(|| RentalServiceError::RequestNotFound(request_id.clone()))?;

        if !request.is_pending() {
            return Err(RentalServiceError::AlreadyDecided {
                id: request_id.clone(),
                status: request.status,
            });
        }

        let now = self.clock.now();

        if !decision.approved {
            let transition = self.repository.reject(request_id, now).await?;
            let request = self.applied(request_id, transition)?;
            info!(request_id = %request_id, "rental request rejected");
            return Ok(ApprovalOutcome::Rejected { request });
        }

        let expires_at = request.expiration_from(now).ok_or_else(|| {
            RepositoryError::Corrupt(format!(
                "request {request_id}: {} {}(s) has no representable expiration",
                request.duration_value,
                request.duration_type.label()
            ))
        })?;
        let rental = ActiveRental::provision(&request, expires_at, now);
        let transition = self
            .repository
            .activate(Activation {
                request_id: request_id.clone(),
                approved_at: now,
                expires_at,
                rental: rental.clone(),
            })
            .await?;
        let request = self.applied(request_id, transition)?;

        info!(
            request_id = %request_id,
            rental_id = %rental.id,
            slug = %rental.slug,
            %expires_at,
            "rental request approved"
        );
        Ok(ApprovalOutcome::Approved { request, rental })
    }

    fn applied(
        &self,
        request_id: &RentalRequestId,
        transition: Transition,
    ) -> Result<RentalRequest, RentalServiceError> {
        match transition {
            Transition::Applied(request) => Ok(request),
            Transition::Missing => Err(RentalServiceError::RequestNotFound(request_id.clone())),
            Transition::AlreadyDecided(status) => Err(RentalServiceError::AlreadyDecided {
                id: request_id.clone(),
                status,
            }),
        }
    }

    pub async fn list_requests(&self) -> Result<Vec<RentalRequest>, RentalServiceError> {
        Ok(self.repository.list_requests(LIST_CAP).await?)
    }

    /// Active rentals, after clearing anything already expired.
    pub async fn list_active(&self) -> Result<Vec<ActiveRental>, RentalServiceError> {
        self.sweep_expired().await?;
        Ok(self.repository.list_active(LIST_CAP).await?)
    }

    /// Look up a live site by slug and record the visit.
    pub async fn resolve_slug(&self, slug: &Slug) -> Result<PublicRental, RentalServiceError> {
        self.sweep_expired().await?;

        let now = self.clock.now();
        let rental = self
            .repository
            .find_live_by_slug(slug, now)
            .await?
            .filter(|rental| rental.is_live(now))
            .ok_or_else(|| RentalServiceError::SlugNotFound(slug.clone()))?;

        if let Err(err) = self.repository.touch_rental(&rental.id, now).await {
            warn!(rental_id = %rental.id, error = %err, "failed to record rental access");
        }

        Ok(rental.public_view())
    }

    pub async fn delete_active(
        &self,
        rental_id: &ActiveRentalId,
    ) -> Result<(), RentalServiceError> {
        match self.repository.delete_rental(rental_id).await? {
            0 => Err(RentalServiceError::RentalNotFound(rental_id.clone())),
            _ => {
                info!(rental_id = %rental_id, "active rental deleted");
                Ok(())
            }
        }
    }

    pub async fn sweep_expired(&self) -> Result<u64, RepositoryError> {
        sweep_expired(self.repository.as_ref(), self.clock.now()).await
    }
}

/// Error raised by the rental lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum RentalServiceError {
    #[error("rental request {0} not found")]
    RequestNotFound(RentalRequestId),
    #[error("active rental {0} not found")]
    RentalNotFound(ActiveRentalId),
    #[error("rental not found or expired")]
    SlugNotFound(Slug),
    #[error("rental request {id} is already {status}")]
    AlreadyDecided { id: RentalRequestId, status: RentalStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
