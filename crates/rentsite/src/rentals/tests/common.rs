use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::rentals::{
    Activation, ActiveRental, ActiveRentalId, BusinessProfile, ManualClock, RentalLifecycleService,
    RentalRepository, RentalRequest, RentalRequestId, RentalSubmission, RepositoryError, Slug,
    Transition,
};
use crate::store::MemoryStore;

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 30, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn profile() -> BusinessProfile {
    let mut social_links = BTreeMap::new();
    social_links.insert(
        "instagram".to_string(),
        "https://instagram.com/acme".to_string(),
    );
    BusinessProfile {
        description: "Neighbourhood hardware store".to_string(),
        services: vec![
            "Key cutting".to_string(),
            "Paint mixing".to_string(),
            "Tool rental".to_string(),
        ],
        logo: "https://cdn.example.com/acme.png".to_string(),
        theme: "green".to_string(),
        social_links,
    }
}

pub(super) fn submission(duration: &str) -> RentalSubmission {
    RentalSubmission {
        business_name: "Acme".to_string(),
        contact_email: "a@x.com".to_string(),
        contact_phone: "555".to_string(),
        duration: duration.to_string(),
        business_data: profile(),
    }
}

pub(super) struct Harness {
    pub service: Arc<RentalLifecycleService<MemoryStore>>,
    pub store: Arc<MemoryStore>,
    pub clock: ManualClock,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::starting_at(epoch());
    let service = Arc::new(RentalLifecycleService::new(
        store.clone(),
        Arc::new(clock.clone()),
    ));
    Harness {
        service,
        store,
        clock,
    }
}

pub(super) fn service_over<R>(repository: R) -> Arc<RentalLifecycleService<R>>
where
    R: RentalRepository + 'static,
{
    Arc::new(RentalLifecycleService::new(
        Arc::new(repository),
        Arc::new(ManualClock::starting_at(epoch())),
    ))
}

pub(super) fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("body encodes")))
        .expect("request builds")
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Every call fails as if the database were down.
pub(super) struct UnavailableRepository;

fn down() -> RepositoryError {
    RepositoryError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl RentalRepository for UnavailableRepository {
    async fn insert_request(&self, _: RentalRequest) -> Result<RentalRequest, RepositoryError> {
        Err(down())
    }
    async fn list_requests(&self, _: usize) -> Result<Vec<RentalRequest>, RepositoryError> {
        Err(down())
    }
    async fn fetch_request(
        &self,
        _: &RentalRequestId,
    ) -> Result<Option<RentalRequest>, RepositoryError> {
        Err(down())
    }
    async fn slug_in_use(&self, _: &Slug) -> Result<bool, RepositoryError> {
        Err(down())
    }
    async fn activate(&self, _: Activation) -> Result<Transition, RepositoryError> {
        Err(down())
    }
    async fn reject(
        &self,
        _: &RentalRequestId,
        _: DateTime<Utc>,
    ) -> Result<Transition, RepositoryError> {
        Err(down())
    }
    async fn list_active(&self, _: usize) -> Result<Vec<ActiveRental>, RepositoryError> {
        Err(down())
    }
    async fn find_live_by_slug(
        &self,
        _: &Slug,
        _: DateTime<Utc>,
    ) -> Result<Option<ActiveRental>, RepositoryError> {
        Err(down())
    }
    async fn touch_rental(
        &self,
        _: &ActiveRentalId,
        _: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        Err(down())
    }
    async fn delete_rental(&self, _: &ActiveRentalId) -> Result<u64, RepositoryError> {
        Err(down())
    }
    async fn delete_expired(&self, _: DateTime<Utc>) -> Result<u64, RepositoryError> {
        Err(down())
    }
}

/// Delegates to a memory store but refuses to record visits and counts sweeps.
/// Sweeps fail while `fail_sweeps` is set.
#[derive(Default)]
pub(super) struct FlakyRepository {
    pub inner: MemoryStore,
    pub sweeps: AtomicUsize,
    pub fail_sweeps: bool,
}

impl FlakyRepository {
    pub fn sweep_count(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RentalRepository for FlakyRepository {
    async fn insert_request(
        &self,
        request: RentalRequest,
    ) -> Result<RentalRequest, RepositoryError> {
        self.inner.insert_request(request).await
    }
    async fn list_requests(&self, limit: usize) -> Result<Vec<RentalRequest>, RepositoryError> {
        self.inner.list_requests(limit).await
    }
    async fn fetch_request(
        &self,
        id: &RentalRequestId,
    ) -> Result<Option<RentalRequest>, RepositoryError> {
        self.inner.fetch_request(id).await
    }
    async fn slug_in_use(&self, slug: &Slug) -> Result<bool, RepositoryError> {
        self.inner.slug_in_use(slug).await
    }
    async fn activate(&self, activation: Activation) -> Result<Transition, RepositoryError> {
        self.inner.activate(activation).await
    }
    async fn reject(
        &self,
        id: &RentalRequestId,
        at: DateTime<Utc>,
    ) -> Result<Transition, RepositoryError> {
        self.inner.reject(id, at).await
    }
    async fn list_active(&self, limit: usize) -> Result<Vec<ActiveRental>, RepositoryError> {
        self.inner.list_active(limit).await
    }
    async fn find_live_by_slug(
        &self,
        slug: &Slug,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveRental>, RepositoryError> {
        self.inner.find_live_by_slug(slug, now).await
    }
    async fn touch_rental(
        &self,
        _: &ActiveRentalId,
        _: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        Err(down())
    }
    async fn delete_rental(&self, id: &ActiveRentalId) -> Result<u64, RepositoryError> {
        self.inner.delete_rental(id).await
    }
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        if self.fail_sweeps {
            return Err(down());
        }
        self.inner.delete_expired(now).await
    }
}

/// A rental as approval would have provisioned it, expiring at `expires_at`.
pub(super) fn seeded_rental(slug: &str, expires_at: DateTime<Utc>) -> ActiveRental {
    ActiveRental {
        id: ActiveRentalId::generate(),
        rental_request_id: RentalRequestId::generate(),
        slug: Slug(slug.to_string()),
        business_name: "Acme".to_string(),
        business_data: profile(),
        expiration_date: expires_at,
        is_active: true,
        created_at: epoch(),
        last_accessed: epoch(),
    }
}

/// Store a pending request whose purchased count was tampered with after intake.
pub(super) async fn stored_request_with_count(store: &MemoryStore, count: u32) -> RentalRequest {
    let mut request = RentalRequest::pending(
        submission("1 month"),
        RentalRequestId::generate(),
        Slug::generate(),
        epoch(),
    );
    request.duration_value = count;
    store
        .insert_request(request)
        .await
        .expect("request stored")
}
