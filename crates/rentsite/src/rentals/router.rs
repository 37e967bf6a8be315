use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{
    ActiveRentalId, ApprovalDecision, ApprovalOutcome, RentalRequestId, RentalSubmission, Slug,
};
use super::repository::RentalRepository;
use super::service::{RentalLifecycleService, RentalServiceError};

/// Router builder exposing the rental lifecycle over HTTP.
pub fn rental_router<R>(service: Arc<RentalLifecycleService<R>>) -> Router
where
    R: RentalRepository + 'static,
{
    Router::new()
        .route(
            "/api/rental-requests",
            post(submit_handler::<R>).get(list_requests_handler::<R>),
        )
        .route(
            "/api/rental-requests/:request_id/approve",
            post(approve_handler::<R>),
        )
        .route("/api/active-rentals", get(list_active_handler::<R>))
        .route(
            "/api/active-rentals/:rental_id",
            delete(delete_active_handler::<R>),
        )
        .route("/api/rental/:slug", get(public_site_handler::<R>))
        .with_state(service)
}

/// Map a service failure to a response. Internal failures are logged with
/// their context and reported without detail.
fn failure(operation: &'static str, subject: &str, error: RentalServiceError) -> Response {
    let status = match &error {
        RentalServiceError::RequestNotFound(_)
        | RentalServiceError::RentalNotFound(_)
        | RentalServiceError::SlugNotFound(_) => StatusCode::NOT_FOUND,
        RentalServiceError::AlreadyDecided { .. } => StatusCode::CONFLICT,
        RentalServiceError::Repository(err) => {
            error!(operation, subject, error = %err, "rental operation failed");
            let payload = json!({ "error": "internal server error" });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<RentalLifecycleService<R>>>,
    axum::Json(submission): axum::Json<RentalSubmission>,
) -> Response
where
    R: RentalRepository + 'static,
{
    let business_name = submission.business_name.clone();
    match service.submit(submission).await {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(err) => failure("submit_rental_request", &business_name, err),
    }
}

pub(crate) async fn list_requests_handler<R>(
    State(service): State<Arc<RentalLifecycleService<R>>>,
) -> Response
where
    R: RentalRepository + 'static,
{
    match service.list_requests().await {
        Ok(requests) => (StatusCode::OK, axum::Json(requests)).into_response(),
        Err(err) => failure("list_rental_requests", "*", err),
    }
}

pub(crate) async fn approve_handler<R>(
    State(service): State<Arc<RentalLifecycleService<R>>>,
    Path(request_id): Path<String>,
    axum::Json(decision): axum::Json<ApprovalDecision>,
) -> Response
where
    R: RentalRepository + 'static,
{
    let id = RentalRequestId(request_id);
    match service.approve(&id, decision).await {
        Ok(ApprovalOutcome::Approved { rental, .. }) => {
            let url = rental.slug.public_path();
            let payload = json!({
                "message": "Rental approved successfully",
                "rental": rental,
                "url": url,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(ApprovalOutcome::Rejected { .. }) => {
            let payload = json!({ "message": "Rental request rejected" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => failure("approve_rental_request", &id.0, err),
    }
}

pub(crate) async fn list_active_handler<R>(
    State(service): State<Arc<RentalLifecycleService<R>>>,
) -> Response
where
    R: RentalRepository + 'static,
{
    match service.list_active().await {
        Ok(rentals) => (StatusCode::OK, axum::Json(rentals)).into_response(),
        Err(err) => failure("list_active_rentals", "*", err),
    }
}

pub(crate) async fn public_site_handler<R>(
    State(service): State<Arc<RentalLifecycleService<R>>>,
    Path(slug): Path<String>,
) -> Response
where
    R: RentalRepository + 'static,
{
    let slug = Slug(slug);
    match service.resolve_slug(&slug).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => failure("resolve_rental_slug", &slug.0, err),
    }
}

pub(crate) async fn delete_active_handler<R>(
    State(service): State<Arc<RentalLifecycleService<R>>>,
    Path(rental_id): Path<String>,
) -> Response
where
    R: RentalRepository + 'static,
{
    let id = ActiveRentalId(rental_id);
    match service.delete_active(&id).await {
        Ok(()) => {
            let payload = json!({ "message": "Rental deleted successfully" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => failure("delete_active_rental", &id.0, err),
    }
}
