//! Client check-in log kept alongside the rental collections.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::rentals::{RepositoryError, LIST_CAP};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCheck {
    pub id: String,
    pub client_name: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusCheck {
    pub fn record(client_name: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_name,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusCheckCreate {
    pub client_name: String,
}

#[async_trait]
pub trait StatusCheckRepository: Send + Sync {
    async fn insert_check(&self, check: StatusCheck) -> Result<StatusCheck, RepositoryError>;
    async fn list_checks(&self, limit: usize) -> Result<Vec<StatusCheck>, RepositoryError>;
}

pub fn status_router<S>(store: Arc<S>) -> Router
where
    S: StatusCheckRepository + 'static,
{
    Router::new()
        .route("/api/", get(greeting))
        .route(
            "/api/status",
            get(list_checks_handler::<S>).post(create_check_handler::<S>),
        )
        .with_state(store)
}

async fn greeting() -> Json<serde_json::Value> {
    Json(json!({ "message": "Hello World" }))
}

pub(crate) async fn create_check_handler<S>(
    State(store): State<Arc<S>>,
    Json(input): Json<StatusCheckCreate>,
) -> Response
where
    S: StatusCheckRepository + 'static,
{
    let check = StatusCheck::record(input.client_name, Utc::now());
    match store.insert_check(check).await {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(err) => {
            error!(operation = "create_status_check", error = %err, "status check failed");
            internal_error()
        }
    }
}

pub(crate) async fn list_checks_handler<S>(State(store): State<Arc<S>>) -> Response
where
    S: StatusCheckRepository + 'static,
{
    match store.list_checks(LIST_CAP).await {
        Ok(checks) => (StatusCode::OK, Json(checks)).into_response(),
        Err(err) => {
            error!(operation = "list_status_checks", error = %err, "status check failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    let payload = json!({ "error": "internal server error" });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn greeting_route_says_hello() {
        let router = status_router(Arc::new(MemoryStore::default()));
        let response = router
            .oneshot(Request::get("/api/").body(Body::empty()).expect("request builds"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["message"], "Hello World");
    }

    #[tokio::test]
    async fn created_checks_are_listed() {
        let store = Arc::new(MemoryStore::default());
        let router = status_router(store.clone());

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/status")
                    .header(axum::http::header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"client_name":"uptime-monitor"}"#))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let checks = store.list_checks(LIST_CAP).await.expect("list succeeds");
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].client_name, "uptime-monitor");

        let response = router
            .oneshot(Request::get("/api/status").body(Body::empty()).expect("request builds"))
            .await
            .expect("router responds");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body[0]["client_name"], "uptime-monitor");
    }
}
