//! HTTP API layer.
//!
//! All routes live under `/api/v1/`. Handlers return
//! `Result<impl IntoResponse, BoardError>` so errors map to HTTP status
//! codes through the `IntoResponse` implementation on `BoardError`.

mod extract;
mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::service::BoardService;

pub use extract::CurrentUser;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BoardService>,
    pub tokens: Arc<TokenService>,
}

/// Standard response envelope.
#[derive(Debug, Serialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Build the application router.
///
/// # Endpoints
///
/// ## Auth
/// - `POST /api/v1/auth/register` - Create an account
/// - `POST /api/v1/auth/login` - Exchange credentials for a token
///
/// ## Jobs
/// - `GET /api/v1/jobs` - List jobs visible to the caller
/// - `POST /api/v1/jobs` - Post a job (employer)
/// - `GET /api/v1/jobs/:id` - Get a job
/// - `PATCH /api/v1/jobs/:id` - Update a job (owner)
/// - `DELETE /api/v1/jobs/:id` - Delete a job and its applications (owner)
/// - `POST /api/v1/jobs/:id/apply` - Submit an application (job seeker)
///
/// ## Applications
/// - `GET /api/v1/applications` - List applications visible to the caller
/// - `GET /api/v1/applications/:id` - Get an application
/// - `POST /api/v1/applications/:id/status` - Transition status (job owner)
/// - `DELETE /api/v1/applications/:id` - Withdraw (applicant)
///
/// ## Companies
/// - `GET /api/v1/companies` - List companies
/// - `POST /api/v1/companies` - Create a company (employer)
/// - `GET /api/v1/companies/:id` - Get a company
///
/// ## Notifications
/// - `GET /api/v1/notifications` - List the caller's notifications
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let v1 = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/jobs", get(handlers::list_jobs).post(handlers::create_job))
        .route(
            "/jobs/:id",
            get(handlers::get_job)
                .patch(handlers::update_job)
                .delete(handlers::delete_job),
        )
        .route("/jobs/:id/apply", post(handlers::apply))
        .route("/applications", get(handlers::list_applications))
        .route(
            "/applications/:id",
            get(handlers::get_application).delete(handlers::withdraw),
        )
        .route(
            "/applications/:id/status",
            post(handlers::update_application_status),
        )
        .route(
            "/companies",
            get(handlers::list_companies).post(handlers::create_company),
        )
        .route("/companies/:id", get(handlers::get_company))
        .route("/notifications", get(handlers::list_notifications));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_envelope_shape() {
        let response = ApiResponse::success("data");
        assert!(response.success);
        assert_eq!(response.data, Some("data"));
        assert!(response.error.is_none());

        let json = serde_json::to_value(&response).expect("serializes");
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }
}
