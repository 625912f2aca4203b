//! API request handlers.
//!
//! Handlers stay thin: parse the request, hand the principal and inputs
//! to [`crate::service::BoardService`], wrap the result in the response
//! envelope. All authorization happens behind the service seam.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{ApiResponse, AppState, CurrentUser};
use crate::error::{BoardError, Result};
use crate::model::{
    ApplicationId, ApplicationStatus, CompanyId, JobId, JobStatus, Role, User,
};
use crate::service::{JobUpdate, NewJob, NewUser};

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Auth
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_uuid(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let role = Role::parse(&req.role)
        .ok_or_else(|| BoardError::validation(format!("Unknown role: {}", req.role)))?;

    let user = state
        .service
        .register(NewUser {
            username: req.username,
            email: req.email,
            password: req.password,
            role,
        })
        .await?;

    let token = state.tokens.issue(&user)?;
    let response = AuthResponse {
        token,
        user: UserResponse::from(&user),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = state.service.login(&req.username, &req.password).await?;
    let token = state.tokens.issue(&user)?;
    let response = AuthResponse {
        token,
        user: UserResponse::from(&user),
    };
    Ok(Json(ApiResponse::success(response)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Jobs
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub company_id: Option<Uuid>,
    pub application_deadline: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    // Distinguishes `"application_deadline": null` (clear the deadline)
    // from the field being absent (leave it unchanged).
    #[serde(default, deserialize_with = "double_option")]
    pub application_deadline: Option<Option<DateTime<Utc>>>,
}

fn double_option<'de, D>(deserializer: D) -> std::result::Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<DateTime<Utc>>::deserialize(deserializer).map(Some)
}

pub async fn create_job(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(req): Json<CreateJobRequest>,
) -> Result<impl IntoResponse> {
    let job = state
        .service
        .create_job(
            &principal,
            NewJob {
                title: req.title,
                description: req.description,
                location: req.location,
                company_id: req.company_id.map(CompanyId::from),
                application_deadline: req.application_deadline,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(job))))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse> {
    let jobs = state.service.list_jobs(&principal).await?;
    Ok(Json(ApiResponse::success(jobs)))
}

pub async fn get_job(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.service.get_job(&principal, JobId::from(id)).await?;
    Ok(Json(ApiResponse::success(job)))
}

pub async fn update_job(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<impl IntoResponse> {
    let status = match req.status.as_deref() {
        Some(raw) => Some(
            JobStatus::parse(raw)
                .ok_or_else(|| BoardError::validation(format!("Unknown job status: {raw}")))?,
        ),
        None => None,
    };

    let job = state
        .service
        .update_job(
            &principal,
            JobId::from(id),
            JobUpdate {
                title: req.title,
                description: req.description,
                location: req.location,
                status,
                application_deadline: req.application_deadline,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(job)))
}

pub async fn delete_job(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.service.delete_job(&principal, JobId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Applications
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Default)]
pub struct ApplyRequest {
    pub cover_letter: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn apply(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<impl IntoResponse> {
    let application = state
        .service
        .apply(&principal, JobId::from(id), req.cover_letter)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(application))))
}

pub async fn list_applications(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse> {
    let applications = state.service.list_applications(&principal).await?;
    Ok(Json(ApiResponse::success(applications)))
}

pub async fn get_application(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state
        .service
        .get_application(&principal, ApplicationId::from(id))
        .await?;
    Ok(Json(ApiResponse::success(application)))
}

pub async fn update_application_status(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse> {
    let status = ApplicationStatus::parse(&req.status).ok_or_else(|| {
        BoardError::validation(format!("Unknown application status: {}", req.status))
    })?;

    let application = state
        .service
        .update_application_status(&principal, ApplicationId::from(id), status)
        .await?;
    Ok(Json(ApiResponse::success(application)))
}

pub async fn withdraw(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state
        .service
        .withdraw(&principal, ApplicationId::from(id))
        .await?;
    Ok(Json(ApiResponse::success(application)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Companies
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_company(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<impl IntoResponse> {
    let company = state
        .service
        .create_company(&principal, req.name, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(company))))
}

pub async fn list_companies(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse> {
    let companies = state.service.list_companies(&principal).await?;
    Ok(Json(ApiResponse::success(companies)))
}

pub async fn get_company(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let company = state
        .service
        .get_company(&principal, CompanyId::from(id))
        .await?;
    Ok(Json(ApiResponse::success(company)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Notifications
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse> {
    let notifications = state.service.my_notifications(&principal).await?;
    Ok(Json(ApiResponse::success(notifications)))
}
