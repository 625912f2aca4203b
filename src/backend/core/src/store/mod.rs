//! Persistence collaborator.
//!
//! The policy and lifecycle layers never talk to storage directly; the
//! service loads records through this trait, applies decisions, then
//! writes back. Two backends exist: [`MemoryStore`] (tests, local dev)
//! and [`PgStore`] (production, sqlx/Postgres). Both uphold the same two
//! guarantees the policy layer cannot:
//!
//! - at most one application per `(job_id, applicant_id)`, enforced at
//!   commit time so concurrent creates cannot both win
//! - deleting a job cascades to its applications

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    Application, ApplicationId, ApplicationStatus, Company, CompanyId, Job, JobId, Notification,
    User, UserId,
};
use crate::policy::VisibilityFilter;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage interface consumed by the service layer.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new user. Duplicate usernames surface as
    /// [`crate::error::ErrorCode::DuplicateRecord`].
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Jobs
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_job(&self, job: &Job) -> Result<()>;

    async fn job(&self, id: JobId) -> Result<Option<Job>>;

    /// List jobs admitted by `filter`, newest first.
    async fn list_jobs(&self, filter: &VisibilityFilter, now: DateTime<Utc>) -> Result<Vec<Job>>;

    async fn update_job(&self, job: &Job) -> Result<()>;

    /// Delete a job and cascade to its applications.
    async fn delete_job(&self, id: JobId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Applications
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new application. A concurrent duplicate for the same
    /// `(job_id, applicant_id)` loses with
    /// [`crate::error::ErrorCode::AlreadyApplied`].
    async fn insert_application(&self, application: &Application) -> Result<()>;

    async fn application(&self, id: ApplicationId) -> Result<Option<Application>>;

    /// Consistent-read pre-check for the duplicate rule. Advisory only;
    /// `insert_application` is the authority.
    async fn has_application(&self, job_id: JobId, applicant_id: UserId) -> Result<bool>;

    /// List applications admitted by `filter`, newest first.
    async fn list_applications(&self, filter: &VisibilityFilter) -> Result<Vec<Application>>;

    async fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Companies
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_company(&self, company: &Company) -> Result<()>;

    async fn company(&self, id: CompanyId) -> Result<Option<Company>>;

    async fn list_companies(&self) -> Result<Vec<Company>>;

    /// Admin user ids for a company; empty when the company is unknown.
    async fn company_admins(&self, id: CompanyId) -> Result<Vec<UserId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    async fn notifications_for(&self, recipient: UserId) -> Result<Vec<Notification>>;
}
