//! PostgreSQL store backend.
//!
//! Uses sqlx with runtime-bound queries. Visibility filters lower to
//! per-arm queries rather than string-built `WHERE` clauses, so every
//! shape stays bind-checked. The `(job_id, applicant_id)` unique index
//! and the `ON DELETE CASCADE` foreign key carry the two invariants the
//! application layer cannot enforce on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use crate::error::{BoardError, Result};
use crate::model::{
    Application, ApplicationId, ApplicationStatus, Company, CompanyId, Job, JobId, JobStatus,
    Notification, NotificationKind, Role, User, UserId,
};
use crate::policy::VisibilityFilter;

use super::Store;

/// Postgres-backed storage.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with a fresh pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| BoardError::internal(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<User> {
    let role: String = row.try_get("role").map_err(BoardError::from)?;
    Ok(User {
        id: UserId(row.try_get::<Uuid, _>("id").map_err(BoardError::from)?),
        username: row.try_get("username").map_err(BoardError::from)?,
        email: row.try_get("email").map_err(BoardError::from)?,
        role: Role::parse(&role)
            .ok_or_else(|| BoardError::internal(format!("unknown role in users table: {role}")))?,
        password_hash: row.try_get("password_hash").map_err(BoardError::from)?,
        created_at: row.try_get("created_at").map_err(BoardError::from)?,
    })
}

fn job_from_row(row: &sqlx::postgres::PgRow) -> Result<Job> {
    let status: String = row.try_get("status").map_err(BoardError::from)?;
    Ok(Job {
        id: JobId(row.try_get::<Uuid, _>("id").map_err(BoardError::from)?),
        employer_id: UserId(row.try_get::<Uuid, _>("employer_id").map_err(BoardError::from)?),
        company_id: row
            .try_get::<Option<Uuid>, _>("company_id")
            .map_err(BoardError::from)?
            .map(CompanyId),
        title: row.try_get("title").map_err(BoardError::from)?,
        description: row.try_get("description").map_err(BoardError::from)?,
        location: row.try_get("location").map_err(BoardError::from)?,
        status: JobStatus::parse(&status).ok_or_else(|| {
            BoardError::internal(format!("unknown status in jobs table: {status}"))
        })?,
        application_deadline: row
            .try_get::<Option<DateTime<Utc>>, _>("application_deadline")
            .map_err(BoardError::from)?,
        created_at: row.try_get("created_at").map_err(BoardError::from)?,
    })
}

fn application_from_row(row: &sqlx::postgres::PgRow) -> Result<Application> {
    let status: String = row.try_get("status").map_err(BoardError::from)?;
    Ok(Application {
        id: ApplicationId(row.try_get::<Uuid, _>("id").map_err(BoardError::from)?),
        job_id: JobId(row.try_get::<Uuid, _>("job_id").map_err(BoardError::from)?),
        applicant_id: UserId(row.try_get::<Uuid, _>("applicant_id").map_err(BoardError::from)?),
        status: ApplicationStatus::parse(&status).ok_or_else(|| {
            BoardError::internal(format!("unknown status in applications table: {status}"))
        })?,
        cover_letter: row
            .try_get::<Option<String>, _>("cover_letter")
            .map_err(BoardError::from)?,
        applied_at: row.try_get("applied_at").map_err(BoardError::from)?,
    })
}

fn notification_from_row(row: &sqlx::postgres::PgRow) -> Result<Notification> {
    let kind: String = row.try_get("kind").map_err(BoardError::from)?;
    Ok(Notification {
        id: row.try_get::<Uuid, _>("id").map_err(BoardError::from)?,
        recipient_id: UserId(row.try_get::<Uuid, _>("recipient_id").map_err(BoardError::from)?),
        kind: NotificationKind::parse(&kind).ok_or_else(|| {
            BoardError::internal(format!("unknown kind in notifications table: {kind}"))
        })?,
        message: row.try_get("message").map_err(BoardError::from)?,
        job_id: row
            .try_get::<Option<Uuid>, _>("job_id")
            .map_err(BoardError::from)?
            .map(JobId),
        application_id: row
            .try_get::<Option<Uuid>, _>("application_id")
            .map_err(BoardError::from)?
            .map(ApplicationId),
        is_read: row.try_get("is_read").map_err(BoardError::from)?,
        created_at: row.try_get("created_at").map_err(BoardError::from)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Store impl
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.0)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs
                (id, employer_id, company_id, title, description, location,
                 status, application_deadline, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(job.id.0)
        .bind(job.employer_id.0)
        .bind(job.company_id.map(|c| c.0))
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.location)
        .bind(job.status.as_str())
        .bind(job.application_deadline)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn job(&self, id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_jobs(&self, filter: &VisibilityFilter, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let rows = match filter {
            VisibilityFilter::Unrestricted => {
                sqlx::query("SELECT * FROM jobs ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
            VisibilityFilter::AcceptingJobs => {
                sqlx::query(
                    r#"
                    SELECT * FROM jobs
                    WHERE status = 'open'
                      AND (application_deadline IS NULL OR application_deadline >= $1)
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(now)
                .fetch_all(&self.pool)
                .await?
            }
            VisibilityFilter::JobsOwnedBy(employer) => {
                sqlx::query("SELECT * FROM jobs WHERE employer_id = $1 ORDER BY created_at DESC")
                    .bind(employer.0)
                    .fetch_all(&self.pool)
                    .await?
            }
            _ => return Ok(Vec::new()),
        };
        rows.iter().map(job_from_row).collect()
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET title = $2, description = $3, location = $4, status = $5,
                application_deadline = $6, company_id = $7
            WHERE id = $1
            "#,
        )
        .bind(job.id.0)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.location)
        .bind(job.status.as_str())
        .bind(job.application_deadline)
        .bind(job.company_id.map(|c| c.0))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::not_found("Job", job.id));
        }
        Ok(())
    }

    async fn delete_job(&self, id: JobId) -> Result<()> {
        // Applications go with the job via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BoardError::not_found("Job", id));
        }
        Ok(())
    }

    async fn insert_application(&self, application: &Application) -> Result<()> {
        // The unique index applications_job_id_applicant_id_key settles
        // the concurrent-duplicate race; see the From<sqlx::Error> mapping.
        sqlx::query(
            r#"
            INSERT INTO applications
                (id, job_id, applicant_id, status, cover_letter, applied_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(application.id.0)
        .bind(application.job_id.0)
        .bind(application.applicant_id.0)
        .bind(application.status.as_str())
        .bind(&application.cover_letter)
        .bind(application.applied_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn application(&self, id: ApplicationId) -> Result<Option<Application>> {
        let row = sqlx::query("SELECT * FROM applications WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(application_from_row).transpose()
    }

    async fn has_application(&self, job_id: JobId, applicant_id: UserId) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS present FROM applications WHERE job_id = $1 AND applicant_id = $2",
        )
        .bind(job_id.0)
        .bind(applicant_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn list_applications(&self, filter: &VisibilityFilter) -> Result<Vec<Application>> {
        let rows = match filter {
            VisibilityFilter::Unrestricted => {
                sqlx::query("SELECT * FROM applications ORDER BY applied_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
            VisibilityFilter::ApplicationsBy(applicant) => {
                sqlx::query(
                    "SELECT * FROM applications WHERE applicant_id = $1 ORDER BY applied_at DESC",
                )
                .bind(applicant.0)
                .fetch_all(&self.pool)
                .await?
            }
            VisibilityFilter::ApplicationsManagedBy(employer) => {
                sqlx::query(
                    r#"
                    SELECT a.* FROM applications a
                    JOIN jobs j ON j.id = a.job_id
                    WHERE j.employer_id = $1
                    ORDER BY a.applied_at DESC
                    "#,
                )
                .bind(employer.0)
                .fetch_all(&self.pool)
                .await?
            }
            _ => return Ok(Vec::new()),
        };
        rows.iter().map(application_from_row).collect()
    }

    async fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE applications SET status = $2 WHERE id = $1")
            .bind(id.0)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BoardError::not_found("Application", id));
        }
        Ok(())
    }

    async fn insert_company(&self, company: &Company) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO companies (id, name, description, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(company.id.0)
        .bind(&company.name)
        .bind(&company.description)
        .bind(company.created_at)
        .execute(&mut *tx)
        .await?;

        for admin in &company.admin_ids {
            sqlx::query("INSERT INTO company_admins (company_id, user_id) VALUES ($1, $2)")
                .bind(company.id.0)
                .bind(admin.0)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn company(&self, id: CompanyId) -> Result<Option<Company>> {
        let row = sqlx::query("SELECT * FROM companies WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };
        let admins = self.company_admins(id).await?;
        Ok(Some(Company {
            id,
            name: row.try_get("name").map_err(BoardError::from)?,
            description: row
                .try_get::<Option<String>, _>("description")
                .map_err(BoardError::from)?,
            admin_ids: admins,
            created_at: row.try_get("created_at").map_err(BoardError::from)?,
        }))
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        let rows = sqlx::query("SELECT * FROM companies ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        let mut companies = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = CompanyId(row.try_get::<Uuid, _>("id").map_err(BoardError::from)?);
            let admins = self.company_admins(id).await?;
            companies.push(Company {
                id,
                name: row.try_get("name").map_err(BoardError::from)?,
                description: row
                    .try_get::<Option<String>, _>("description")
                    .map_err(BoardError::from)?,
                admin_ids: admins,
                created_at: row.try_get("created_at").map_err(BoardError::from)?,
            });
        }
        Ok(companies)
    }

    async fn company_admins(&self, id: CompanyId) -> Result<Vec<UserId>> {
        let rows = sqlx::query("SELECT user_id FROM company_admins WHERE company_id = $1")
            .bind(id.0)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(UserId(
                    row.try_get::<Uuid, _>("user_id").map_err(BoardError::from)?,
                ))
            })
            .collect()
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, recipient_id, kind, message, job_id, application_id, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.recipient_id.0)
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(notification.job_id.map(|j| j.0))
        .bind(notification.application_id.map(|a| a.0))
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn notifications_for(&self, recipient: UserId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC",
        )
        .bind(recipient.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(notification_from_row).collect()
    }
}
