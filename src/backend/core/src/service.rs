//! Request-scoped orchestration.
//!
//! Every operation follows the same shape: resolve the target resource,
//! ask the policy engine for a decision, apply the mutation, let the
//! lifecycle controller validate any status change, then dispatch
//! notifications fire-and-forget. Denials short-circuit before any
//! mutation.
//!
//! Read denials are masked: a resource the principal may not see yields
//! the same 404 as one that does not exist, so existence never leaks.
//! Mutation denials keep their 403 so callers can distinguish "not
//! yours" from "gone".

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, verify_password, AuthError};
use crate::error::{BoardError, Result};
use crate::lifecycle::LifecycleController;
use crate::model::{
    Application, ApplicationId, ApplicationStatus, Company, CompanyId, Job, JobId, JobStatus,
    Notification, Role, User, UserId,
};
use crate::notify::{self, NotificationEvent, Notifier};
use crate::policy::{
    Action, ApplicationView, CompanyView, Decision, DenyReason, EntityKind, JobView, PolicyEngine,
    Principal, Target,
};
use crate::store::Store;

// ═══════════════════════════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════════════════════════

/// Fields for a new job posting.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub location: String,
    pub company_id: Option<CompanyId>,
    pub application_deadline: Option<DateTime<Utc>>,
}

/// Partial update to a job posting. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<JobStatus>,
    pub application_deadline: Option<Option<DateTime<Utc>>>,
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════════════

/// The application core: policy, lifecycle, storage, and notification
/// dispatch behind one seam the HTTP layer calls into.
pub struct BoardService {
    store: Arc<dyn Store>,
    policy: PolicyEngine,
    lifecycle: LifecycleController,
    notifier: Arc<dyn Notifier>,
}

impl BoardService {
    pub fn new(
        store: Arc<dyn Store>,
        lifecycle: LifecycleController,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            policy: PolicyEngine::new(),
            lifecycle,
            notifier,
        }
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Enforce a decision, masking read denials as not-found.
    fn check(
        &self,
        principal: &Principal,
        action: Action,
        target: &Target<'_>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match self.policy.decide(principal, action, target, now) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                if action == Action::View
                    && matches!(reason, DenyReason::NotOwner | DenyReason::NotVisible)
                {
                    Err(BoardError::denied(DenyReason::NotVisible))
                } else {
                    Err(BoardError::denied(reason))
                }
            }
        }
    }

    fn actor_id(principal: &Principal) -> Result<UserId> {
        principal
            .id()
            .ok_or_else(|| BoardError::denied(DenyReason::Unauthenticated))
    }

    /// Build the policy view of a job, resolving company admins when the
    /// job is company-attached.
    async fn job_view(&self, job: &Job) -> Result<JobView> {
        let mut view = JobView::from(job);
        if let Some(company_id) = job.company_id {
            view.company_admins = self.store.company_admins(company_id).await?;
        }
        Ok(view)
    }

    async fn load_job(&self, id: JobId) -> Result<Job> {
        self.store
            .job(id)
            .await?
            .ok_or_else(|| BoardError::not_found("Job", id))
    }

    async fn load_application(&self, id: ApplicationId) -> Result<(Application, Job)> {
        let application = self
            .store
            .application(id)
            .await?
            .ok_or_else(|| BoardError::not_found("Application", id))?;
        // Cascade deletes make a dangling job a genuine 404, not a bug.
        let job = self
            .store
            .job(application.job_id)
            .await?
            .ok_or_else(|| BoardError::not_found("Application", id))?;
        Ok((application, job))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn register(&self, input: NewUser) -> Result<User> {
        if input.username.trim().is_empty() {
            return Err(BoardError::validation("Username cannot be empty"));
        }
        if input.password.len() < 8 {
            return Err(BoardError::validation(
                "Password must be at least 8 characters",
            ));
        }

        let user = User {
            id: UserId::new(),
            username: input.username,
            email: input.email,
            role: input.role,
            password_hash: hash_password(&input.password).map_err(BoardError::from)?,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;
        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .store
            .user_by_username(username)
            .await?
            .ok_or_else(|| BoardError::from(AuthError::InvalidCredentials))?;
        let valid = verify_password(password, &user.password_hash).map_err(BoardError::from)?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }
        Ok(user)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Jobs
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_job(&self, principal: &Principal, input: NewJob) -> Result<Job> {
        let now = Utc::now();
        self.check(principal, Action::Create, &Target::NewJob, now)?;

        if input.title.trim().is_empty() {
            return Err(BoardError::validation("Job title cannot be empty"));
        }

        let job = Job {
            id: JobId::new(),
            employer_id: Self::actor_id(principal)?,
            company_id: input.company_id,
            title: input.title,
            description: input.description,
            location: input.location,
            status: JobStatus::Open,
            application_deadline: input.application_deadline,
            created_at: now,
        };
        self.store.insert_job(&job).await?;
        info!(job_id = %job.id, employer_id = %job.employer_id, "Job created");
        Ok(job)
    }

    pub async fn get_job(&self, principal: &Principal, id: JobId) -> Result<Job> {
        let now = Utc::now();
        let job = self.load_job(id).await?;
        let view = self.job_view(&job).await?;
        self.check(principal, Action::View, &Target::Job(&view), now)?;
        Ok(job)
    }

    pub async fn list_jobs(&self, principal: &Principal) -> Result<Vec<Job>> {
        let now = Utc::now();
        self.check(
            principal,
            Action::List,
            &Target::Collection(EntityKind::Job),
            now,
        )?;
        let filter = self.policy.visibility(principal, EntityKind::Job);
        self.store.list_jobs(&filter, now).await
    }

    pub async fn update_job(
        &self,
        principal: &Principal,
        id: JobId,
        update: JobUpdate,
    ) -> Result<Job> {
        let now = Utc::now();
        let mut job = self.load_job(id).await?;
        let view = self.job_view(&job).await?;
        self.check(principal, Action::Update, &Target::Job(&view), now)?;

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(BoardError::validation("Job title cannot be empty"));
            }
            job.title = title;
        }
        if let Some(description) = update.description {
            job.description = description;
        }
        if let Some(location) = update.location {
            job.location = location;
        }
        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(deadline) = update.application_deadline {
            job.application_deadline = deadline;
        }

        self.store.update_job(&job).await?;
        info!(job_id = %job.id, status = %job.status, "Job updated");
        Ok(job)
    }

    pub async fn delete_job(&self, principal: &Principal, id: JobId) -> Result<()> {
        let now = Utc::now();
        let job = self.load_job(id).await?;
        let view = self.job_view(&job).await?;
        self.check(principal, Action::Delete, &Target::Job(&view), now)?;
        self.store.delete_job(id).await?;
        info!(job_id = %id, "Job deleted (applications cascaded)");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Applications
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn apply(
        &self,
        principal: &Principal,
        job_id: JobId,
        cover_letter: Option<String>,
    ) -> Result<Application> {
        let now = Utc::now();
        let job = self.load_job(job_id).await?;
        let view = self.job_view(&job).await?;

        // Advisory pre-check; the store's unique constraint is the
        // authority under concurrency.
        let already_applied = match principal.id() {
            Some(applicant) => self.store.has_application(job_id, applicant).await?,
            None => false,
        };

        self.check(
            principal,
            Action::Create,
            &Target::NewApplication {
                job: &view,
                already_applied,
            },
            now,
        )?;

        let application = Application {
            id: ApplicationId::new(),
            job_id,
            applicant_id: Self::actor_id(principal)?,
            status: ApplicationStatus::Applied,
            cover_letter,
            applied_at: now,
        };
        self.store.insert_application(&application).await?;
        info!(
            application_id = %application.id,
            job_id = %job_id,
            applicant_id = %application.applicant_id,
            "Application submitted"
        );

        notify::dispatch(
            self.notifier.as_ref(),
            NotificationEvent::ApplicationReceived {
                application: application.clone(),
                job,
            },
        )
        .await;

        Ok(application)
    }

    pub async fn get_application(
        &self,
        principal: &Principal,
        id: ApplicationId,
    ) -> Result<Application> {
        let now = Utc::now();
        let (application, job) = self.load_application(id).await?;
        let view = ApplicationView::from_parts(&application, &job);
        self.check(principal, Action::View, &Target::Application(&view), now)?;
        Ok(application)
    }

    pub async fn list_applications(&self, principal: &Principal) -> Result<Vec<Application>> {
        let now = Utc::now();
        self.check(
            principal,
            Action::List,
            &Target::Collection(EntityKind::Application),
            now,
        )?;
        let filter = self.policy.visibility(principal, EntityKind::Application);
        self.store.list_applications(&filter).await
    }

    pub async fn update_application_status(
        &self,
        principal: &Principal,
        id: ApplicationId,
        new_status: ApplicationStatus,
    ) -> Result<Application> {
        let now = Utc::now();
        let (mut application, job) = self.load_application(id).await?;
        let view = ApplicationView::from_parts(&application, &job);
        self.check(
            principal,
            Action::TransitionStatus,
            &Target::Application(&view),
            now,
        )?;

        self.lifecycle.transition(&mut application, new_status)?;
        self.store
            .update_application_status(id, application.status)
            .await?;
        info!(
            application_id = %id,
            status = %application.status,
            "Application status updated"
        );

        notify::dispatch(
            self.notifier.as_ref(),
            NotificationEvent::ApplicationStatusChanged {
                application: application.clone(),
                job,
            },
        )
        .await;

        Ok(application)
    }

    pub async fn withdraw(
        &self,
        principal: &Principal,
        id: ApplicationId,
    ) -> Result<Application> {
        let now = Utc::now();
        let (mut application, job) = self.load_application(id).await?;
        let view = ApplicationView::from_parts(&application, &job);
        self.check(principal, Action::Withdraw, &Target::Application(&view), now)?;

        self.lifecycle.withdraw(&mut application)?;
        self.store
            .update_application_status(id, application.status)
            .await?;
        info!(application_id = %id, "Application withdrawn");

        notify::dispatch(
            self.notifier.as_ref(),
            NotificationEvent::ApplicationWithdrawn {
                application: application.clone(),
                job,
            },
        )
        .await;

        Ok(application)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Companies
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_company(
        &self,
        principal: &Principal,
        name: String,
        description: Option<String>,
    ) -> Result<Company> {
        let now = Utc::now();
        self.check(principal, Action::Create, &Target::NewCompany, now)?;
        if name.trim().is_empty() {
            return Err(BoardError::validation("Company name cannot be empty"));
        }

        let company = Company {
            id: CompanyId::new(),
            name,
            description,
            // The creator becomes the first admin.
            admin_ids: vec![Self::actor_id(principal)?],
            created_at: now,
        };
        self.store.insert_company(&company).await?;
        info!(company_id = %company.id, "Company created");
        Ok(company)
    }

    pub async fn get_company(&self, principal: &Principal, id: CompanyId) -> Result<Company> {
        let now = Utc::now();
        let company = self
            .store
            .company(id)
            .await?
            .ok_or_else(|| BoardError::not_found("Company", id))?;
        let view = CompanyView::from(&company);
        self.check(principal, Action::View, &Target::Company(&view), now)?;
        Ok(company)
    }

    pub async fn list_companies(&self, principal: &Principal) -> Result<Vec<Company>> {
        let now = Utc::now();
        self.check(
            principal,
            Action::List,
            &Target::Collection(EntityKind::Company),
            now,
        )?;
        self.store.list_companies().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn my_notifications(&self, principal: &Principal) -> Result<Vec<Notification>> {
        let recipient = Self::actor_id(principal)?;
        self.store.notifications_for(recipient).await
    }

    /// Lookup used by tests and admin tooling.
    pub async fn user(&self, id: UserId) -> Result<Option<User>> {
        self.store.user_by_id(id).await
    }
}
