//! In-memory store backend.
//!
//! Backs tests and local development. The duplicate-application race is
//! settled through the `DashMap` entry API on the `(job_id, applicant_id)`
//! index: the check and the reservation happen under one shard lock, so
//! of two concurrent creates exactly one wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{BoardError, ErrorCode, Result};
use crate::model::{
    Application, ApplicationId, ApplicationStatus, Company, CompanyId, Job, JobId, Notification,
    User, UserId,
};
use crate::policy::VisibilityFilter;

use super::Store;

/// Thread-safe in-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    usernames: DashMap<String, UserId>,
    jobs: DashMap<JobId, Job>,
    applications: DashMap<ApplicationId, Application>,
    /// Uniqueness index for the one-application-per-job-per-seeker rule.
    application_index: DashMap<(JobId, UserId), ApplicationId>,
    companies: DashMap<CompanyId, Company>,
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn job_for_application(&self, application: &Application) -> Option<Job> {
        self.jobs.get(&application.job_id).map(|j| j.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<()> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(BoardError::new(
                ErrorCode::DuplicateRecord,
                "A user with this username already exists",
            )),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(())
            }
        }
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let id = match self.usernames.get(username) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Jobs
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_job(&self, job: &Job) -> Result<()> {
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn job(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.jobs.get(&id).map(|j| j.clone()))
    }

    async fn list_jobs(&self, filter: &VisibilityFilter, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| filter.matches_job(entry.value(), now))
            .map(|entry| entry.value().clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        if !self.jobs.contains_key(&job.id) {
            return Err(BoardError::not_found("Job", job.id));
        }
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn delete_job(&self, id: JobId) -> Result<()> {
        if self.jobs.remove(&id).is_none() {
            return Err(BoardError::not_found("Job", id));
        }
        // Cascade to applications and the uniqueness index.
        self.applications.retain(|_, app| app.job_id != id);
        self.application_index.retain(|(job_id, _), _| *job_id != id);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Applications
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_application(&self, application: &Application) -> Result<()> {
        let key = (application.job_id, application.applicant_id);
        match self.application_index.entry(key) {
            Entry::Occupied(_) => Err(BoardError::new(
                ErrorCode::AlreadyApplied,
                "You have already applied to this job",
            )
            .with_reason("already_applied")),
            Entry::Vacant(slot) => {
                slot.insert(application.id);
                self.applications
                    .insert(application.id, application.clone());
                Ok(())
            }
        }
    }

    async fn application(&self, id: ApplicationId) -> Result<Option<Application>> {
        Ok(self.applications.get(&id).map(|a| a.clone()))
    }

    async fn has_application(&self, job_id: JobId, applicant_id: UserId) -> Result<bool> {
        Ok(self.application_index.contains_key(&(job_id, applicant_id)))
    }

    async fn list_applications(&self, filter: &VisibilityFilter) -> Result<Vec<Application>> {
        let mut applications: Vec<Application> = self
            .applications
            .iter()
            .filter(|entry| {
                self.job_for_application(entry.value())
                    .map(|job| filter.matches_application(entry.value(), &job))
                    .unwrap_or(false)
            })
            .map(|entry| entry.value().clone())
            .collect();
        applications.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(applications)
    }

    async fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<()> {
        match self.applications.get_mut(&id) {
            Some(mut app) => {
                app.status = status;
                Ok(())
            }
            None => Err(BoardError::not_found("Application", id)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Companies
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_company(&self, company: &Company) -> Result<()> {
        self.companies.insert(company.id, company.clone());
        Ok(())
    }

    async fn company(&self, id: CompanyId) -> Result<Option<Company>> {
        Ok(self.companies.get(&id).map(|c| c.clone()))
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        let mut companies: Vec<Company> =
            self.companies.iter().map(|entry| entry.value().clone()).collect();
        companies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(companies)
    }

    async fn company_admins(&self, id: CompanyId) -> Result<Vec<UserId>> {
        Ok(self
            .companies
            .get(&id)
            .map(|c| c.admin_ids.clone())
            .unwrap_or_default())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications.write().push(notification.clone());
        Ok(())
    }

    async fn notifications_for(&self, recipient: UserId) -> Result<Vec<Notification>> {
        let mut result: Vec<Notification> = self
            .notifications
            .read()
            .iter()
            .filter(|n| n.recipient_id == recipient)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
