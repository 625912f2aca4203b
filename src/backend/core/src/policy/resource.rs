//! Read-only resource views consumed by the policy engine.
//!
//! Views carry only the fields rule evaluation needs (ownership, status,
//! deadline), decoupling the engine from the persisted records and from
//! whatever the persistence layer joins in.

use chrono::{DateTime, Utc};

use crate::model::{
    Application, ApplicationId, ApplicationStatus, Company, CompanyId, Job, JobId, JobStatus,
    UserId,
};

use super::visibility::EntityKind;

// ═══════════════════════════════════════════════════════════════════════════════
// Views
// ═══════════════════════════════════════════════════════════════════════════════

/// Policy-relevant slice of a job posting.
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    pub id: JobId,
    pub employer_id: UserId,
    pub company_id: Option<CompanyId>,
    /// Admins of the owning company, when the job is company-attached.
    /// They share write access with the owning employer.
    pub company_admins: Vec<UserId>,
    pub status: JobStatus,
    pub application_deadline: Option<DateTime<Utc>>,
}

impl JobView {
    /// Same gate as [`Job::accepts_applications`].
    pub fn accepts_applications(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Open
            && self.application_deadline.map_or(true, |d| now <= d)
    }

    /// Whether the given user owns this job, directly or through
    /// company admin membership.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.employer_id == user_id || self.company_admins.contains(&user_id)
    }
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            employer_id: job.employer_id,
            company_id: job.company_id,
            company_admins: Vec::new(),
            status: job.status,
            application_deadline: job.application_deadline,
        }
    }
}

impl JobView {
    pub fn with_company_admins(mut self, admins: Vec<UserId>) -> Self {
        self.company_admins = admins;
        self
    }
}

/// Policy-relevant slice of an application, with the owning job's
/// employer denormalized in so evaluation needs no further loads.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub applicant_id: UserId,
    pub job_employer_id: UserId,
    pub status: ApplicationStatus,
}

impl ApplicationView {
    pub fn from_parts(application: &Application, job: &Job) -> Self {
        Self {
            id: application.id,
            job_id: application.job_id,
            applicant_id: application.applicant_id,
            job_employer_id: job.employer_id,
            status: application.status,
        }
    }
}

/// Policy-relevant slice of a company.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyView {
    pub id: CompanyId,
    pub admin_ids: Vec<UserId>,
}

impl CompanyView {
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

impl From<&Company> for CompanyView {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id,
            admin_ids: company.admin_ids.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Target
// ═══════════════════════════════════════════════════════════════════════════════

/// What a policy decision is about.
///
/// Single-resource actions carry the loaded view; `create`/`list` have no
/// existing resource, so they carry the entity kind (and, for an
/// application create, the target job plus the duplicate pre-check).
#[derive(Debug, Clone)]
pub enum Target<'a> {
    Job(&'a JobView),
    Application(&'a ApplicationView),
    Company(&'a CompanyView),
    /// A collection listing of the given kind.
    Collection(EntityKind),
    /// Creating a new job posting.
    NewJob,
    /// Creating a new company.
    NewCompany,
    /// Applying to `job`. `already_applied` is the caller's consistent
    /// read of the uniqueness pre-check; the store re-enforces it at
    /// commit time.
    NewApplication {
        job: &'a JobView,
        already_applied: bool,
    },
}

impl Target<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Target::Job(_) | Target::NewJob => EntityKind::Job,
            Target::Application(_) | Target::NewApplication { .. } => EntityKind::Application,
            Target::Company(_) | Target::NewCompany => EntityKind::Company,
            Target::Collection(kind) => *kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn view(status: JobStatus, deadline: Option<DateTime<Utc>>) -> JobView {
        JobView {
            id: JobId::new(),
            employer_id: UserId::new(),
            company_id: None,
            company_admins: Vec::new(),
            status,
            application_deadline: deadline,
        }
    }

    #[test]
    fn test_job_view_accepts_mirrors_model() {
        let now = Utc::now();
        assert!(view(JobStatus::Open, None).accepts_applications(now));
        assert!(!view(JobStatus::Paused, None).accepts_applications(now));
        assert!(!view(JobStatus::Open, Some(now - Duration::minutes(1))).accepts_applications(now));
    }

    #[test]
    fn test_job_ownership_through_company_admins() {
        let admin = UserId::new();
        let v = view(JobStatus::Open, None).with_company_admins(vec![admin]);
        assert!(v.is_owned_by(admin));
        assert!(v.is_owned_by(v.employer_id));
        assert!(!v.is_owned_by(UserId::new()));
    }

    #[test]
    fn test_target_kind() {
        assert_eq!(Target::NewJob.kind(), EntityKind::Job);
        assert_eq!(
            Target::Collection(EntityKind::Application).kind(),
            EntityKind::Application
        );
    }
}
