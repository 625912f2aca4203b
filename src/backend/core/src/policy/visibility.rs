//! Declarative visibility filters for collection queries.
//!
//! A [`VisibilityFilter`] is a predicate, not query code: the in-memory
//! store evaluates it with [`VisibilityFilter::matches_job`] /
//! [`VisibilityFilter::matches_application`], the Postgres store lowers it
//! to a `WHERE` clause. Both backends must agree with these matchers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Application, Job, UserId};

/// The kinds of entities a collection query can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Job,
    Application,
    Company,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Application => "application",
            Self::Company => "company",
        }
    }
}

/// Restriction applied to a collection query on behalf of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum VisibilityFilter {
    /// No restriction (admins).
    Unrestricted,
    /// Jobs currently accepting applications (anonymous users and
    /// job seekers browsing the public board).
    AcceptingJobs,
    /// Jobs owned by the given employer.
    JobsOwnedBy(UserId),
    /// Applications submitted by the given job seeker.
    ApplicationsBy(UserId),
    /// Applications to jobs owned by the given employer.
    ApplicationsManagedBy(UserId),
    /// Nothing is visible.
    Hidden,
}

impl VisibilityFilter {
    /// Evaluate this filter against a job record.
    pub fn matches_job(&self, job: &Job, now: DateTime<Utc>) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::AcceptingJobs => job.accepts_applications(now),
            Self::JobsOwnedBy(employer) => job.employer_id == *employer,
            Self::Hidden => false,
            // Application-shaped filters never admit jobs.
            Self::ApplicationsBy(_) | Self::ApplicationsManagedBy(_) => false,
        }
    }

    /// Evaluate this filter against an application record. The owning
    /// job is passed alongside because employer scoping is a join.
    pub fn matches_application(&self, application: &Application, job: &Job) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::ApplicationsBy(applicant) => application.applicant_id == *applicant,
            Self::ApplicationsManagedBy(employer) => job.employer_id == *employer,
            Self::Hidden => false,
            Self::AcceptingJobs | Self::JobsOwnedBy(_) => false,
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden)
    }
}
