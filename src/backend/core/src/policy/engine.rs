//! Policy engine for evaluating authorization decisions.
//!
//! The engine answers the question:
//! "Can principal P perform action A on target T right now?"
//!
//! Rules are evaluated in a fixed order, first match wins. The engine is
//! a pure function over its inputs: no I/O, no mutation, no clock access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::model::Role;

use super::principal::Principal;
use super::resource::Target;
use super::visibility::{EntityKind, VisibilityFilter};

// ═══════════════════════════════════════════════════════════════════════════════
// Actions
// ═══════════════════════════════════════════════════════════════════════════════

/// The closed set of actions the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    List,
    Create,
    Update,
    Delete,
    TransitionStatus,
    Withdraw,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::TransitionStatus => "transition_status",
            Self::Withdraw => "withdraw",
        }
    }

    /// Read actions never mutate; denials on them are masked as 404 at
    /// the API boundary so existence is not leaked.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::View | Self::List)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Reason codes attached to denials. Stable, machine-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Valid credentials are required for this action.
    Unauthenticated,
    /// The principal's role may never perform this action.
    ForbiddenRole,
    /// The principal does not own the target resource.
    NotOwner,
    /// The resource exists but the principal's visibility excludes it.
    NotVisible,
    /// The target job is not accepting applications.
    JobNotOpen,
    /// The principal already applied to the target job.
    AlreadyApplied,
    /// The action has no meaning for the target kind.
    UnsupportedAction,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ForbiddenRole => "forbidden_role",
            Self::NotOwner => "not_owner",
            Self::NotVisible => "not_visible",
            Self::JobNotOpen => "job_not_open",
            Self::AlreadyApplied => "already_applied",
            Self::UnsupportedAction => "unsupported_action",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action is allowed.
    Allow,
    /// The action is denied, with a reason code.
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(*reason),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy Engine
// ═══════════════════════════════════════════════════════════════════════════════

/// The central policy engine.
///
/// Stateless and trivially cloneable; one instance is shared across the
/// whole application.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate whether `principal` may perform `action` on `target`.
    ///
    /// `now` is the caller's consistent read of the clock, used for the
    /// job deadline gate.
    pub fn decide(
        &self,
        principal: &Principal,
        action: Action,
        target: &Target<'_>,
        now: DateTime<Utc>,
    ) -> Decision {
        let decision = self.evaluate(principal, action, target, now);
        if let Decision::Deny(reason) = decision {
            debug!(
                principal = %principal,
                action = %action,
                kind = target.kind().as_str(),
                reason = %reason,
                "Policy denied"
            );
            metrics::counter!(
                "jobboard_policy_denials_total",
                "action" => action.as_str(),
                "kind" => target.kind().as_str(),
                "reason" => reason.as_str(),
            )
            .increment(1);
        }
        decision
    }

    fn evaluate(
        &self,
        principal: &Principal,
        action: Action,
        target: &Target<'_>,
        now: DateTime<Utc>,
    ) -> Decision {
        // Rule 1: anonymous principals may only browse accepting jobs.
        let (id, role) = match principal {
            Principal::Anonymous => {
                return match (action, target) {
                    (Action::List, Target::Collection(EntityKind::Job)) => Decision::Allow,
                    (Action::View, Target::Job(job)) => {
                        if job.accepts_applications(now) {
                            Decision::Allow
                        } else {
                            Decision::Deny(DenyReason::NotVisible)
                        }
                    }
                    _ => Decision::Deny(DenyReason::Unauthenticated),
                };
            }
            Principal::Authenticated { id, role } => (*id, *role),
        };

        // Rule 2: admins may do everything.
        if role == Role::Admin {
            return Decision::Allow;
        }

        match (action, target) {
            // ── Jobs ────────────────────────────────────────────────────────
            (Action::Create, Target::NewJob) => {
                if role == Role::Employer {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::ForbiddenRole)
                }
            }
            (Action::Update | Action::Delete, Target::Job(job)) => {
                if job.is_owned_by(id) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotOwner)
                }
            }
            (Action::View, Target::Job(job)) => {
                // Owners see their own postings in any state; everyone
                // else only while the job accepts applications.
                if job.is_owned_by(id) || job.accepts_applications(now) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotVisible)
                }
            }
            (Action::List, Target::Collection(EntityKind::Job)) => Decision::Allow,

            // ── Applications ────────────────────────────────────────────────
            (
                Action::Create,
                Target::NewApplication {
                    job,
                    already_applied,
                },
            ) => {
                if role != Role::JobSeeker {
                    Decision::Deny(DenyReason::ForbiddenRole)
                } else if !job.accepts_applications(now) {
                    Decision::Deny(DenyReason::JobNotOpen)
                } else if *already_applied {
                    Decision::Deny(DenyReason::AlreadyApplied)
                } else {
                    Decision::Allow
                }
            }
            (Action::View, Target::Application(app)) => {
                if app.applicant_id == id || app.job_employer_id == id {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotOwner)
                }
            }
            (Action::Withdraw, Target::Application(app)) => {
                if app.applicant_id == id {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotOwner)
                }
            }
            (Action::TransitionStatus, Target::Application(app)) => {
                if app.job_employer_id == id {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotOwner)
                }
            }
            (Action::List, Target::Collection(EntityKind::Application)) => Decision::Allow,

            // ── Companies ───────────────────────────────────────────────────
            (Action::Create, Target::NewCompany) => {
                if role == Role::Employer {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::ForbiddenRole)
                }
            }
            (Action::View, Target::Company(_)) => Decision::Allow,
            (Action::List, Target::Collection(EntityKind::Company)) => Decision::Allow,
            (Action::Update | Action::Delete, Target::Company(company)) => {
                if company.is_admin(id) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotOwner)
                }
            }

            // Rule: anything not matched above is unsupported.
            _ => Decision::Deny(DenyReason::UnsupportedAction),
        }
    }

    /// Build the visibility filter restricting a collection query of
    /// `kind` on behalf of `principal`.
    pub fn visibility(&self, principal: &Principal, kind: EntityKind) -> VisibilityFilter {
        let (id, role) = match principal {
            Principal::Anonymous => {
                return match kind {
                    EntityKind::Job => VisibilityFilter::AcceptingJobs,
                    EntityKind::Application | EntityKind::Company => VisibilityFilter::Hidden,
                };
            }
            Principal::Authenticated { id, role } => (*id, *role),
        };

        match kind {
            EntityKind::Job => match role {
                Role::Admin => VisibilityFilter::Unrestricted,
                // Employers browsing "their" listings; the public board
                // is served to them through the anonymous path.
                Role::Employer => VisibilityFilter::JobsOwnedBy(id),
                Role::JobSeeker => VisibilityFilter::AcceptingJobs,
            },
            EntityKind::Application => match role {
                Role::Admin => VisibilityFilter::Unrestricted,
                Role::Employer => VisibilityFilter::ApplicationsManagedBy(id),
                Role::JobSeeker => VisibilityFilter::ApplicationsBy(id),
            },
            EntityKind::Company => VisibilityFilter::Unrestricted,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApplicationId, ApplicationStatus, CompanyId, JobId, JobStatus, UserId};
    use crate::policy::resource::{ApplicationView, CompanyView, JobView};
    use chrono::Duration;

    fn engine() -> PolicyEngine {
        PolicyEngine::new()
    }

    fn seeker() -> Principal {
        Principal::authenticated(UserId::new(), Role::JobSeeker)
    }

    fn employer() -> Principal {
        Principal::authenticated(UserId::new(), Role::Employer)
    }

    fn admin() -> Principal {
        Principal::authenticated(UserId::new(), Role::Admin)
    }

    fn job_view(employer_id: UserId, status: JobStatus) -> JobView {
        JobView {
            id: JobId::new(),
            employer_id,
            company_id: None,
            company_admins: Vec::new(),
            status,
            application_deadline: None,
        }
    }

    fn app_view(applicant_id: UserId, job_employer_id: UserId) -> ApplicationView {
        ApplicationView {
            id: ApplicationId::new(),
            job_id: JobId::new(),
            applicant_id,
            job_employer_id,
            status: ApplicationStatus::Applied,
        }
    }

    #[test]
    fn test_anonymous_can_browse_open_jobs() {
        let now = Utc::now();
        let p = Principal::anonymous();
        let open = job_view(UserId::new(), JobStatus::Open);

        assert!(engine()
            .decide(&p, Action::List, &Target::Collection(EntityKind::Job), now)
            .is_allowed());
        assert!(engine()
            .decide(&p, Action::View, &Target::Job(&open), now)
            .is_allowed());
    }

    #[test]
    fn test_anonymous_cannot_see_closed_job() {
        let now = Utc::now();
        let closed = job_view(UserId::new(), JobStatus::Closed);
        let decision = engine().decide(
            &Principal::anonymous(),
            Action::View,
            &Target::Job(&closed),
            now,
        );
        assert_eq!(decision, Decision::Deny(DenyReason::NotVisible));
    }

    #[test]
    fn test_anonymous_denied_everything_else() {
        let now = Utc::now();
        let p = Principal::anonymous();
        for target in [
            Target::NewJob,
            Target::NewCompany,
            Target::Collection(EntityKind::Application),
        ] {
            let decision = engine().decide(&p, Action::Create, &target, now);
            assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
        }
    }

    #[test]
    fn test_admin_allowed_everything() {
        let now = Utc::now();
        let p = admin();
        let job = job_view(UserId::new(), JobStatus::Closed);
        let app = app_view(UserId::new(), UserId::new());

        assert!(engine().decide(&p, Action::View, &Target::Job(&job), now).is_allowed());
        assert!(engine().decide(&p, Action::Delete, &Target::Job(&job), now).is_allowed());
        assert!(engine()
            .decide(&p, Action::TransitionStatus, &Target::Application(&app), now)
            .is_allowed());
        assert!(engine().decide(&p, Action::Create, &Target::NewJob, now).is_allowed());
    }

    #[test]
    fn test_only_employers_create_jobs() {
        let now = Utc::now();
        assert!(engine().decide(&employer(), Action::Create, &Target::NewJob, now).is_allowed());
        assert_eq!(
            engine().decide(&seeker(), Action::Create, &Target::NewJob, now),
            Decision::Deny(DenyReason::ForbiddenRole)
        );
    }

    #[test]
    fn test_job_update_requires_ownership() {
        let now = Utc::now();
        let owner = employer();
        let job = job_view(owner.id().unwrap(), JobStatus::Open);

        assert!(engine().decide(&owner, Action::Update, &Target::Job(&job), now).is_allowed());
        assert_eq!(
            engine().decide(&employer(), Action::Update, &Target::Job(&job), now),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_company_admin_may_edit_company_job() {
        let now = Utc::now();
        let member = employer();
        let mut job = job_view(UserId::new(), JobStatus::Open);
        job.company_id = Some(CompanyId::new());
        job.company_admins = vec![member.id().unwrap()];

        assert!(engine().decide(&member, Action::Update, &Target::Job(&job), now).is_allowed());
        assert!(engine().decide(&member, Action::Delete, &Target::Job(&job), now).is_allowed());
    }

    #[test]
    fn test_owner_sees_own_closed_job_others_do_not() {
        let now = Utc::now();
        let owner = employer();
        let job = job_view(owner.id().unwrap(), JobStatus::Closed);

        assert!(engine().decide(&owner, Action::View, &Target::Job(&job), now).is_allowed());
        assert_eq!(
            engine().decide(&seeker(), Action::View, &Target::Job(&job), now),
            Decision::Deny(DenyReason::NotVisible)
        );
    }

    #[test]
    fn test_apply_requires_job_seeker_role() {
        let now = Utc::now();
        let job = job_view(UserId::new(), JobStatus::Open);
        let target = Target::NewApplication {
            job: &job,
            already_applied: false,
        };
        assert!(engine().decide(&seeker(), Action::Create, &target, now).is_allowed());
        assert_eq!(
            engine().decide(&employer(), Action::Create, &target, now),
            Decision::Deny(DenyReason::ForbiddenRole)
        );
    }

    #[test]
    fn test_apply_to_closed_job_denied() {
        let now = Utc::now();
        let job = job_view(UserId::new(), JobStatus::Closed);
        let target = Target::NewApplication {
            job: &job,
            already_applied: false,
        };
        assert_eq!(
            engine().decide(&seeker(), Action::Create, &target, now),
            Decision::Deny(DenyReason::JobNotOpen)
        );
    }

    #[test]
    fn test_apply_past_deadline_denied() {
        let now = Utc::now();
        let mut job = job_view(UserId::new(), JobStatus::Open);
        job.application_deadline = Some(now - Duration::hours(1));
        let target = Target::NewApplication {
            job: &job,
            already_applied: false,
        };
        assert_eq!(
            engine().decide(&seeker(), Action::Create, &target, now),
            Decision::Deny(DenyReason::JobNotOpen)
        );
    }

    #[test]
    fn test_duplicate_application_denied() {
        let now = Utc::now();
        let job = job_view(UserId::new(), JobStatus::Open);
        let target = Target::NewApplication {
            job: &job,
            already_applied: true,
        };
        assert_eq!(
            engine().decide(&seeker(), Action::Create, &target, now),
            Decision::Deny(DenyReason::AlreadyApplied)
        );
    }

    #[test]
    fn test_role_gate_checked_before_open_gate() {
        // An employer applying to a closed job is told about the role,
        // not the job status.
        let now = Utc::now();
        let job = job_view(UserId::new(), JobStatus::Closed);
        let target = Target::NewApplication {
            job: &job,
            already_applied: true,
        };
        assert_eq!(
            engine().decide(&employer(), Action::Create, &target, now),
            Decision::Deny(DenyReason::ForbiddenRole)
        );
    }

    #[test]
    fn test_application_view_applicant_and_employer_only() {
        let now = Utc::now();
        let applicant = seeker();
        let owner = employer();
        let app = app_view(applicant.id().unwrap(), owner.id().unwrap());

        assert!(engine()
            .decide(&applicant, Action::View, &Target::Application(&app), now)
            .is_allowed());
        assert!(engine()
            .decide(&owner, Action::View, &Target::Application(&app), now)
            .is_allowed());
        assert_eq!(
            engine().decide(&employer(), Action::View, &Target::Application(&app), now),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_withdraw_is_applicant_only() {
        let now = Utc::now();
        let applicant = seeker();
        let owner = employer();
        let app = app_view(applicant.id().unwrap(), owner.id().unwrap());

        assert!(engine()
            .decide(&applicant, Action::Withdraw, &Target::Application(&app), now)
            .is_allowed());
        // Even the owning employer cannot withdraw on the applicant's behalf.
        assert_eq!(
            engine().decide(&owner, Action::Withdraw, &Target::Application(&app), now),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_transition_is_owning_employer_only() {
        let now = Utc::now();
        let applicant = seeker();
        let owner = employer();
        let other = employer();
        let app = app_view(applicant.id().unwrap(), owner.id().unwrap());

        assert!(engine()
            .decide(&owner, Action::TransitionStatus, &Target::Application(&app), now)
            .is_allowed());
        assert_eq!(
            engine().decide(&other, Action::TransitionStatus, &Target::Application(&app), now),
            Decision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(
            engine().decide(&applicant, Action::TransitionStatus, &Target::Application(&app), now),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_company_write_requires_membership() {
        let now = Utc::now();
        let member = employer();
        let company = CompanyView {
            id: CompanyId::new(),
            admin_ids: vec![member.id().unwrap()],
        };
        assert!(engine()
            .decide(&member, Action::Update, &Target::Company(&company), now)
            .is_allowed());
        assert_eq!(
            engine().decide(&employer(), Action::Update, &Target::Company(&company), now),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_unsupported_action() {
        let now = Utc::now();
        let job = job_view(UserId::new(), JobStatus::Open);
        assert_eq!(
            engine().decide(&seeker(), Action::Withdraw, &Target::Job(&job), now),
            Decision::Deny(DenyReason::UnsupportedAction)
        );
        assert_eq!(
            engine().decide(&seeker(), Action::TransitionStatus, &Target::Job(&job), now),
            Decision::Deny(DenyReason::UnsupportedAction)
        );
    }

    #[test]
    fn test_visibility_jobs() {
        let e = employer();
        assert_eq!(
            engine().visibility(&Principal::anonymous(), EntityKind::Job),
            VisibilityFilter::AcceptingJobs
        );
        assert_eq!(
            engine().visibility(&seeker(), EntityKind::Job),
            VisibilityFilter::AcceptingJobs
        );
        assert_eq!(
            engine().visibility(&e, EntityKind::Job),
            VisibilityFilter::JobsOwnedBy(e.id().unwrap())
        );
        assert_eq!(
            engine().visibility(&admin(), EntityKind::Job),
            VisibilityFilter::Unrestricted
        );
    }

    #[test]
    fn test_visibility_applications() {
        let s = seeker();
        let e = employer();
        assert_eq!(
            engine().visibility(&s, EntityKind::Application),
            VisibilityFilter::ApplicationsBy(s.id().unwrap())
        );
        assert_eq!(
            engine().visibility(&e, EntityKind::Application),
            VisibilityFilter::ApplicationsManagedBy(e.id().unwrap())
        );
        assert_eq!(
            engine().visibility(&admin(), EntityKind::Application),
            VisibilityFilter::Unrestricted
        );
        assert_eq!(
            engine().visibility(&Principal::anonymous(), EntityKind::Application),
            VisibilityFilter::Hidden
        );
    }
}
