//! Application lifecycle control.
//!
//! Invoked after the policy engine has already allowed the action; this
//! layer only validates that the requested status change is legal.
//!
//! Two rule sets exist. `Lax` mirrors the observed production behavior:
//! the owning employer may move an application between any two
//! non-withdrawn statuses at any time. `Strict` enforces the pipeline
//! `applied → under_review → shortlisted/rejected → accepted`. Lax is the
//! default; strict is a config switch, not a guess at intent.
//!
//! One rule is unconditional in both modes: `withdrawn` is terminal.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{Application, ApplicationStatus};

/// Errors from lifecycle validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("application has been withdrawn and can no longer change status")]
    AlreadyWithdrawn,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Which transition graph applies to employer-driven status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRules {
    /// Any non-withdrawn status to any non-withdrawn status.
    #[default]
    Lax,
    /// applied → under_review → shortlisted/rejected, shortlisted →
    /// accepted/rejected. Accepted and rejected are dead ends.
    Strict,
}

/// Enforces valid application status transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleController {
    rules: TransitionRules,
}

impl LifecycleController {
    pub fn new(rules: TransitionRules) -> Self {
        Self { rules }
    }

    pub fn lax() -> Self {
        Self::new(TransitionRules::Lax)
    }

    pub fn strict() -> Self {
        Self::new(TransitionRules::Strict)
    }

    pub fn rules(&self) -> TransitionRules {
        self.rules
    }

    /// Validate an employer-driven transition without applying it.
    pub fn validate(
        &self,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<(), LifecycleError> {
        if from.is_terminal() {
            return Err(LifecycleError::AlreadyWithdrawn);
        }
        // Withdrawal is a separate action reserved for the applicant;
        // employers cannot route around it through a status update.
        if to == ApplicationStatus::Withdrawn {
            return Err(LifecycleError::InvalidTransition { from, to });
        }
        match self.rules {
            TransitionRules::Lax => Ok(()),
            TransitionRules::Strict => {
                if Self::strict_allows(from, to) {
                    Ok(())
                } else {
                    Err(LifecycleError::InvalidTransition { from, to })
                }
            }
        }
    }

    fn strict_allows(from: ApplicationStatus, to: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (from, to),
            (Applied, UnderReview)
                | (Applied, Shortlisted)
                | (Applied, Rejected)
                | (UnderReview, Shortlisted)
                | (UnderReview, Rejected)
                | (Shortlisted, Accepted)
                | (Shortlisted, Rejected)
        )
    }

    /// Apply an employer-driven transition.
    pub fn transition(
        &self,
        application: &mut Application,
        to: ApplicationStatus,
    ) -> Result<(), LifecycleError> {
        self.validate(application.status, to)?;
        debug!(
            application_id = %application.id,
            from = %application.status,
            to = %to,
            "Application status transition"
        );
        application.status = to;
        Ok(())
    }

    /// Withdraw an application. Forces `withdrawn` regardless of the
    /// current status; fails only if already withdrawn.
    pub fn withdraw(&self, application: &mut Application) -> Result<(), LifecycleError> {
        if application.status.is_terminal() {
            return Err(LifecycleError::AlreadyWithdrawn);
        }
        debug!(
            application_id = %application.id,
            from = %application.status,
            "Application withdrawn"
        );
        application.status = ApplicationStatus::Withdrawn;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApplicationId, JobId, UserId};
    use chrono::Utc;

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: ApplicationId::new(),
            job_id: JobId::new(),
            applicant_id: UserId::new(),
            status,
            cover_letter: None,
            applied_at: Utc::now(),
        }
    }

    const NON_WITHDRAWN: [ApplicationStatus; 5] = [
        ApplicationStatus::Applied,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Accepted,
    ];

    #[test]
    fn test_lax_allows_any_non_withdrawn_pair() {
        let controller = LifecycleController::lax();
        for from in NON_WITHDRAWN {
            for to in NON_WITHDRAWN {
                assert_eq!(controller.validate(from, to), Ok(()), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_withdrawn_is_terminal() {
        let controller = LifecycleController::lax();
        for to in NON_WITHDRAWN {
            assert_eq!(
                controller.validate(ApplicationStatus::Withdrawn, to),
                Err(LifecycleError::AlreadyWithdrawn)
            );
        }
    }

    #[test]
    fn test_employer_cannot_set_withdrawn() {
        let controller = LifecycleController::lax();
        assert_eq!(
            controller.validate(ApplicationStatus::Applied, ApplicationStatus::Withdrawn),
            Err(LifecycleError::InvalidTransition {
                from: ApplicationStatus::Applied,
                to: ApplicationStatus::Withdrawn,
            })
        );
    }

    #[test]
    fn test_strict_pipeline() {
        let controller = LifecycleController::strict();
        assert!(controller
            .validate(ApplicationStatus::Applied, ApplicationStatus::UnderReview)
            .is_ok());
        assert!(controller
            .validate(ApplicationStatus::UnderReview, ApplicationStatus::Shortlisted)
            .is_ok());
        assert!(controller
            .validate(ApplicationStatus::Shortlisted, ApplicationStatus::Accepted)
            .is_ok());
        assert!(controller
            .validate(ApplicationStatus::Applied, ApplicationStatus::Accepted)
            .is_err());
        assert!(controller
            .validate(ApplicationStatus::Rejected, ApplicationStatus::UnderReview)
            .is_err());
        assert!(controller
            .validate(ApplicationStatus::Accepted, ApplicationStatus::Rejected)
            .is_err());
    }

    #[test]
    fn test_transition_mutates_status() {
        let controller = LifecycleController::lax();
        let mut app = application(ApplicationStatus::Applied);
        controller
            .transition(&mut app, ApplicationStatus::Shortlisted)
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Shortlisted);
    }

    #[test]
    fn test_withdraw_from_any_status() {
        let controller = LifecycleController::lax();
        for from in NON_WITHDRAWN {
            let mut app = application(from);
            controller.withdraw(&mut app).unwrap();
            assert_eq!(app.status, ApplicationStatus::Withdrawn);
        }
    }

    #[test]
    fn test_withdraw_twice_fails() {
        let controller = LifecycleController::lax();
        let mut app = application(ApplicationStatus::Applied);
        controller.withdraw(&mut app).unwrap();
        assert_eq!(
            controller.withdraw(&mut app),
            Err(LifecycleError::AlreadyWithdrawn)
        );
    }

    #[test]
    fn test_transition_after_withdraw_fails() {
        let controller = LifecycleController::lax();
        let mut app = application(ApplicationStatus::Withdrawn);
        assert_eq!(
            controller.transition(&mut app, ApplicationStatus::Accepted),
            Err(LifecycleError::AlreadyWithdrawn)
        );
        assert_eq!(app.status, ApplicationStatus::Withdrawn);
    }
}
