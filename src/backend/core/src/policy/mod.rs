//! Role-based access control for the job board.
//!
//! This module centralizes every permission rule that was historically
//! scattered across per-endpoint checks:
//!
//! - **Principal**: the authenticated or anonymous actor, threaded
//!   explicitly into every evaluation (no ambient request state)
//! - **Resource views**: read-only projections of Job, Application, and
//!   Company carrying exactly the fields the rules need
//! - **Policy Engine**: pure `decide(principal, action, target)` with
//!   first-match-wins rules, plus `visibility(principal, kind)` producing
//!   a declarative collection predicate
//!
//! The engine performs no I/O and never touches a clock; callers load the
//! target resource and pass `now` in.

pub mod engine;
pub mod principal;
pub mod resource;
pub mod visibility;

pub use engine::{Action, Decision, DenyReason, PolicyEngine};
pub use principal::Principal;
pub use resource::{ApplicationView, CompanyView, JobView, Target};
pub use visibility::{EntityKind, VisibilityFilter};
