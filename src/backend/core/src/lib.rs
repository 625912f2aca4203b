//! # Jobboard Core
//!
//! Backend for a job board: employers post jobs, job seekers apply, and
//! a central policy engine decides who may see and do what.
//!
//! ## Architecture
//!
//! - **Policy Engine**: Pure, synchronous authorization decisions over
//!   principals, actions, and resource views
//! - **Lifecycle Controller**: Validates application status transitions
//! - **Service**: Orchestrates load, decide, mutate, and notify per request
//! - **Store**: Persistence seam with in-memory and PostgreSQL backends
//! - **Notifications**: Best-effort delivery of application events
//! - **API**: Axum REST surface with JWT bearer authentication

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod policy;
pub mod service;
pub mod store;
pub mod telemetry;

pub use error::{BoardError, ErrorCode, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{BoardError, ErrorCode, Result};
    pub use crate::lifecycle::{LifecycleController, LifecycleError, TransitionRules};
    pub use crate::model::{
        Application, ApplicationId, ApplicationStatus, Company, CompanyId, Job, JobId, JobStatus,
        Notification, NotificationKind, Role, User, UserId,
    };
    pub use crate::policy::{
        Action, Decision, DenyReason, EntityKind, PolicyEngine, Principal, VisibilityFilter,
    };
    pub use crate::service::BoardService;
    pub use crate::store::{MemoryStore, PgStore, Store};
}
