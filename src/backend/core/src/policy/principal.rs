//! The actor on whose behalf a request runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Role, User, UserId};

/// The authenticated (or anonymous) actor making a request.
///
/// Immutable per request. Built once by the auth layer and passed
/// explicitly into every policy evaluation — there is no global
/// "current user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// No valid credentials were presented.
    Anonymous,
    /// A logged-in user with a fixed role.
    Authenticated { id: UserId, role: Role },
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    pub fn authenticated(id: UserId, role: Role) -> Self {
        Self::Authenticated { id, role }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn id(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { id, .. } => Some(*id),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { role, .. } => Some(*role),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }

    /// Whether this principal is the given user.
    pub fn is_user(&self, user_id: UserId) -> bool {
        self.id() == Some(user_id)
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::Authenticated {
            id: user.id,
            role: user.role,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated { id, role } => write!(f, "{} ({})", id, role),
        }
    }
}
