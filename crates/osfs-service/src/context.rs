//! Request context carrying the acting user and their standing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use osfs_core::types::UserId;

/// How much authority the caller carries beyond the checkout lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// A regular contributor.
    User,
    /// An administrator allowed to override another user's checkout.
    Admin,
    /// The engine itself (cleanup sweeps, invariant maintenance).
    System,
}

/// Who is performing an operation.
///
/// Built by the request layer (or by background jobs) and passed into
/// every mutating service method so audit entries and lock checks know
/// the actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The acting user, absent for system-initiated work.
    pub user_id: Option<UserId>,
    /// Authority of the actor.
    pub role: ActorRole,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// A regular user.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            role: ActorRole::User,
            request_time: Utc::now(),
        }
    }

    /// An administrator.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            role: ActorRole::Admin,
            request_time: Utc::now(),
        }
    }

    /// The engine acting on its own behalf.
    pub fn system() -> Self {
        Self {
            user_id: None,
            role: ActorRole::System,
            request_time: Utc::now(),
        }
    }

    /// Whether the actor may release someone else's checkout.
    pub fn can_override_checkout(&self) -> bool {
        matches!(self.role, ActorRole::Admin | ActorRole::System)
    }

    /// Whether this is `user`.
    pub fn is(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }
}
