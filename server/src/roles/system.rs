//! Platform-wide system roles.
//!
//! Ordered by rank: `SuperAdmin` (100) > `Admin` (50) > `User` (10).
//! String identity is case-sensitive.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{RoleError, RoleScope};
use super::hierarchy::{Decision, DenialReason};

/// System-level role held by a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemRole {
    /// Platform operator with unrestricted access
    SuperAdmin,
    /// Platform administrator
    Admin,
    /// Regular account
    User,
}

impl SystemRole {
    /// Returns the rank of this role. Higher rank means more privilege.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::SuperAdmin => 100,
            Self::Admin => 50,
            Self::User => 10,
        }
    }

    /// Returns the canonical string form of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SuperAdmin",
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }

    /// Returns all system roles, highest rank first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::SuperAdmin, Self::Admin, Self::User]
    }

    /// Returns `true` if this role strictly outranks `other`.
    ///
    /// ```
    /// use kb_server::roles::SystemRole;
    ///
    /// assert!(SystemRole::SuperAdmin.is_higher_than(SystemRole::Admin));
    /// assert!(!SystemRole::Admin.is_higher_than(SystemRole::Admin));
    /// ```
    #[must_use]
    pub const fn is_higher_than(&self, other: Self) -> bool {
        self.rank() > other.rank()
    }

    /// Returns `true` if this role is `required` or outranks it.
    #[must_use]
    pub const fn at_least(&self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    /// All roles with a strictly lower rank than this one.
    #[must_use]
    pub fn lower_roles(&self) -> HashSet<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|role| self.is_higher_than(*role))
            .collect()
    }

    /// Checks whether a holder of this role may assign `target` to another account.
    ///
    /// Only roles strictly below the actor's own rank are assignable.
    #[must_use]
    pub const fn can_assign(&self, target: Self) -> Decision {
        if self.is_higher_than(target) {
            Decision::Allowed
        } else {
            Decision::Denied(DenialReason::CannotAssignSystemRole {
                actor: *self,
                target,
            })
        }
    }
}

impl PartialOrd for SystemRole {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SystemRole {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for SystemRole {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| RoleError::invalid(RoleScope::System, s))
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
