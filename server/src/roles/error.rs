//! Role parsing errors.

use thiserror::Error;

/// Which hierarchy a role string was parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleScope {
    /// Platform-wide roles.
    System,
    /// Roles scoped to a single board.
    Board,
}

impl RoleScope {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Board => "board",
        }
    }
}

impl std::fmt::Display for RoleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when a role string is not part of the enumerated set.
///
/// Unknown roles indicate a programming or configuration error and are never
/// coerced into a negative authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    /// The string does not name a role in the given hierarchy.
    #[error("Invalid {scope} role: '{value}'")]
    InvalidRole { scope: RoleScope, value: String },
}

impl RoleError {
    pub(crate) fn invalid(scope: RoleScope, value: &str) -> Self {
        Self::InvalidRole {
            scope,
            value: value.to_string(),
        }
    }
}

/// Result type for role lookups.
pub type RoleResult<T> = Result<T, RoleError>;
