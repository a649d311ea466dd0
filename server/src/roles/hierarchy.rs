//! Role hierarchy decisions.
//!
//! String-facing entry points for callers that hold raw role names (JWT
//! claims, request bodies, persisted membership rows). Every function parses
//! its inputs first and fails with [`RoleError::InvalidRole`] on unknown
//! names, so no comparison ever runs against an unrecognized role.

use std::collections::HashSet;

use serde::Serialize;

use super::board::BoardRole;
use super::error::RoleResult;
use super::system::SystemRole;

/// Reason string reported for allowed decisions.
pub const REASON_OK: &str = "OK";

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    #[must_use]
    pub const fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    /// User-facing reason: `"OK"` when allowed, the denial message otherwise.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Allowed => REASON_OK.to_string(),
            Self::Denied(reason) => reason.to_string(),
        }
    }
}

/// Category of a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Actor rank is not strictly greater than required.
    InsufficientRank,
    /// Owner cannot be assigned through member role changes.
    ForbiddenRoleAssignment,
    /// Owner tried to leave without transferring ownership.
    SelfRemovalForbidden,
}

/// Why an authorization check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Target system role is at or above the actor's rank.
    CannotAssignSystemRole {
        actor: SystemRole,
        target: SystemRole,
    },

    /// Member's current role is at or above the actor's rank.
    CannotModifyMember { actor: BoardRole, target: BoardRole },

    /// Member to remove is at or above the actor's rank.
    CannotRemoveMember { actor: BoardRole, target: BoardRole },

    /// Attempted to hand out the owner role via a member role change.
    OwnerRoleNotAssignable,

    /// The owner tried to leave the board.
    OwnerCannotLeave,
}

impl DenialReason {
    #[must_use]
    pub const fn kind(&self) -> DenialKind {
        match self {
            Self::CannotAssignSystemRole { .. }
            | Self::CannotModifyMember { .. }
            | Self::CannotRemoveMember { .. } => DenialKind::InsufficientRank,
            Self::OwnerRoleNotAssignable => DenialKind::ForbiddenRoleAssignment,
            Self::OwnerCannotLeave => DenialKind::SelfRemovalForbidden,
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CannotAssignSystemRole { actor, target } => write!(
                f,
                "Insufficient rank: {actor} cannot assign the {target} role"
            ),
            Self::CannotModifyMember { actor, target } => write!(
                f,
                "Insufficient rank: {actor} cannot modify member with role {target}"
            ),
            Self::CannotRemoveMember { actor, target } => write!(
                f,
                "Insufficient rank: {actor} cannot remove member with role {target}"
            ),
            Self::OwnerRoleNotAssignable => write!(
                f,
                "Cannot assign Owner role to a member; transfer ownership instead"
            ),
            Self::OwnerCannotLeave => write!(
                f,
                "The board owner cannot leave the board; transfer ownership first"
            ),
        }
    }
}

/// Returns `true` if `role` exactly matches a system role name.
#[must_use]
pub fn is_valid_system_role(role: &str) -> bool {
    role.parse::<SystemRole>().is_ok()
}

/// Returns `true` if `role` matches a board role name, ignoring case.
#[must_use]
pub fn is_valid_board_role(role: &str) -> bool {
    role.parse::<BoardRole>().is_ok()
}

pub fn system_role_rank(role: &str) -> RoleResult<u8> {
    Ok(role.parse::<SystemRole>()?.rank())
}

pub fn board_role_rank(role: &str) -> RoleResult<u8> {
    Ok(role.parse::<BoardRole>()?.rank())
}

pub fn is_system_role_higher_than(role_a: &str, role_b: &str) -> RoleResult<bool> {
    let a: SystemRole = role_a.parse()?;
    let b: SystemRole = role_b.parse()?;
    Ok(a.is_higher_than(b))
}

pub fn is_board_role_higher_than(role_a: &str, role_b: &str) -> RoleResult<bool> {
    let a: BoardRole = role_a.parse()?;
    let b: BoardRole = role_b.parse()?;
    Ok(a.is_higher_than(b))
}

pub fn lower_system_roles(role: &str) -> RoleResult<HashSet<SystemRole>> {
    Ok(role.parse::<SystemRole>()?.lower_roles())
}

pub fn lower_board_roles(role: &str) -> RoleResult<HashSet<BoardRole>> {
    Ok(role.parse::<BoardRole>()?.lower_roles())
}

/// Can an actor holding `current_role` assign `target_role` to someone else?
pub fn can_assign_system_role(current_role: &str, target_role: &str) -> RoleResult<Decision> {
    let current: SystemRole = current_role.parse()?;
    let target: SystemRole = target_role.parse()?;
    Ok(current.can_assign(target))
}

/// Can an actor holding `current_user_role` move a member from
/// `member_current_role` to `member_new_role`?
pub fn can_change_board_member_role(
    current_user_role: &str,
    member_current_role: &str,
    member_new_role: &str,
) -> RoleResult<Decision> {
    let actor: BoardRole = current_user_role.parse()?;
    let current: BoardRole = member_current_role.parse()?;
    let new: BoardRole = member_new_role.parse()?;
    Ok(actor.can_change_member_role(current, new))
}

/// Can an actor holding `current_user_role` remove a member holding `member_role`?
pub fn can_remove_board_member(
    current_user_role: &str,
    member_role: &str,
    is_self_removal: bool,
) -> RoleResult<Decision> {
    let actor: BoardRole = current_user_role.parse()?;
    let member: BoardRole = member_role.parse()?;
    Ok(actor.can_remove_member(member, is_self_removal))
}
