//! Roles scoped to a single board.
//!
//! Ordered by rank: `owner` (100) > `admin` (50) > `member` (20) > `viewer` (10).
//! Parsing is case-insensitive; the canonical form is lower-case.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{RoleError, RoleScope};
use super::hierarchy::{Decision, DenialReason};

/// Role a user holds on a specific board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardRole {
    /// Creator or current owner of the board
    Owner,
    /// Board administrator
    Admin,
    /// Regular collaborator
    Member,
    /// Read-only access
    Viewer,
}

impl BoardRole {
    /// Returns the rank of this role. Higher rank means more privilege.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Owner => 100,
            Self::Admin => 50,
            Self::Member => 20,
            Self::Viewer => 10,
        }
    }

    /// Returns the canonical (lower-case) string form of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    /// Returns all board roles, highest rank first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Owner, Self::Admin, Self::Member, Self::Viewer]
    }

    /// Returns `true` if this role strictly outranks `other`.
    #[must_use]
    pub const fn is_higher_than(&self, other: Self) -> bool {
        self.rank() > other.rank()
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

    /// Returns `true` if this role meets the minimum role required for `action`.
    ///
    /// ```
    /// use kb_server::roles::{BoardAction, BoardRole};
    ///
    /// assert!(BoardRole::Member.can_perform(BoardAction::EditCards));
    /// assert!(!BoardRole::Viewer.can_perform(BoardAction::EditCards));
    /// ```
    #[must_use]
    pub const fn can_perform(&self, action: BoardAction) -> bool {
        self.rank() >= action.min_role().rank()
    }

    /// Checks whether a holder of this role may change a member's role.
    ///
    /// Rules:
    /// 1. The actor must strictly outrank the member's current role
    /// 2. Owner is never assignable here (ownership transfer is separate)
    #[must_use]
    pub const fn can_change_member_role(&self, member_current: Self, member_new: Self) -> Decision {
        if !self.is_higher_than(member_current) {
            return Decision::Denied(DenialReason::CannotModifyMember {
                actor: *self,
                target: member_current,
            });
        }

        if matches!(member_new, Self::Owner) {
            return Decision::Denied(DenialReason::OwnerRoleNotAssignable);
        }

        Decision::Allowed
    }

    /// Checks whether a holder of this role may remove a member from the board.
    ///
    /// Any non-owner may remove themselves. The owner must transfer ownership
    /// before leaving. Removing someone else requires strictly higher rank.
    #[must_use]
    pub const fn can_remove_member(&self, member: Self, is_self_removal: bool) -> Decision {
        if is_self_removal {
            return if matches!(member, Self::Owner) {
                Decision::Denied(DenialReason::OwnerCannotLeave)
            } else {
                Decision::Allowed
            };
        }

        if self.is_higher_than(member) {
            Decision::Allowed
        } else {
            Decision::Denied(DenialReason::CannotRemoveMember {
                actor: *self,
                target: member,
            })
        }
    }
}

impl PartialOrd for BoardRole {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoardRole {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for BoardRole {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RoleError::invalid(RoleScope::Board, s))
    }
}

impl std::fmt::Display for BoardRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations on a board gated by a minimum board role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardAction {
    /// Read board, columns, cards
    View,
    /// Post comments on cards
    Comment,
    /// Create, edit, move cards, checklists, attachments
    EditCards,
    /// Create, rename, reorder, delete columns
    ManageColumns,
    /// Send board invites
    InviteMembers,
    /// Change member roles and remove members
    ManageMembers,
    /// Edit board title, labels, theme
    EditSettings,
    /// Delete the board
    DeleteBoard,
    /// Hand the board over to another member
    TransferOwnership,
}

impl BoardAction {
    /// Minimum role required to perform this action.
    #[must_use]
    pub const fn min_role(&self) -> BoardRole {
        match self {
            Self::View => BoardRole::Viewer,
            Self::Comment | Self::EditCards => BoardRole::Member,
            Self::ManageColumns
            | Self::InviteMembers
            | Self::ManageMembers
            | Self::EditSettings => BoardRole::Admin,
            Self::DeleteBoard | Self::TransferOwnership => BoardRole::Owner,
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::View,
            Self::Comment,
            Self::EditCards,
            Self::ManageColumns,
            Self::InviteMembers,
            Self::ManageMembers,
            Self::EditSettings,
            Self::DeleteBoard,
            Self::TransferOwnership,
        ]
    }
}
