//! Authorization Decision API
//!
//! Stateless endpoints over the role hierarchies. Callers pass role strings
//! and get back `{ allowed, reason }`; unknown role strings are a 400.
//! System role assignment is decided for the authenticated caller's own role.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::AuthUser;
use crate::roles::{self, Decision, RoleError};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AssignSystemRoleRequest {
    pub target_role: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeMemberRoleRequest {
    pub actor_role: String,
    pub member_current_role: String,
    pub member_new_role: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberRequest {
    pub actor_role: String,
    pub member_role: String,
    #[serde(default)]
    pub is_self_removal: bool,
}

/// Outcome of an authorization check.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub allowed: bool,
    pub reason: String,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        Self {
            allowed: decision.is_allowed(),
            reason: decision.reason(),
        }
    }
}

/// Roles strictly below `role`, highest rank first.
#[derive(Debug, Serialize)]
pub struct LowerRolesResponse {
    pub role: String,
    pub rank: u8,
    pub lower: Vec<String>,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Role(#[from] RoleError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            Self::Role(RoleError::InvalidRole { .. }) => (StatusCode::BAD_REQUEST, "invalid_role"),
        };
        (
            status,
            Json(serde_json::json!({ "error": code, "message": self.to_string() })),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/authz/system-roles/assign
///
/// The actor's role comes from the access token; anonymous callers get 401.
pub async fn assign_system_role(
    auth_user: AuthUser,
    Json(body): Json<AssignSystemRoleRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let decision = roles::can_assign_system_role(auth_user.role.as_str(), &body.target_role)?;
    debug!(
        user_id = %auth_user.id,
        current = %auth_user.role,
        target = %body.target_role,
        allowed = decision.is_allowed(),
        "System role assignment check"
    );
    Ok(Json(decision.into()))
}

/// POST /api/authz/board-members/role
pub async fn change_member_role(
    Json(body): Json<ChangeMemberRoleRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let decision = roles::can_change_board_member_role(
        &body.actor_role,
        &body.member_current_role,
        &body.member_new_role,
    )?;
    debug!(
        actor = %body.actor_role,
        from = %body.member_current_role,
        to = %body.member_new_role,
        allowed = decision.is_allowed(),
        "Board member role change check"
    );
    Ok(Json(decision.into()))
}

/// POST /api/authz/board-members/remove
pub async fn remove_member(
    Json(body): Json<RemoveMemberRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let decision =
        roles::can_remove_board_member(&body.actor_role, &body.member_role, body.is_self_removal)?;
    debug!(
        actor = %body.actor_role,
        member = %body.member_role,
        is_self_removal = body.is_self_removal,
        allowed = decision.is_allowed(),
        "Board member removal check"
    );
    Ok(Json(decision.into()))
}

/// GET /api/authz/board-roles/{role}/lower
pub async fn lower_board_roles(
    Path(role): Path<String>,
) -> Result<Json<LowerRolesResponse>, ApiError> {
    let rank = roles::board_role_rank(&role)?;
    let mut lower: Vec<_> = roles::lower_board_roles(&role)?.into_iter().collect();
    lower.sort_by(|a, b| b.cmp(a));

    Ok(Json(LowerRolesResponse {
        role: role.to_lowercase(),
        rank,
        lower: lower.iter().map(|r| r.as_str().to_string()).collect(),
    }))
}

/// GET /api/authz/system-roles/{role}/lower
pub async fn lower_system_roles(
    Path(role): Path<String>,
) -> Result<Json<LowerRolesResponse>, ApiError> {
    let rank = roles::system_role_rank(&role)?;
    let mut lower: Vec<_> = roles::lower_system_roles(&role)?.into_iter().collect();
    lower.sort_by(|a, b| b.cmp(a));

    Ok(Json(LowerRolesResponse {
        role,
        rank,
        lower: lower.iter().map(|r| r.as_str().to_string()).collect(),
    }))
}
