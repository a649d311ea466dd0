//! Authentication Middleware

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::roles::SystemRole;

use super::error::{AuthError, AuthResult};
use super::jwt::validate_access_token;

/// Authenticated user injected into request extensions.
///
/// Identity and role come straight from the validated token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// User ID.
    pub id: Uuid,
    /// System role.
    pub role: SystemRole,
}

/// Middleware that authenticates when credentials are present.
///
/// - No `Authorization` header: the request continues anonymously.
/// - Valid bearer token: `AuthUser` is injected into request extensions.
/// - Anything else: `401 Unauthorized`.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/api/authz/...", post(handler))
///     .layer(axum::middleware::from_fn_with_state(state, optional_auth))
/// ```
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Some(auth_user) = authenticate(request.headers(), &state.config.jwt_secret)? {
        request.extensions_mut().insert(auth_user);
    }

    Ok(next.run(request).await)
}

/// Resolves the bearer token in `headers`, if any.
fn authenticate(headers: &HeaderMap, secret: &str) -> AuthResult<Option<AuthUser>> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidAuthHeader)?;

    let claims = validate_access_token(token, secret)?;

    Ok(Some(AuthUser {
        id: claims.user_id()?,
        role: claims.role,
    }))
}

/// Extractor for authenticated user in handlers.
///
/// ```ignore
/// async fn handler(auth_user: AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", auth_user.id)
/// }
/// ```
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .copied()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;

    const SECRET: &str = "test-secret";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        headers
    }

    #[test]
    fn test_anonymous() {
        assert_eq!(authenticate(&HeaderMap::new(), SECRET).unwrap(), None);
    }

    #[test]
    fn test_valid_bearer() {
        let id = Uuid::new_v4();
        let token = generate_access_token(id, SystemRole::SuperAdmin, SECRET, 900).unwrap();

        let user = authenticate(&bearer(&token), SECRET).unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, SystemRole::SuperAdmin);
    }

    #[test]
    fn test_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());

        assert!(matches!(
            authenticate(&headers, SECRET),
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    #[test]
    fn test_bad_token() {
        assert!(matches!(
            authenticate(&bearer("garbage"), SECRET),
            Err(AuthError::InvalidToken)
        ));
    }
}
