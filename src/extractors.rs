use axum::extract::FromRequestParts;
use axum::http::{header, HeaderMap};
use axum::http::request::Parts;
use rusqlite::{params, OptionalExtension};

use crate::db::models::Role;
use crate::error::AppError;
use crate::state::AppState;
use crate::voting::{AuthContext, UserId};

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn can_moderate(&self) -> bool {
        self.role.can_moderate()
    }

    pub fn auth_context(&self) -> AuthContext {
        AuthContext::SignedIn(UserId::new(self.id.clone()))
    }
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;

        let conn = state.db.get()?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT u.id, u.username, u.role FROM sessions s \
                 JOIN users u ON u.id = s.user_id \
                 WHERE s.token = ?1 AND s.expires_at > datetime('now')",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (id, username, role) = row.ok_or(AppError::Unauthorized)?;
        let role = role
            .parse::<Role>()
            .map_err(|e| AppError::Internal(format!("Bad user row: {}", e)))?;

        Ok(CurrentUser { id, username, role })
    }
}

/// Optional user extractor. Yields None instead of a 401 for anonymous requests.
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn auth_context(&self) -> AuthContext {
        self.0
            .as_ref()
            .map_or(AuthContext::Anonymous, CurrentUser::auth_context)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// Moderation surface: admins and root.
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.can_moderate() {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

/// Root dashboard: root admins only.
pub struct RootUser(pub CurrentUser);

impl FromRequestParts<AppState> for RootUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.is_root() {
            return Err(AppError::Forbidden);
        }
        Ok(RootUser(user))
    }
}

pub fn extract_session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
