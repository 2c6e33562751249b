use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::error::AppError;

/// Authenticated caller resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub role: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized("Could not validate credentials".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        Ok(AuthUser {
            username: claims.sub,
            role: claims.role,
        })
    }
}

/// An `AuthUser` holding the superadmin capability.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for SuperAdmin
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !is_super_admin(&user.role) {
            warn!(username = %user.username, role = %user.role, "superadmin capability required");
            return Err(AppError::Forbidden("Access denied".into()));
        }
        Ok(SuperAdmin(user))
    }
}

/// Accepts "superadmin" and "super admin" in any case.
fn is_super_admin(role: &str) -> bool {
    let compact: String = role.chars().filter(|c| !c.is_whitespace()).collect();
    compact.eq_ignore_ascii_case("superadmin")
}
