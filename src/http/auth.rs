use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::auth::AuthService;
use crate::domain::user::Role;
use crate::http::AppError;
use crate::AppState;

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub role: Role,
}

/// Caller with moderation rights. Rejects with 403 for everyone else.
#[derive(Debug, Clone, Copy)]
pub struct Moderator(pub AuthUser);

/// Optional caller identity for endpoints that are public but personalize
/// their response. A missing header means anonymous; a header that is
/// present but does not verify is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

fn verify_bearer(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let auth_header = match parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        Some(value) => value,
        None => return Ok(None),
    };

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_key,
        state.token_ttl_hours,
    );
    let session = service
        .verify_token(token)
        .map_err(|_| AppError::internal("failed to authenticate"))?
        .ok_or_else(|| AppError::unauthorized("invalid token"))?;

    Ok(Some(AuthUser {
        user_id: session.user_id,
        role: session.role,
    }))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        verify_bearer(parts, state)?
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Moderator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.can_moderate() {
            return Err(AppError::forbidden("moderator access required"));
        }
        Ok(Moderator(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(verify_bearer(parts, state)?))
    }
}
