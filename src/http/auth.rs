use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::auth::AuthService;
use crate::domain::user::User;
use crate::http::AppError;
use crate::AppState;

/// The authenticated caller, resolved from the bearer token. Missing header,
/// bad signature, expired token, and an unknown subject all collapse to the
/// same 401.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("could not validate credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("could not validate credentials"))?;

        let service = AuthService::new(
            state.db.clone(),
            state.paseto_key,
            state.token_ttl_minutes,
        );
        let user = service.verify_token(token).await.map_err(|err| {
            tracing::error!(error = ?err, "failed to verify token");
            AppError::internal("failed to verify token")
        })?;

        let user = user.ok_or_else(|| AppError::unauthorized("could not validate credentials"))?;
        Ok(AuthUser { user })
    }
}
