use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::app::auth::{AuthService, RegisterError};
use crate::app::notices::{NoticeError, NoticeService};
use crate::domain::notice::{Notice, NoticeCategory, NoticeFields};
use crate::domain::user::User;
use crate::http::{AppError, AuthUser};
use crate::infra::queue::Job;
use crate::AppState;

const MAX_PASSWORD_LEN: usize = 128;

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), state.paseto_key, state.token_ttl_minutes)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let status = if state.db.ping().await.is_ok() {
        "healthy"
    } else {
        "degraded"
    };
    Json(RootResponse {
        message: "Notice Board Backend API",
        status,
        timestamp: OffsetDateTime::now_utc(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status,
        timestamp: OffsetDateTime::now_utc(),
    })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile_no: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if !payload.email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    if payload.first_name.trim().len() < 3 || payload.last_name.trim().len() < 3 {
        return Err(AppError::bad_request(
            "first and last name must be at least 3 characters",
        ));
    }
    if payload.mobile_no.trim().len() < 10 {
        return Err(AppError::bad_request(
            "mobile number must be at least 10 characters",
        ));
    }
    if payload.password.len() < 8 {
        return Err(AppError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "password must be at most 128 characters",
        ));
    }

    let service = auth_service(&state);
    let user = service
        .register(
            payload.email,
            payload.first_name,
            payload.last_name,
            payload.mobile_no,
            payload.password,
            payload.admin,
        )
        .await
        .map_err(|err| match err.downcast_ref::<RegisterError>() {
            Some(RegisterError::AdminBootstrapClosed) => AppError::forbidden(err.to_string()),
            Some(_) => AppError::bad_request(err.to_string()),
            None => {
                tracing::error!(error = ?err, "failed to register user");
                AppError::internal("failed to register user")
            }
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, admin = user.is_admin, "user registered");
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id: user.id })))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if payload.email.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "password must be at most 128 characters",
        ));
    }

    let service = auth_service(&state);
    let issued = service
        .login(&payload.email, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match issued {
        Some((access_token, expires_at)) => Ok(Json(TokenResponse {
            access_token,
            token_type: "bearer",
            expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Tokens are stateless and carry their own expiry; there is nothing to
/// revoke server-side. Logout means the client discards its token.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "logged out, discard the token client-side".to_string(),
    })
}

pub async fn get_current_user(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

#[derive(Deserialize)]
pub struct MakeAdminQuery {
    pub email: String,
}

pub async fn make_admin(
    State(state): State<AppState>,
    Query(query): Query<MakeAdminQuery>,
) -> Result<Json<User>, AppError> {
    if !state.make_admin_enabled {
        return Err(AppError::forbidden("admin elevation is disabled"));
    }

    let service = auth_service(&state);
    let user = service.elevate(&query.email).await.map_err(|err| {
        tracing::error!(error = ?err, email = %query.email, "failed to elevate user");
        AppError::internal("failed to elevate user")
    })?;

    match user {
        Some(user) => {
            tracing::info!(user_id = %user.id, email = %user.email, "user elevated to admin");
            Ok(Json(user))
        }
        None => Err(AppError::not_found("user not found")),
    }
}

pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    if !auth.user.is_admin {
        return Err(AppError::forbidden("admins only"));
    }

    let service = auth_service(&state);
    let users = service.list_users().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list users");
        AppError::internal("failed to list users")
    })?;

    Ok(Json(users))
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct NoticeRequest {
    pub title: String,
    pub description: String,
    pub category: NoticeCategory,
    pub event_date: Option<Date>,
    pub event_start_time: Option<Time>,
    pub event_end_time: Option<Time>,
}

impl NoticeRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().len() < 3 {
            return Err(AppError::bad_request("title must be at least 3 characters"));
        }
        if self.description.trim().len() < 5 {
            return Err(AppError::bad_request(
                "description must be at least 5 characters",
            ));
        }
        Ok(())
    }

    fn into_fields(self) -> NoticeFields {
        NoticeFields {
            title: self.title,
            description: self.description,
            category: self.category,
            event_date: self.event_date,
            event_start_time: self.event_start_time,
            event_end_time: self.event_end_time,
        }
    }
}

fn map_notice_error(err: anyhow::Error, action: &str) -> AppError {
    match err.downcast_ref::<NoticeError>() {
        Some(NoticeError::Forbidden) => AppError::forbidden(err.to_string()),
        None => {
            tracing::error!(error = ?err, "failed to {} notice", action);
            AppError::internal(format!("failed to {} notice", action))
        }
    }
}

pub async fn create_notice(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NoticeRequest>,
) -> Result<(StatusCode, Json<Notice>), AppError> {
    payload.validate()?;

    let service = NoticeService::new(state.db.clone());
    let notice = service
        .create(&auth.user, payload.into_fields())
        .await
        .map_err(|err| map_notice_error(err, "create"))?;

    // Decoupled follow-ups; neither can fail the create.
    state.jobs.enqueue(Job::Sweep);
    state.jobs.enqueue(Job::Broadcast(notice.clone()));

    tracing::info!(notice_id = %notice.id, by = %auth.user.email, "notice created");
    Ok((StatusCode::CREATED, Json(notice)))
}

pub async fn list_notices(State(state): State<AppState>) -> Result<Json<Vec<Notice>>, AppError> {
    let service = NoticeService::new(state.db.clone());
    let notices = service.list().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list notices");
        AppError::internal("failed to list notices")
    })?;

    Ok(Json(notices))
}

pub async fn get_notice(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Notice>, AppError> {
    let service = NoticeService::new(state.db.clone());
    let notice = service.get(id).await.map_err(|err| {
        tracing::error!(error = ?err, notice_id = %id, "failed to fetch notice");
        AppError::internal("failed to fetch notice")
    })?;

    match notice {
        Some(notice) => Ok(Json(notice)),
        None => Err(AppError::not_found("notice not found")),
    }
}

pub async fn update_notice(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NoticeRequest>,
) -> Result<Json<Notice>, AppError> {
    payload.validate()?;

    let service = NoticeService::new(state.db.clone());
    let notice = service
        .update(&auth.user, id, payload.into_fields())
        .await
        .map_err(|err| map_notice_error(err, "update"))?;

    let Some(notice) = notice else {
        return Err(AppError::not_found("notice not found"));
    };

    // An update may have pushed the event date into the past; sweep async so
    // the applied update is still the response.
    state.jobs.enqueue(Job::Sweep);

    Ok(Json(notice))
}

pub async fn delete_notice(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let service = NoticeService::new(state.db.clone());
    let deleted = service
        .delete(&auth.user, id)
        .await
        .map_err(|err| map_notice_error(err, "delete"))?;

    if deleted {
        tracing::info!(notice_id = %id, by = %auth.user.email, "notice deleted");
        Ok(Json(MessageResponse {
            message: "notice deleted".to_string(),
        }))
    } else {
        Err(AppError::not_found("notice not found"))
    }
}

pub async fn cleanup_expired(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    if !auth.user.is_admin {
        return Err(AppError::forbidden("admins only"));
    }

    state.jobs.enqueue(Job::Sweep);
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "cleanup scheduled".to_string(),
        }),
    ))
}

/// Broadcast a synthetic notice so operators can verify channel wiring
/// without posting a real one.
pub async fn test_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    if !auth.user.is_admin {
        return Err(AppError::forbidden("admins only"));
    }

    let notice = Notice {
        id: Uuid::new_v4(),
        title: "Test notice".to_string(),
        description: "This is a test of the notice board notification system.".to_string(),
        category: NoticeCategory::Announcement,
        post_date: OffsetDateTime::now_utc().date(),
        event_date: None,
        event_start_time: None,
        event_end_time: None,
    };
    state.jobs.enqueue(Job::Broadcast(notice));

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "test notifications scheduled".to_string(),
        }),
    ))
}
