use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        claims::Claims,
        dto::{AuthResponse, DashboardResponse, LoginRequest, PublicUser, RegisterRequest},
        password::{hash_password_async, verify_against_dummy, verify_password_async},
        repo_types::NewUser,
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/users", get(list_users))
}

/// Routes that expect `Claims` in request extensions; mount behind `require_token`.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(mut payload) = payload.map_err(|e| {
        warn!(error = %e, "bad register body");
        ApiError::from(e)
    })?;
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();
    payload.name = payload.name.trim().to_string();

    if payload.username.is_empty() || payload.name.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username, name, email and password are required".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    // early answer only; concurrent registrations are settled by the store's unique constraint
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict);
    }

    let password_hash = hash_password_async(payload.password).await?;

    let user = state
        .users
        .create(NewUser {
            username: payload.username,
            name: payload.name,
            email: payload.email,
            password_hash,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "create user failed");
            ApiError::from(e)
        })?;

    let token = state.jwt.issue(&user).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::Internal(e)
    })?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user: Some(PublicUser::from(user)),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "bad login body");
        ApiError::from(e)
    })?;
    let user = match state.users.find_by_username(payload.uname.trim()).await? {
        Some(u) => u,
        None => {
            verify_against_dummy(payload.password).await;
            warn!("login unknown username");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let ok = verify_password_async(payload.password, user.password_hash.clone())
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "verify_password failed");
            ApiError::Internal(e)
        })?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.jwt.issue(&user).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::Internal(e)
    })?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: None,
    }))
}

#[instrument(skip_all)]
pub async fn dashboard(Extension(claims): Extension<Claims>) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        username: claims.username,
    })
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.users.list_all().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}
