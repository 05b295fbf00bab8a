use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        jwt::JwtKeys,
    },
    error::AppError,
    state::AppState,
    users::model::{Role, User, UserParam},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AppError::BadRequest("password too short".into()));
    }

    let hash = state.hasher.hash(&payload.password)?;

    let now = OffsetDateTime::now_utc();
    let user = User {
        id: Uuid::new_v4(),
        email: payload.email,
        password_hash: hash,
        name: payload.name,
        id_number: payload.id_number,
        faculty: payload.faculty,
        major: payload.major,
        role: Role::Standard,
        photo_key: None,
        created_at: now,
        updated_at: now,
    };

    // Racing registrations on one email are arbitrated by the directory's
    // uniqueness constraint, not checked here first.
    let user = state.users.create(user).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password collapse into the same error so the
    // response never reveals whether the account exists.
    let user = state
        .users
        .find_one(&UserParam::by_email(payload.email.clone()))
        .await
        .map_err(|e| match e {
            AppError::NotFound => {
                warn!(email = %payload.email, "login unknown email");
                AppError::InvalidCredential
            }
            other => other,
        })?;

    state
        .hasher
        .verify(&user.password_hash, &payload.password)
        .map_err(|e| {
            warn!(email = %payload.email, user_id = %user.id, "login invalid password");
            e
        })?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse { token }))
}
