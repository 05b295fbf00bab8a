use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::jwt::CurrentUser,
    error::AppError,
    photos,
    state::AppState,
    users::model::{UserParam, UserWithRentals},
};

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub photo_key: String,
}

/// The current user plus rental history, resolved from the bearer token.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserWithRentals>, AppError> {
    let with_rentals = state
        .users
        .find_one_with_rentals(&UserParam::by_id(user.0.id))
        .await?;
    Ok(Json(with_rentals))
}

#[instrument(skip(state, user, headers, body), fields(user_id = %user.0.id))]
pub async fn put_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PhotoResponse>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("empty photo body".into()));
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let photo_key = photos::services::replace_photo(&state, &user.0, body, content_type).await?;
    Ok(Json(PhotoResponse { photo_key }))
}
