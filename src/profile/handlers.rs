use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{ProfileResponse, UpdateProfileRequest, UploadPhotoResponse};
use super::services::{self, UploadItem};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    users::dto::MessageResponse,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/update", put(update_profile))
        .route("/profile/upload-photo", post(upload_photo))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    services::get_profile(&state, &user.username).await.map(Json)
}

#[instrument(skip(state, user, payload), fields(username = %user.username))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::update_profile(&state, &user.username, payload)
        .await
        .map(Json)
}

/// POST /users/profile/upload-photo (multipart, field `file`)
#[instrument(skip(state, user, mp), fields(username = %user.username))]
pub async fn upload_photo(
    State(state): State<AppState>,
    user: AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<UploadPhotoResponse>> {
    let mut upload = None;
    loop {
        let field = match mp.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart body");
                return Err(AppError::validation("Invalid multipart body"));
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let body = field.bytes().await.map_err(|e| {
            warn!(error = %e, "failed to read uploaded file");
            AppError::validation("Invalid multipart body")
        })?;
        upload = Some(UploadItem { file_name, body });
        break;
    }
    let item = upload.ok_or_else(|| AppError::validation("file is required"))?;

    services::upload_profile_photo(&state, &user.username, item)
        .await
        .map(Json)
}
