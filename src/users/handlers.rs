use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    CreateUserRequest, MessageResponse, SignupRequest, StaffSummary, UpdateUserRequest,
    UserListItem,
};
use super::services;
use crate::{
    auth::{AuthUser, SuperAdmin},
    error::AppResult,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_user))
        .route("/list-users", get(list_users))
        .route("/update/:id", put(update_user))
        .route("/disable/:id", put(disable_user))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/signup-oos", post(signup_oos))
        .route("/riders", get(list_riders))
        .route("/riders/:id", get(get_rider))
        .route("/cashiers", get(list_cashiers))
}

#[instrument(skip(state, payload, admin), fields(admin = %admin.0.username))]
pub async fn create_user(
    State(state): State<AppState>,
    admin: SuperAdmin,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::create_user(&state, payload).await.map(Json)
}

#[instrument(skip(state, payload))]
pub async fn signup_oos(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::signup_oos(&state, payload).await.map(Json)
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: SuperAdmin,
) -> AppResult<Json<Vec<UserListItem>>> {
    services::list_users(&state).await.map(Json)
}

#[instrument(skip(state, payload, _admin))]
pub async fn update_user(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::update_user(&state, id, payload).await.map(Json)
}

#[instrument(skip(state, _admin))]
pub async fn disable_user(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    services::disable_user(&state, id).await.map(Json)
}

#[instrument(skip(state, _user))]
pub async fn list_riders(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<StaffSummary>>> {
    services::list_riders(&state).await.map(Json)
}

#[instrument(skip(state, _user))]
pub async fn get_rider(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<StaffSummary>> {
    services::get_rider(&state, id).await.map(Json)
}

#[instrument(skip(state, _user))]
pub async fn list_cashiers(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<StaffSummary>>> {
    services::list_cashiers(&state).await.map(Json)
}
