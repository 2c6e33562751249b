use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::dto::{ManagerPinVerifyResponse, PinVerificationRequest};
use super::services;
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn pin_routes() -> Router<AppState> {
    Router::new().route("/verify-pin", post(verify_pin))
}

#[instrument(skip(state, payload, user), fields(caller = %user.username))]
pub async fn verify_pin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PinVerificationRequest>,
) -> AppResult<Json<ManagerPinVerifyResponse>> {
    let manager_username =
        services::verify_manager_pin(&state, &payload.pin, &user.username).await?;
    Ok(Json(ManagerPinVerifyResponse { manager_username }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::app::build_app;
    use crate::auth::jwt::testing::bearer;
    use crate::test_support::send;
    use crate::users::services::tests::{create_manager, state};

    #[tokio::test]
    async fn verify_pin_over_http() {
        let (st, _) = state();
        create_manager(&st, "boss", "7070").await;
        let auth = bearer(&st.config.jwt, "cashier1", "cashier");

        let (status, body) = send(
            build_app(st.clone()),
            "POST",
            "/users/verify-pin",
            Some(auth.clone()),
            Some(json!({ "pin": "7070" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "managerUsername": "boss" }));

        let (status, body) = send(
            build_app(st.clone()),
            "POST",
            "/users/verify-pin",
            Some(auth),
            Some(json!({ "pin": "0000" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid PIN.");

        let (status, _) = send(
            build_app(st),
            "POST",
            "/users/verify-pin",
            None,
            Some(json!({ "pin": "7070" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
