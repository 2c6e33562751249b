use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::dto::{
    CreateUserRequest, MessageResponse, SignupRequest, StaffSummary, UpdateUserRequest,
    UserListItem,
};
use super::model::{is_pos_manager, NewUser, Role, System, UserChanges};
use super::repo::Conflict;
use crate::auth::password::{hash_password, is_long_enough, is_valid_pin};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const PIN_REQUIRED: &str = "A 4-digit PIN is required for POS Managers.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed value, or a validation error when nothing is left.
pub(crate) fn required(value: &str, msg: &str) -> AppResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::validation(msg));
    }
    Ok(v.to_string())
}

/// Trimmed value, with blank collapsing to NULL.
pub(crate) fn nullable(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

pub(crate) fn checked_email(value: &str, empty_msg: &str) -> AppResult<String> {
    let email = required(value, empty_msg)?;
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    Ok(email)
}

pub(crate) async fn ensure_email_free(
    st: &AppState,
    email: &str,
    exclude: Option<i64>,
    msg: &str,
) -> AppResult<()> {
    if st.users.email_taken(email, exclude).await? {
        warn!(%email, "email already in use");
        return Err(AppError::validation(msg));
    }
    Ok(())
}

async fn ensure_username_free(
    st: &AppState,
    username: &str,
    exclude: Option<i64>,
) -> AppResult<()> {
    if st.users.username_taken(username, exclude).await? {
        warn!(%username, "username already in use");
        return Err(AppError::validation(username_taken_msg(username)));
    }
    Ok(())
}

fn username_taken_msg(username: &str) -> String {
    format!("Username '{username}' is already taken.")
}

/// A write that lost a uniqueness race gets the same message the
/// pre-check would have given; anything else stays internal.
pub(crate) fn on_conflict(err: anyhow::Error, username_msg: &str, email_msg: &str) -> AppError {
    match err.downcast_ref::<Conflict>() {
        Some(conflict) => {
            warn!(%conflict, "uniqueness conflict at write time");
            AppError::validation(match conflict {
                Conflict::Username => username_msg,
                Conflict::Email => email_msg,
            })
        }
        None => AppError::Internal(err),
    }
}

pub async fn create_user(st: &AppState, req: CreateUserRequest) -> AppResult<MessageResponse> {
    let role: Role = req
        .user_role
        .parse()
        .map_err(|_| AppError::validation("Invalid role"))?;
    let system: System = req
        .system
        .parse()
        .map_err(|_| AppError::validation("Invalid system"))?;

    if !is_long_enough(&req.password) {
        return Err(AppError::validation(
            "Password is required and must be at least 12 characters",
        ));
    }
    let username = required(&req.username, "Username is required")?;
    let email = checked_email(&req.email, "Email is required")?;
    let first_name = required(&req.first_name, "First name is required")?;
    let last_name = required(&req.last_name, "Last name is required")?;

    let pin_hash = if is_pos_manager(role, system) {
        match req.pin.as_deref() {
            Some(pin) if is_valid_pin(pin) => Some(hash_password(pin)?),
            _ => return Err(AppError::validation(PIN_REQUIRED)),
        }
    } else {
        None
    };

    ensure_email_free(st, &email, None, "Email is already used").await?;
    ensure_username_free(st, &username, None).await?;

    let username_msg = username_taken_msg(&username);
    let password_hash = hash_password(&req.password)?;
    let id = st
        .users
        .insert(NewUser {
            username,
            email,
            password_hash,
            pin_hash,
            role,
            system,
            first_name,
            middle_name: req.middle_name.as_deref().and_then(nullable),
            last_name,
            suffix: req.suffix.as_deref().and_then(nullable),
            phone_number: req.phone_number.as_deref().and_then(nullable),
        })
        .await
        .map_err(|e| on_conflict(e, &username_msg, "Email is already used"))?;

    info!(user_id = id, %role, %system, "user created");
    Ok(MessageResponse::new(format!(
        "{} created successfully!",
        role.capitalized()
    )))
}

/// Public sign-up for the online ordering system.
pub async fn signup_oos(st: &AppState, req: SignupRequest) -> AppResult<MessageResponse> {
    let username = required(&req.username, "Username and Password are required")?;
    if req.password.trim().is_empty() {
        return Err(AppError::validation("Username and Password are required"));
    }
    if !is_long_enough(&req.password) {
        return Err(AppError::validation(
            "Password must be at least 12 characters.",
        ));
    }
    let email = checked_email(&req.email, "Email is required")?;
    let first_name = required(&req.first_name, "First name is required")?;
    let last_name = required(&req.last_name, "Last name is required")?;
    let phone_number = required(&req.phone_number, "Phone number is required")?;

    if st.users.username_taken(&username, None).await? {
        return Err(AppError::validation("Username is already taken"));
    }
    ensure_email_free(st, &email, None, "Email is already used").await?;

    let password_hash = hash_password(&req.password)?;
    let id = st
        .users
        .insert(NewUser {
            username,
            email,
            password_hash,
            pin_hash: None,
            role: Role::User,
            system: System::Oos,
            first_name,
            middle_name: req.middle_name.as_deref().and_then(nullable),
            last_name,
            suffix: req.suffix.as_deref().and_then(nullable),
            phone_number: Some(phone_number),
        })
        .await
        .map_err(|e| on_conflict(e, "Username is already taken", "Email is already used"))?;

    info!(user_id = id, "oos user signed up");
    Ok(MessageResponse::new("OOS user account created successfully!"))
}

pub async fn list_users(st: &AppState) -> AppResult<Vec<UserListItem>> {
    let users = st.users.list_all().await?;
    Ok(users.into_iter().map(UserListItem::from).collect())
}

pub async fn update_user(
    st: &AppState,
    user_id: i64,
    req: UpdateUserRequest,
) -> AppResult<MessageResponse> {
    let current = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let mut changes = UserChanges::default();

    if let Some(username) = req.username.as_deref() {
        let username = required(username, "Username cannot be empty.")?;
        ensure_username_free(st, &username, Some(user_id)).await?;
        changes.username = Some(username);
    }

    if let Some(email) = req.email.as_deref() {
        let email = checked_email(email, "Email cannot be empty.")?;
        ensure_email_free(st, &email, Some(user_id), "Email is already used by another user")
            .await?;
        changes.email = Some(email);
    }

    if let Some(phone) = req.phone_number.as_deref() {
        changes.phone_number = Some(nullable(phone));
    }

    if let Some(password) = req.password.as_deref().filter(|p| !p.trim().is_empty()) {
        if !is_long_enough(password) {
            return Err(AppError::validation(
                "Password must be at least 12 characters.",
            ));
        }
        changes.password_hash = Some(hash_password(password)?);
    }

    if let Some(first) = req.first_name.as_deref() {
        changes.first_name = Some(required(first, "First name cannot be empty.")?);
    }
    if let Some(middle) = req.middle_name.as_deref() {
        changes.middle_name = Some(nullable(middle));
    }
    if let Some(last) = req.last_name.as_deref() {
        changes.last_name = Some(required(last, "Last name cannot be empty.")?);
    }
    if let Some(suffix) = req.suffix.as_deref() {
        changes.suffix = Some(nullable(suffix));
    }

    if let Some(role) = req.user_role.as_deref() {
        changes.role = Some(role.parse().map_err(|_| AppError::validation("Invalid role"))?);
    }
    if let Some(system) = req.system.as_deref() {
        changes.system = Some(
            system
                .parse()
                .map_err(|_| AppError::validation("Invalid system"))?,
        );
    }

    let was_pos_manager = is_pos_manager(current.role, current.system);
    let is_now_pos_manager = is_pos_manager(
        changes.role.unwrap_or(current.role),
        changes.system.unwrap_or(current.system),
    );
    let pin = req.pin.as_deref().filter(|p| !p.trim().is_empty());

    if is_now_pos_manager {
        match pin {
            Some(pin) if is_valid_pin(pin) => changes.pin_hash = Some(Some(hash_password(pin)?)),
            Some(_) => return Err(AppError::validation(PIN_REQUIRED)),
            None if !was_pos_manager => return Err(AppError::validation(PIN_REQUIRED)),
            None => {}
        }
    } else if was_pos_manager {
        changes.pin_hash = Some(None);
    }

    if changes.is_empty() {
        return Ok(MessageResponse::new("No fields to update"));
    }

    let username_msg =
        username_taken_msg(changes.username.as_deref().unwrap_or(&current.username));
    st.users
        .update(user_id, &changes)
        .await
        .map_err(|e| {
            on_conflict(e, &username_msg, "Email is already used by another user")
        })?;
    info!(user_id, "user updated");
    Ok(MessageResponse::new("User updated successfully"))
}

/// Soft delete. A second call on the same id is a NotFound, not a no-op.
pub async fn disable_user(st: &AppState, user_id: i64) -> AppResult<MessageResponse> {
    if !st.users.disable(user_id).await? {
        return Err(AppError::not_found("User not found or already disabled."));
    }
    info!(user_id, "user disabled");
    Ok(MessageResponse::new("User disabled successfully"))
}

pub async fn list_riders(st: &AppState) -> AppResult<Vec<StaffSummary>> {
    let riders = st.users.list_active_by_role(Role::Rider, None, false).await?;
    Ok(riders.into_iter().map(StaffSummary::from).collect())
}

pub async fn get_rider(st: &AppState, rider_id: i64) -> AppResult<StaffSummary> {
    st.users
        .find_by_id(rider_id)
        .await?
        .filter(|u| u.role == Role::Rider && !u.is_disabled)
        .map(StaffSummary::from)
        .ok_or_else(|| AppError::not_found("Rider not found"))
}

pub async fn list_cashiers(st: &AppState) -> AppResult<Vec<StaffSummary>> {
    let cashiers = st
        .users
        .list_active_by_role(Role::Cashier, Some(System::Pos), true)
        .await?;
    Ok(cashiers.into_iter().map(StaffSummary::from).collect())
}
