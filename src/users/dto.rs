use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::model::{Role, System, User};

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub username: String,
    pub password: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub user_role: String,
    pub system: String,
    pub pin: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub username: String,
    pub password: String,
    pub email: String,
    pub phone_number: String,
}

/// Every field optional; absent means "leave unchanged".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub user_role: Option<String>,
    pub system: Option<String>,
    pub pin: Option<String>,
}

/// Admin listing entry. Secrets are never part of it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListItem {
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub user_role: Role,
    pub system: System,
    pub phone_number: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_disabled: bool,
}

impl From<User> for UserListItem {
    fn from(u: User) -> Self {
        Self {
            full_name: u.full_name(),
            user_id: u.id,
            username: u.username,
            email: u.email,
            user_role: u.role,
            system: u.system,
            phone_number: u.phone_number,
            first_name: u.first_name,
            middle_name: u.middle_name,
            last_name: u.last_name,
            suffix: u.suffix,
            created_at: u.created_at,
            is_disabled: u.is_disabled,
        }
    }
}

/// Rider or cashier picker entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSummary {
    pub user_id: i64,
    pub full_name: String,
    pub username: String,
    pub phone: Option<String>,
}

impl From<User> for StaffSummary {
    fn from(u: User) -> Self {
        Self {
            full_name: u.short_name(),
            user_id: u.id,
            username: u.username,
            phone: u.phone_number,
        }
    }
}
