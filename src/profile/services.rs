use anyhow::Context;
use bytes::Bytes;
use time::{format_description::FormatItem, macros::format_description, Date};
use tracing::{info, warn};

use super::dto::{ProfileResponse, UpdateProfileRequest, UploadPhotoResponse};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::dto::MessageResponse;
use crate::users::model::{User, UserChanges};
use crate::users::services::{
    checked_email, ensure_email_free, nullable, on_conflict, required,
};

/// Storage prefix for profile photos; served under `/uploads/profile_pictures`.
pub const PROFILE_PICTURES: &str = "profile_pictures";

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub struct UploadItem {
    pub file_name: String,
    pub body: Bytes,
}

async fn current_user(st: &AppState, username: &str) -> AppResult<User> {
    st.users
        .find_active_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

fn parse_birthday(raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::validation("Invalid birthday format"))
}

pub async fn get_profile(st: &AppState, username: &str) -> AppResult<ProfileResponse> {
    let u = current_user(st, username).await?;
    let birthday = u
        .birthday
        .map(|d| d.format(DATE_FORMAT))
        .transpose()
        .context("format birthday")?;
    let profile_image = u.profile_image.as_deref().map(|f| {
        format!(
            "{}/uploads/{}/{}",
            st.config.public_base_url, PROFILE_PICTURES, f
        )
    });
    Ok(ProfileResponse {
        user_id: u.id,
        username: u.username,
        first_name: u.first_name,
        middle_name: u.middle_name,
        last_name: u.last_name,
        email: u.email,
        phone_number: u.phone_number,
        block: u.block,
        street: u.street,
        subdivision: u.subdivision,
        city: u.city,
        province: u.province,
        landmark: u.landmark,
        birthday,
        profile_image,
    })
}

pub async fn update_profile(
    st: &AppState,
    username: &str,
    req: UpdateProfileRequest,
) -> AppResult<MessageResponse> {
    let user = current_user(st, username).await?;
    let mut changes = UserChanges::default();

    if let Some(email) = req.email.as_deref() {
        let email = checked_email(email, "Email cannot be empty.")?;
        ensure_email_free(st, &email, Some(user.id), "Email is already used by another user")
            .await?;
        changes.email = Some(email);
    }
    if let Some(first) = req.first_name.as_deref() {
        changes.first_name = Some(required(first, "First name cannot be empty.")?);
    }
    if let Some(last) = req.last_name.as_deref() {
        changes.last_name = Some(required(last, "Last name cannot be empty.")?);
    }

    changes.phone_number = req.phone_number.as_deref().map(nullable);
    changes.block = req.block.as_deref().map(nullable);
    changes.street = req.street.as_deref().map(nullable);
    changes.subdivision = req.subdivision.as_deref().map(nullable);
    changes.city = req.city.as_deref().map(nullable);
    changes.province = req.province.as_deref().map(nullable);
    changes.landmark = req.landmark.as_deref().map(nullable);

    if let Some(birthday) = req.birthday.as_deref() {
        changes.birthday = Some(Some(parse_birthday(birthday)?));
    }

    if changes.is_empty() {
        return Ok(MessageResponse::new("No fields to update"));
    }

    st.users
        .update(user.id, &changes)
        .await
        .map_err(|e| {
            on_conflict(
                e,
                "Username is already taken",
                "Email is already used by another user",
            )
        })?;
    info!(user_id = user.id, "profile updated");
    Ok(MessageResponse::new("User updated successfully"))
}

/// Keeps only the last path component of a client supplied file name.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." || name.chars().any(char::is_control) {
        return None;
    }
    Some(name.to_string())
}

/// Writes the photo, then points the caller's record at it. The two steps
/// are not atomic: if the record update fails, the file is removed again
/// unless it was already there before this upload.
pub async fn upload_profile_photo(
    st: &AppState,
    username: &str,
    item: UploadItem,
) -> AppResult<UploadPhotoResponse> {
    let name = sanitize_file_name(&item.file_name)
        .ok_or_else(|| AppError::validation("Invalid file name"))?;
    let user = current_user(st, username).await?;

    let key = format!("{PROFILE_PICTURES}/{name}");
    let preexisting = st
        .storage
        .exists(&key)
        .await
        .with_context(|| format!("check profile photo {key}"))?;
    st.storage
        .put_object(&key, item.body)
        .await
        .with_context(|| format!("store profile photo {key}"))?;

    if let Err(e) = st.users.set_profile_image(user.id, &name).await {
        if preexisting {
            warn!(%key, "profile photo overwritten but not linked; keeping shared file");
        } else if let Err(cleanup) = st.storage.delete_object(&key).await {
            warn!(error = %cleanup, %key, "could not remove orphaned profile photo");
        }
        return Err(e.context("update profile image").into());
    }

    info!(user_id = user.id, %key, "profile photo uploaded");
    Ok(UploadPhotoResponse {
        url: format!("/uploads/{key}"),
        message: "File uploaded successfully".into(),
    })
}
