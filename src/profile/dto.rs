use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub username: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub block: Option<String>,
    pub street: Option<String>,
    pub subdivision: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub landmark: Option<String>,
    pub birthday: Option<String>, // YYYY-MM-DD
    pub profile_image: Option<String>, // absolute URL
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub block: Option<String>,
    pub street: Option<String>,
    pub subdivision: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub landmark: Option<String>,
    pub birthday: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadPhotoResponse {
    pub url: String,
    pub message: String,
}
