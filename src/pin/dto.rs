use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct PinVerificationRequest {
    pub pin: String,
}

// Debug is hand-written so the PIN never reaches a log line.
impl std::fmt::Debug for PinVerificationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinVerificationRequest")
            .field("pin", &"****")
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerPinVerifyResponse {
    pub manager_username: String,
}
