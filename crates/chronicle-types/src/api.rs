use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims for administrator bearer tokens. Canonical definition lives
/// here so the login handler and the auth middleware share one type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

// -- Submissions --

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitStoryResponse {
    pub message: String,
    #[serde(rename = "storyId")]
    pub story_id: Uuid,
}

// -- Review --

#[derive(Debug, Deserialize, Serialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

/// Generic `{"message": ...}` acknowledgement body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
