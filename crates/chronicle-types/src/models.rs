use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a submitted story. Every new story starts out `Pending`;
/// `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
    Pending,
    Approved,
    Rejected,
}

impl StoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StoryStatus::Pending => "pending",
            StoryStatus::Approved => "approved",
            StoryStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StoryStatus::Pending),
            "approved" => Some(StoryStatus::Approved),
            "rejected" => Some(StoryStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted narrative as served to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Story {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub school: String,
    pub location: String,
    pub graduation: Option<String>,
    #[serde(rename = "type")]
    pub story_type: String,
    pub title: String,
    pub story: String,
    pub status: StoryStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// A file uploaded alongside a story. `url` is the public path the stored
/// file is served from.
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub id: Uuid,
    pub original_name: String,
    pub content_type: String,
    pub byte_size: u64,
    pub url: String,
}
