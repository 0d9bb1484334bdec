/// Database row types — these map directly to SQLite rows.
/// Distinct from the chronicle-types API models to keep the DB layer
/// independent; timestamps stay TEXT here and are parsed at the API layer.
pub struct StoryRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub school: String,
    pub location: String,
    pub graduation: Option<String>,
    pub story_type: String,
    pub title: String,
    pub body: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub approved_at: Option<String>,
    pub approved_by: Option<String>,
}

pub struct AttachmentRow {
    pub id: String,
    pub story_id: String,
    pub position: i64,
    pub original_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub byte_size: i64,
}

pub struct AdminRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: String,
    pub created_at: String,
}
