use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use chronicle_db::models::{AttachmentRow, StoryRow};
use chronicle_db::{NewAttachment, NewStory};
use chronicle_notify::Notification;
use chronicle_types::api::SubmitStoryResponse;
use chronicle_types::models::{Attachment, Story, StoryStatus};

use crate::storage::UploadStore;
use crate::{ApiError, AppState};

pub const MAX_ATTACHMENTS: usize = 5;
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;
pub const PUBLIC_LIST_CAP: u32 = 50;

/// Document formats accepted in addition to `image/*` and `video/*`.
const ALLOWED_DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

fn content_type_allowed(content_type: &str) -> bool {
    content_type.starts_with("image/")
        || content_type.starts_with("video/")
        || ALLOWED_DOCUMENT_TYPES.contains(&content_type)
}

/// The typed field contract of the submission form. Unknown form fields are
/// ignored; nothing is passed through to storage unchecked.
#[derive(Default)]
struct StoryFields {
    name: String,
    email: String,
    school: String,
    location: String,
    graduation: String,
    story_type: String,
    title: String,
    story: String,
}

fn validate_required(fields: &StoryFields) -> Result<(), ApiError> {
    for (label, value) in [
        ("name", &fields.name),
        ("email", &fields.email),
        ("school", &fields.school),
        ("location", &fields.location),
        ("type", &fields.story_type),
        ("title", &fields.title),
        ("story", &fields.story),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!(
                "missing required field: {label}"
            )));
        }
    }
    Ok(())
}

/// An uploaded file held in memory until the whole batch has passed the
/// attachment policy. Nothing touches the disk before that.
struct PendingUpload {
    original_name: String,
    content_type: String,
    data: Bytes,
}

/// POST /api/stories — multipart submission form.
pub async fn submit_story(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut fields = StoryFields::default();
    let mut uploads: Vec<PendingUpload> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed form body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "files" {
            if uploads.len() >= MAX_ATTACHMENTS {
                return Err(ApiError::Validation(format!(
                    "at most {MAX_ATTACHMENTS} files are allowed"
                )));
            }

            let original_name = field.file_name().unwrap_or("attachment").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            if !content_type_allowed(&content_type) {
                return Err(ApiError::UnsupportedFileType(content_type));
            }

            let data = field.bytes().await.map_err(|e| {
                ApiError::Validation(format!("failed to read file {original_name}: {e}"))
            })?;
            // Browsers send an empty files part when nothing was selected.
            if data.is_empty() {
                continue;
            }
            if data.len() > MAX_ATTACHMENT_BYTES {
                return Err(ApiError::FileTooLarge(original_name));
            }

            uploads.push(PendingUpload {
                original_name,
                content_type,
                data,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("malformed form body: {e}")))?;
            match name.as_str() {
                "name" => fields.name = value,
                "email" => fields.email = value,
                "school" => fields.school = value,
                "location" => fields.location = value,
                "graduation" => fields.graduation = value,
                "type" => fields.story_type = value,
                "title" => fields.title = value,
                "story" => fields.story = value,
                _ => {}
            }
        }
    }

    validate_required(&fields)?;

    // The whole batch passed the policy; now the files may hit the disk.
    struct StoredUpload {
        id: String,
        stored_name: String,
        original_name: String,
        content_type: String,
        byte_size: i64,
    }

    let mut stored: Vec<StoredUpload> = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        let stored_name = UploadStore::generate_name(&upload.original_name);
        state.uploads.save(&stored_name, &upload.data).await?;
        stored.push(StoredUpload {
            id: Uuid::new_v4().to_string(),
            stored_name,
            original_name: upload.original_name.clone(),
            content_type: upload.content_type.clone(),
            byte_size: upload.data.len() as i64,
        });
    }

    let story_id = Uuid::new_v4();
    let story_id_str = story_id.to_string();
    let created_at = Utc::now().to_rfc3339();
    let graduation = fields.graduation.trim();

    let attachments: Vec<NewAttachment> = stored
        .iter()
        .map(|s| NewAttachment {
            id: &s.id,
            original_name: &s.original_name,
            stored_name: &s.stored_name,
            content_type: &s.content_type,
            byte_size: s.byte_size,
        })
        .collect();

    state.db.insert_story(
        &NewStory {
            id: &story_id_str,
            name: fields.name.trim(),
            email: fields.email.trim(),
            school: fields.school.trim(),
            location: fields.location.trim(),
            graduation: (!graduation.is_empty()).then_some(graduation),
            story_type: fields.story_type.trim(),
            title: fields.title.trim(),
            body: &fields.story,
            created_at: &created_at,
        },
        &attachments,
    )?;

    info!(
        "Story {} submitted by {} ({} attachments)",
        story_id,
        fields.email.trim(),
        attachments.len()
    );

    if let Some(mailer) = &state.mailer {
        mailer.dispatch(
            fields.email.trim().to_string(),
            Notification::SubmissionReceived {
                submitter: fields.name.trim().to_string(),
                title: fields.title.trim().to_string(),
            },
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitStoryResponse {
            message: "Story submitted successfully".into(),
            story_id,
        }),
    ))
}

/// GET /api/stories/approved — public listing, newest first.
pub async fn list_approved(State(state): State<AppState>) -> Result<Json<Vec<Story>>, ApiError> {
    let rows = state
        .db
        .list_stories(Some(StoryStatus::Approved.as_str()), PUBLIC_LIST_CAP)?;

    let stories = rows
        .into_iter()
        .map(|row| story_from_row(&state, row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(stories))
}

// ── Row conversion ──────────────────────────────────────────────────────

pub(crate) fn story_from_row(state: &AppState, row: StoryRow) -> Result<Story, ApiError> {
    let attachments = state
        .db
        .attachments_for(&row.id)?
        .into_iter()
        .map(attachment_from_row)
        .collect();

    let status = StoryStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Corrupt status '{}' on story '{}'", row.status, row.id);
        StoryStatus::Pending
    });

    Ok(Story {
        id: parse_id(&row.id),
        name: row.name,
        email: row.email,
        school: row.school,
        location: row.location,
        graduation: row.graduation,
        story_type: row.story_type,
        title: row.title,
        story: row.body,
        status,
        rejection_reason: row.rejection_reason,
        created_at: parse_timestamp(&row.created_at),
        approved_at: row.approved_at.as_deref().map(parse_timestamp),
        approved_by: row.approved_by,
        attachments,
    })
}

fn attachment_from_row(row: AttachmentRow) -> Attachment {
    Attachment {
        id: parse_id(&row.id),
        url: format!("/uploads/{}", row.stored_name),
        original_name: row.original_name,
        content_type: row.content_type,
        byte_size: row.byte_size.max(0) as u64,
    }
}

fn parse_id(value: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", value, e);
        Uuid::default()
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') format has no timezone marker.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", value, e);
            DateTime::default()
        })
}
