use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use chronicle_db::TransitionOutcome;
use chronicle_notify::Notification;
use chronicle_types::api::{Claims, MessageResponse, RejectRequest, StatsResponse};
use chronicle_types::models::{Story, StoryStatus};

use crate::submissions::story_from_row;
use crate::{ApiError, AppState};

pub const ADMIN_LIST_CAP: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct StoryQuery {
    pub status: Option<String>,
}

/// GET /api/admin/stories — all stories, optionally filtered by status.
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<StoryQuery>,
) -> Result<Json<Vec<Story>>, ApiError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            StoryStatus::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("unknown status: {raw}")))?,
        ),
        None => None,
    };

    let rows = state
        .db
        .list_stories(status.map(StoryStatus::as_str), ADMIN_LIST_CAP)?;

    let stories = rows
        .into_iter()
        .map(|row| story_from_row(&state, row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(stories))
}

/// GET /api/admin/stories/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Story>, ApiError> {
    let row = state.db.get_story(&id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(story_from_row(&state, row)?))
}

/// POST /api/admin/stories/{id}/approve — pending stories only; the acting
/// reviewer is recorded on the story.
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let now = Utc::now().to_rfc3339();
    match state.db.approve_story(&id, &claims.username, &now)? {
        TransitionOutcome::Applied => {}
        TransitionOutcome::NotPending(current) => {
            return Err(ApiError::Conflict(format!("story is already {current}")));
        }
        TransitionOutcome::Missing => return Err(ApiError::NotFound),
    }

    info!("Story {} approved by {}", id, claims.username);
    notify_submitter(&state, &id, |row| Notification::StoryApproved {
        submitter: row.0,
        title: row.1,
    });

    Ok(Json(MessageResponse {
        message: "Story approved".into(),
    }))
}

/// POST /api/admin/stories/{id}/reject — stores the reason verbatim when
/// one is given; a missing reason is fine.
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let reason = body.and_then(|Json(req)| req.reason);

    match state.db.reject_story(&id, reason.as_deref())? {
        TransitionOutcome::Applied => {}
        TransitionOutcome::NotPending(current) => {
            return Err(ApiError::Conflict(format!("story is already {current}")));
        }
        TransitionOutcome::Missing => return Err(ApiError::NotFound),
    }

    info!("Story {} rejected by {}", id, claims.username);
    let reason_for_mail = reason.clone();
    notify_submitter(&state, &id, move |row| Notification::StoryRejected {
        submitter: row.0,
        title: row.1,
        reason: reason_for_mail,
    });

    Ok(Json(MessageResponse {
        message: "Story rejected".into(),
    }))
}

/// DELETE /api/admin/stories/{id} — removes the record and its stored
/// attachment files.
pub async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let stored = state.db.delete_story(&id)?.ok_or(ApiError::NotFound)?;

    for name in &stored {
        if let Err(err) = state.uploads.delete(name).await {
            warn!("Failed to remove stored file {}: {:#}", name, err);
        }
    }

    info!(
        "Story {} deleted by {} ({} files removed)",
        id,
        claims.username,
        stored.len()
    );
    Ok(Json(MessageResponse {
        message: "Story deleted".into(),
    }))
}

/// GET /api/admin/stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.db.story_stats()?;
    Ok(Json(StatsResponse {
        total: stats.total.max(0) as u64,
        pending: stats.pending.max(0) as u64,
        approved: stats.approved.max(0) as u64,
        rejected: stats.rejected.max(0) as u64,
    }))
}

/// Look the story back up for its submitter contact and hand the built
/// notification to the dispatcher. Lookup failures only cost the email.
fn notify_submitter<F>(state: &AppState, id: &str, build: F)
where
    F: FnOnce((String, String)) -> Notification,
{
    let Some(mailer) = &state.mailer else {
        return;
    };

    match state.db.get_story(id) {
        Ok(Some(row)) => mailer.dispatch(row.email, build((row.name, row.title))),
        Ok(None) => {}
        Err(err) => warn!("Skipping notification for story {}: {:#}", id, err),
    }
}
