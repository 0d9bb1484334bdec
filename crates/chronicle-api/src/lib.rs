pub mod auth;
pub mod middleware;
pub mod review;
pub mod storage;
pub mod submissions;

use std::sync::Arc;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use chronicle_db::Database;
use chronicle_notify::Mailer;
use storage::UploadStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub uploads: UploadStore,
    /// `None` when SMTP is not configured; notifications are then skipped.
    pub mailer: Option<Mailer>,
    pub jwt_secret: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("file too large: {0}")]
    FileTooLarge(String),
    #[error("story not found")]
    NotFound,
    #[error("username or password incorrect")]
    InvalidCredentials,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::UnsupportedFileType(_)
            | ApiError::FileTooLarge(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        #[derive(Serialize)]
        struct ErrorInfo {
            error: String,
        }

        // Full detail stays server-side; the client gets a generic message.
        if let ApiError::Internal(err) = &self {
            tracing::error!("internal error: {:#}", err);
        }

        (
            self.status_code(),
            Json(ErrorInfo {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
