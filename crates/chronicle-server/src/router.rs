use std::path::Path;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use chronicle_api::middleware::require_admin;
use chronicle_api::{AppState, auth, review, submissions};

/// Generous enough for five attachments at the per-file ceiling.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub fn app(state: AppState, public_dir: &Path) -> Router {
    let public_routes = Router::new()
        .route("/api/stories", post(submissions::submit_story))
        .route("/api/stories/approved", get(submissions::list_approved))
        .route("/api/admin/login", post(auth::login))
        .route("/api/health", get(health));

    let admin_routes = Router::new()
        .route("/api/admin/stats", get(review::stats))
        .route("/api/admin/stories", get(review::list_all))
        .route(
            "/api/admin/stories/{id}",
            get(review::get_by_id).delete(review::delete_story),
        )
        .route("/api/admin/stories/{id}/approve", post(review::approve))
        .route("/api/admin/stories/{id}/reject", post(review::reject))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()))
        .fallback_service(ServeDir::new(public_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
