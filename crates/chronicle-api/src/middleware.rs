use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use chronicle_types::api::Claims;

use crate::{ApiError, AppState};

/// Extract and validate the bearer token from the Authorization header,
/// then attach the caller's claims as a request extension.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    // A token must not outlive its account.
    if state
        .db
        .get_admin_by_id(&token_data.claims.sub.to_string())?
        .is_none()
    {
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
