use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use chronicle_db::Database;
use chronicle_types::api::{Claims, LoginRequest, LoginResponse};

use crate::{ApiError, AppState};

pub const TOKEN_TTL_HOURS: i64 = 24;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // Unknown username and wrong password yield the same error so the
    // response never reveals which usernames exist.
    let admin = state
        .db
        .get_admin_by_username(&req.username)?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&admin.password)
        .map_err(|e| anyhow::anyhow!("stored password hash is corrupt: {e}"))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let admin_id: Uuid = admin
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt admin id '{}': {}", admin.id, e))?;

    let token = create_token(&state.jwt_secret, admin_id, &admin.username)?;

    Ok(Json(LoginResponse {
        token,
        username: admin.username,
    }))
}

fn create_token(secret: &str, admin_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: admin_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
        .to_string();
    Ok(hash)
}

/// Create a reviewer account. Called at startup when none exists yet;
/// there is deliberately no baked-in default credential.
pub fn provision_admin(
    db: &Database,
    username: &str,
    password: &str,
    email: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let hash = hash_password(password)?;
    db.create_admin(&id.to_string(), username, &hash, email)?;
    Ok(id)
}
