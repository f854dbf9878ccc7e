//! Admin authentication service
//!
//! The back office is a single admin role: log in with email and password,
//! get a short-lived JWT for the admin API.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Admin authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    token_expiry_seconds: i64,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Issued token response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// JWT claims for admin tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, FromRow)]
struct AdminRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, jwt_secret: String, token_expiry_seconds: i64) -> Self {
        Self {
            db,
            jwt_secret,
            token_expiry_seconds,
        }
    }

    /// Verify credentials and issue an admin token.
    pub async fn login(&self, input: LoginInput) -> AppResult<TokenResponse> {
        let admin = sqlx::query_as::<_, AdminRow>(
            "SELECT id, email, password_hash FROM admin_users WHERE email = $1",
        )
        .bind(input.email.to_lowercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = bcrypt::verify(&input.password, &admin.password_hash)
            .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now().timestamp();
        let claims = AdminClaims {
            sub: admin.id.to_string(),
            email: admin.email,
            exp: now + self.token_expiry_seconds,
            iat: now,
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_expiry_seconds,
        })
    }
}
