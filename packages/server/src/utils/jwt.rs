use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims for bearer access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Email
    pub uid: i32,    // User ID
    pub exp: usize,  // Expiration timestamp
}

/// Claims for single-purpose email links (verification, password reset).
/// The `action` field prevents a token minted for one flow from being
/// replayed against another.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionClaims {
    pub sub: String,
    pub uid: i32,
    pub action: String,
    pub exp: usize,
}

pub const ACTION_VERIFY_EMAIL: &str = "verify_email";
pub const ACTION_RESET_PASSWORD: &str = "reset_password";

/// Sign a new access token for a user.
pub fn sign(user_id: i32, email: &str, ttl_days: i64, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(ttl_days))
        .ok_or_else(|| anyhow::anyhow!("token expiry overflow"))?
        .timestamp();

    let claims = Claims {
        sub: email.to_owned(),
        uid: user_id,
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode an access token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Sign a single-purpose action token (24h validity).
pub fn sign_action(user_id: i32, email: &str, action: &str, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| anyhow::anyhow!("token expiry overflow"))?
        .timestamp();

    let claims = ActionClaims {
        sub: email.to_owned(),
        uid: user_id,
        action: action.to_owned(),
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify an action token and check it was minted for `expected_action`.
pub fn verify_action(token: &str, expected_action: &str, secret: &str) -> Result<ActionClaims> {
    let token_data = decode::<ActionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    if token_data.claims.action != expected_action {
        bail!("token action mismatch");
    }
    Ok(token_data.claims)
}
