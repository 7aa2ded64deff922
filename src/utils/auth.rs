//! Password hashing and session tokens

use anyhow::Result;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

const PBKDF2_ITERATIONS: u32 = 100_000;
const HASH_LENGTH: usize = 32;

pub const ACCESS_TOKEN: &str = "access";

/// account identity carried by a session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: String,
    #[serde(default)]
    pub email: String,
    pub exp: usize,
    #[serde(default)]
    pub token_type: String,
}

/// hash a password using pbkdf2-sha256
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS, &mut hash);

    hex::encode(hash)
}

/// verify a password against a hash using constant-time comparison
pub fn verify_password(password: &str, salt: &str, hash: &str) -> bool {
    let computed_hash = hash_password(password, salt);

    computed_hash.as_bytes().ct_eq(hash.as_bytes()).into()
}

/// generate a random string of the given length
pub fn generate_random_string(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// create jwt token with token type and ttl seconds
pub fn create_jwt(
    identity: TokenIdentity,
    secret: &str,
    token_type: &str,
    expires_in: u64,
) -> Result<String> {
    let expiration = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() + expires_in;

    let claims = Claims {
        sub: identity.user_id,
        email: identity.email,
        exp: expiration as usize,
        token_type: token_type.to_string(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// verify jwt token and optionally enforce token type
pub fn verify_jwt(token: &str, secret: &str, expected_type: Option<&str>) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    let claims = token_data.claims;
    if let Some(t) = expected_type {
        if claims.token_type != t {
            return Err(anyhow::anyhow!("Invalid token type"));
        }
    }

    Ok(claims)
}
