//! Identity provider backed by the store's credentials table

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{AuthError, AuthSession, AuthUser, IdentityProvider};
use crate::db::schema::CREDENTIALS;
use crate::db::{from_record, to_record, Query, SharedStore};
use crate::utils::auth::{
    create_jwt, generate_random_string, hash_password, verify_jwt, verify_password, TokenIdentity,
    ACCESS_TOKEN,
};

const SALT_LENGTH: usize = 16;

#[derive(Debug, Deserialize)]
struct Credential {
    id: String,
    email: String,
    /// `<salt>$<hash>`
    password_hash: String,
}

/// Local accounts with salted pbkdf2 hashes and signed session tokens
pub struct LocalIdentity {
    store: SharedStore,
    pepper: String,
    jwt_secret: String,
    session_ttl: u64,
}

impl LocalIdentity {
    pub fn new(store: SharedStore, pepper: &str, jwt_secret: &str, session_ttl: u64) -> Self {
        Self {
            store,
            pepper: pepper.to_string(),
            jwt_secret: jwt_secret.to_string(),
            session_ttl,
        }
    }

    fn salted(&self, salt: &str) -> String {
        format!("{}{}", self.pepper, salt)
    }

    async fn find(&self, email: &str) -> Result<Option<Credential>, AuthError> {
        let rows = self
            .store
            .select(CREDENTIALS.name, &Query::all().eq("email", email))
            .await?;
        Ok(rows.into_iter().next().map(from_record).transpose()?)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let credential = self.find(email).await?.ok_or(AuthError::InvalidCredentials)?;

        let (salt, hash) = credential
            .password_hash
            .split_once('$')
            .ok_or_else(|| AuthError::Decode("malformed credential".into()))?;
        if !verify_password(password, &self.salted(salt), hash) {
            debug!("Wrong password for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        let identity = TokenIdentity {
            user_id: credential.id.clone(),
            email: credential.email.clone(),
        };
        let access_token = create_jwt(identity, &self.jwt_secret, ACCESS_TOKEN, self.session_ttl)
            .map_err(|e| AuthError::Token(e.to_string()))?;

        Ok(AuthSession {
            user: AuthUser {
                id: credential.id,
                email: credential.email,
            },
            access_token,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        if self.find(email).await?.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        let salt = generate_random_string(SALT_LENGTH);
        let stored = format!("{}${}", salt, hash_password(password, &self.salted(&salt)));
        let record = to_record(&json!({ "email": email, "password_hash": stored }))?;

        let rows = self.store.insert(CREDENTIALS.name, record).await?;
        let credential: Credential = rows
            .into_iter()
            .next()
            .map(from_record)
            .transpose()?
            .ok_or_else(|| AuthError::Decode("no account returned".into()))?;

        info!("Registered local account {}", credential.email);
        Ok(AuthUser {
            id: credential.id,
            email: credential.email,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        // tokens are stateless; only check that it was ours
        verify_jwt(access_token, &self.jwt_secret, Some(ACCESS_TOKEN))
            .map(|_| ())
            .map_err(|e| AuthError::Token(e.to_string()))
    }
}
