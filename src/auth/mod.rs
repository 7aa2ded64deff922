//! Sign-in, registration and the signed-in session
//!
//! Accounts live with an identity provider (the hosted auth service or the
//! local credentials table). Every account is mirrored by a row in `users`,
//! which carries the application role.

mod gotrue;
mod local;

pub use gotrue::GoTrueClient;
pub use local::LocalIdentity;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Catalog, StoreError, UserTable};
use crate::models::{User, UserRole, ValidationError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    AlreadyRegistered,
    #[error("{0}")]
    Invalid(#[from] ValidationError),
    /// the identity service refused the request
    #[error("{0}")]
    Rejected(String),
    #[error("identity service unreachable: {0}")]
    Transport(String),
    #[error("unexpected identity response: {0}")]
    Decode(String),
    #[error("session token: {0}")]
    Token(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An account as the identity provider knows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// A successful sign-in
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// The signed-in user, handed to every page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
    pub access_token: String,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::Missing("email"));
    }
    if password.is_empty() {
        return Err(ValidationError::Missing("password"));
    }
    Ok(())
}

/// Make sure an identity account has its `users` row
///
/// An existing row under the same email is re-pointed at the identity ID
/// instead of inserting a second row.
pub async fn ensure_profile(users: &UserTable, user_id: &str, email: &str) -> Option<User> {
    if let Some(profile) = users.get(user_id).await {
        return Some(profile);
    }

    if users.get_by_email(email).await.is_some() {
        info!("Linking existing profile {} to account {}", email, user_id);
        if !users.reassign_id(email, user_id).await {
            warn!("Could not link profile {} to account {}", email, user_id);
        }
        return users.get(user_id).await;
    }

    users.create_profile(user_id, email).await
}

/// Sign in and build the session, reading the role from the profile row
pub async fn sign_in(
    identity: &dyn IdentityProvider,
    catalog: &Catalog,
    email: &str,
    password: &str,
) -> Result<Session, AuthError> {
    check_credentials(email, password)?;
    let email = email.trim();

    let auth = identity.sign_in(email, password).await?;
    let scoped = catalog.for_session(&auth.access_token);
    let role = ensure_profile(&scoped.users, &auth.user.id, email)
        .await
        .map(|profile| profile.role)
        .unwrap_or_default();

    info!("Signed in {} as {}", email, role);
    Ok(Session {
        user_id: auth.user.id,
        email: email.to_string(),
        role,
        access_token: auth.access_token,
    })
}

/// Register an account and create its profile row
pub async fn sign_up(
    identity: &dyn IdentityProvider,
    catalog: &Catalog,
    email: &str,
    password: &str,
) -> Result<AuthUser, AuthError> {
    check_credentials(email, password)?;
    let email = email.trim();

    let user = identity.sign_up(email, password).await?;
    if ensure_profile(&catalog.users, &user.id, email).await.is_none() {
        warn!("Account {} has no profile row yet", email);
    }
    Ok(user)
}

/// End the session with the provider; local state is dropped regardless
pub async fn sign_out(identity: &dyn IdentityProvider, session: Session) {
    if let Err(err) = identity.sign_out(&session.access_token).await {
        warn!("Sign-out for {} failed: {}", session.email, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_catalog;
    use crate::models::{NewPlaylist, NewUser};

    fn local(catalog: &Catalog) -> LocalIdentity {
        LocalIdentity::new(catalog.store.clone(), "pepper", "secret", 3600)
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let catalog = memory_catalog().await;
        let identity = local(&catalog);

        let account = sign_up(&identity, &catalog, "ana@x.com", "pw").await.unwrap();
        let profile = catalog.users.get(&account.id).await.unwrap();
        assert_eq!(profile.username, "ana");
        assert_eq!(profile.role, UserRole::User);

        let session = sign_in(&identity, &catalog, " ana@x.com ", "pw").await.unwrap();
        assert_eq!(session.user_id, account.id);
        assert_eq!(session.email, "ana@x.com");
        assert!(!session.is_admin());
        assert!(!session.access_token.is_empty());

        assert_eq!(catalog.users.list().await.len(), 1);
        sign_out(&identity, session).await;
    }

    #[tokio::test]
    async fn test_role_comes_from_profile() {
        let catalog = memory_catalog().await;
        let identity = local(&catalog);

        let account = sign_up(&identity, &catalog, "root@x.com", "pw").await.unwrap();
        assert!(catalog.users.update_role(&account.id, UserRole::Admin).await);

        let session = sign_in(&identity, &catalog, "root@x.com", "pw").await.unwrap();
        assert!(session.is_admin());
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let catalog = memory_catalog().await;
        let identity = local(&catalog);

        assert!(matches!(
            sign_in(&identity, &catalog, "", "pw").await,
            Err(AuthError::Invalid(ValidationError::Missing("email")))
        ));
        assert!(matches!(
            sign_up(&identity, &catalog, "a@x.com", "").await,
            Err(AuthError::Invalid(ValidationError::Missing("password")))
        ));
    }

    #[tokio::test]
    async fn test_ensure_profile_links_existing_email() {
        let catalog = memory_catalog().await;
        let legacy = catalog
            .users
            .create(&NewUser::new("bo", "bo@x.com", "hash"))
            .await
            .unwrap();
        let playlist = catalog
            .playlists
            .create(&NewPlaylist::new(&legacy.user_id, "Old"))
            .await
            .unwrap();

        let profile = ensure_profile(&catalog.users, "auth-9", "bo@x.com").await.unwrap();
        assert_eq!(profile.user_id, "auth-9");
        assert_eq!(profile.username, "bo");
        assert_eq!(catalog.users.list().await.len(), 1);

        let moved = catalog.playlists.get(&playlist.playlist_id).await.unwrap();
        assert_eq!(moved.user_id, "auth-9");

        let again = ensure_profile(&catalog.users, "auth-9", "bo@x.com").await.unwrap();
        assert_eq!(again, profile);
    }
}
