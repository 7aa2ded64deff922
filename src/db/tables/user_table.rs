//! User table operations

use tracing::{info, warn};

use super::{delete_matching, find_all, find_one, insert_payload, settle, update_payload};
use crate::db::schema::USERS;
use crate::db::{Filter, Query, SharedStore};
use crate::models::{NewUser, User, UserRole, UserUpdate};

const KEY: &str = "user_id";

/// User table operations
#[derive(Clone)]
pub struct UserTable {
    store: SharedStore,
}

impl UserTable {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create a user; refuses a second account for an existing email
    pub async fn create(&self, user: &NewUser) -> Option<User> {
        if let Err(err) = user.validate() {
            warn!("Refusing to create user: {}", err);
            return None;
        }

        if self.get_by_email(&user.email).await.is_some() {
            warn!("A user with email '{}' already exists", user.email);
            return None;
        }

        let created: Option<User> = settle(
            "create user",
            insert_payload(self.store.as_ref(), USERS.name, user).await,
            None,
        );
        if let Some(ref u) = created {
            info!("Created user {} ({})", u.username, u.user_id);
        }
        created
    }

    /// Insert a bare profile row for an identity-service account
    pub async fn create_profile(&self, user_id: &str, email: &str) -> Option<User> {
        let username = email.split('@').next().unwrap_or_default();
        let profile = serde_json::json!({
            "user_id": user_id,
            "email": email,
            "username": username,
            "role": UserRole::User,
        });

        settle(
            "create profile",
            insert_payload(self.store.as_ref(), USERS.name, &profile).await,
            None,
        )
    }

    /// Get user by ID
    pub async fn get(&self, user_id: &str) -> Option<User> {
        settle(
            "get user",
            find_one(self.store.as_ref(), USERS.name, KEY, user_id).await,
            None,
        )
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> Option<User> {
        settle(
            "get user by email",
            find_one(self.store.as_ref(), USERS.name, "email", email).await,
            None,
        )
    }

    pub async fn update(&self, user_id: &str, changes: &UserUpdate) -> bool {
        if changes.is_empty() {
            warn!("No fields to update for user {}", user_id);
            return false;
        }

        settle(
            "update user",
            update_payload(
                self.store.as_ref(),
                USERS.name,
                changes,
                &[Filter::eq(KEY, user_id)],
            )
            .await,
            false,
        )
    }

    pub async fn update_role(&self, user_id: &str, role: UserRole) -> bool {
        let changes = UserUpdate {
            role: Some(role),
            ..Default::default()
        };
        self.update(user_id, &changes).await
    }

    /// Point the profile registered under `email` at a new identity-service ID
    pub async fn reassign_id(&self, email: &str, user_id: &str) -> bool {
        let changes = serde_json::json!({ KEY: user_id });
        settle(
            "reassign user id",
            update_payload(
                self.store.as_ref(),
                USERS.name,
                &changes,
                &[Filter::eq("email", email)],
            )
            .await,
            false,
        )
    }

    pub async fn delete(&self, user_id: &str) -> bool {
        settle(
            "delete user",
            delete_matching(self.store.as_ref(), USERS.name, &[Filter::eq(KEY, user_id)]).await,
            false,
        )
    }

    /// Get all users
    pub async fn list(&self) -> Vec<User> {
        settle(
            "list users",
            find_all(
                self.store.as_ref(),
                USERS.name,
                &Query::all().order("created_at"),
            )
            .await,
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{memory_catalog, CountingStore, OfflineStore};
    use crate::db::SqliteStore;
    use std::sync::Arc;

    fn ana() -> NewUser {
        NewUser::new("ana", "a@x.com", "hash")
    }

    #[tokio::test]
    async fn test_create_echoes_input() {
        let catalog = memory_catalog().await;
        let user = catalog.users.create(&ana()).await.unwrap();

        assert!(!user.user_id.is_empty());
        assert_eq!(user.username, "ana");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.password_hash.as_deref(), Some("hash"));
        assert!(user.created_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_refused() {
        let catalog = memory_catalog().await;
        let first = catalog.users.create(&ana()).await.unwrap();

        let again = NewUser::new("impostor", "a@x.com", "other").with_role(UserRole::Admin);
        assert!(catalog.users.create(&again).await.is_none());

        let users = catalog.users.list().await;
        assert_eq!(users, vec![first]);
    }

    #[tokio::test]
    async fn test_invalid_payload_never_reaches_store() {
        let store = CountingStore::new(Arc::new(SqliteStore::in_memory().await.unwrap()));
        let users = UserTable::new(store.clone());

        assert!(users.create(&NewUser::new("", "a@x.com", "hash")).await.is_none());
        assert!(users.create(&NewUser::new("ana", "a@x.com", "")).await.is_none());
        assert!(!users.update("u1", &UserUpdate::default()).await);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_role() {
        let catalog = memory_catalog().await;
        let user = catalog.users.create(&ana()).await.unwrap();

        assert!(catalog.users.update_role(&user.user_id, UserRole::Admin).await);
        assert_eq!(catalog.users.get(&user.user_id).await.unwrap().role, UserRole::Admin);
        assert!(!catalog.users.update_role("missing", UserRole::Admin).await);
    }

    #[tokio::test]
    async fn test_delete() {
        let catalog = memory_catalog().await;
        let user = catalog.users.create(&ana()).await.unwrap();

        assert!(!catalog.users.delete("missing").await);
        assert!(catalog.users.delete(&user.user_id).await);
        assert!(catalog.users.get(&user.user_id).await.is_none());
        assert!(catalog.users.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_profile_helpers() {
        let catalog = memory_catalog().await;
        let profile = catalog.users.create_profile("auth-1", "bo@x.com").await.unwrap();
        assert_eq!(profile.username, "bo");
        assert!(profile.password_hash.is_none());

        assert!(catalog.users.reassign_id("bo@x.com", "auth-2").await);
        assert!(catalog.users.get("auth-1").await.is_none());
        assert_eq!(catalog.users.get("auth-2").await.unwrap().email, "bo@x.com");
    }

    #[tokio::test]
    async fn test_store_failures_become_empty_results() {
        let users = UserTable::new(Arc::new(OfflineStore));

        assert!(users.create(&ana()).await.is_none());
        assert!(users.get("u1").await.is_none());
        assert!(!users.delete("u1").await);
        assert!(users.list().await.is_empty());
    }
}
