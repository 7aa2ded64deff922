//! Aggregate reports

use serde::de::DeserializeOwned;

use super::settle;
use crate::db::schema::{COUNT_PLAYLISTS_BY_MOOD, COUNT_USERS_BY_ROLE};
use crate::db::{from_record, SharedStore, StoreError};
use crate::models::{MoodCount, RoleCount};

#[derive(Clone)]
pub struct ReportTable {
    store: SharedStore,
}

impl ReportTable {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn count_users_by_role(&self) -> Vec<RoleCount> {
        settle(
            "count users by role",
            self.call(COUNT_USERS_BY_ROLE).await,
            Vec::new(),
        )
    }

    pub async fn count_playlists_by_mood(&self) -> Vec<MoodCount> {
        settle(
            "count playlists by mood",
            self.call(COUNT_PLAYLISTS_BY_MOOD).await,
            Vec::new(),
        )
    }

    async fn call<T: DeserializeOwned>(&self, function: &str) -> Result<Vec<T>, StoreError> {
        self.store
            .rpc(function)
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{memory_catalog, OfflineStore};
    use crate::models::{NewMood, NewPlaylist, NewUser, UserRole};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reports() {
        let catalog = memory_catalog().await;
        assert!(catalog.reports.count_users_by_role().await.is_empty());

        let admin = catalog
            .users
            .create(&NewUser::new("root", "r@x.com", "h").with_role(UserRole::Admin))
            .await
            .unwrap();
        catalog
            .users
            .create(&NewUser::new("ana", "a@x.com", "h"))
            .await
            .unwrap();
        catalog
            .users
            .create(&NewUser::new("bo", "b@x.com", "h"))
            .await
            .unwrap();

        let roles = catalog.reports.count_users_by_role().await;
        assert_eq!(
            roles,
            vec![
                RoleCount { role: "Admin".into(), count: 1 },
                RoleCount { role: "User".into(), count: 2 },
            ]
        );

        let calm = catalog.moods.create(&NewMood::new("Calm", "")).await.unwrap();
        catalog
            .playlists
            .create(&NewPlaylist::new(&admin.user_id, "A").with_mood(Some(&calm.mood_id)))
            .await
            .unwrap();
        catalog
            .playlists
            .create(&NewPlaylist::new(&admin.user_id, "B"))
            .await
            .unwrap();

        let moods = catalog.reports.count_playlists_by_mood().await;
        assert_eq!(moods.len(), 2);
        assert!(moods.contains(&MoodCount { mood_id: None, count: 1 }));
        assert!(moods.contains(&MoodCount { mood_id: Some(calm.mood_id), count: 1 }));
    }

    #[tokio::test]
    async fn test_offline_reports_are_empty() {
        let reports = ReportTable::new(Arc::new(OfflineStore));
        assert!(reports.count_users_by_role().await.is_empty());
        assert!(reports.count_playlists_by_mood().await.is_empty());
    }
}
