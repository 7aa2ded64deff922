//! Mood table operations

use tracing::warn;

use super::{delete_matching, find_all, find_one, insert_payload, settle, update_payload};
use crate::db::schema::MOODS;
use crate::db::{Filter, Query, SharedStore};
use crate::models::{Mood, MoodUpdate, NewMood};

const KEY: &str = "mood_id";

/// Mood table operations
#[derive(Clone)]
pub struct MoodTable {
    store: SharedStore,
}

impl MoodTable {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, mood: &NewMood) -> Option<Mood> {
        if let Err(err) = mood.validate() {
            warn!("Refusing to create mood: {}", err);
            return None;
        }

        settle(
            "create mood",
            insert_payload(self.store.as_ref(), MOODS.name, mood).await,
            None,
        )
    }

    pub async fn get(&self, mood_id: &str) -> Option<Mood> {
        settle(
            "get mood",
            find_one(self.store.as_ref(), MOODS.name, KEY, mood_id).await,
            None,
        )
    }

    pub async fn update(&self, mood_id: &str, changes: &MoodUpdate) -> bool {
        if changes.is_empty() {
            warn!("No fields to update for mood {}", mood_id);
            return false;
        }

        settle(
            "update mood",
            update_payload(
                self.store.as_ref(),
                MOODS.name,
                changes,
                &[Filter::eq(KEY, mood_id)],
            )
            .await,
            false,
        )
    }

    pub async fn delete(&self, mood_id: &str) -> bool {
        settle(
            "delete mood",
            delete_matching(self.store.as_ref(), MOODS.name, &[Filter::eq(KEY, mood_id)]).await,
            false,
        )
    }

    /// Every mood in the catalog
    pub async fn list(&self) -> Vec<Mood> {
        settle(
            "list moods",
            find_all(
                self.store.as_ref(),
                MOODS.name,
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
    use crate::db::testing::memory_catalog;

    #[tokio::test]
    async fn test_mood_lifecycle() {
        let catalog = memory_catalog().await;
        let mood = catalog
            .moods
            .create(&NewMood::new("Happy", "upbeat"))
            .await
            .unwrap();
        assert_eq!(mood.mood_name, "Happy");
        assert_eq!(mood.description.as_deref(), Some("upbeat"));

        let changes = MoodUpdate {
            description: Some("sunny".to_string()),
            ..Default::default()
        };
        assert!(catalog.moods.update(&mood.mood_id, &changes).await);
        assert!(!catalog.moods.update(&mood.mood_id, &MoodUpdate::default()).await);

        let fetched = catalog.moods.get(&mood.mood_id).await.unwrap();
        assert_eq!(fetched.mood_name, "Happy");
        assert_eq!(fetched.description.as_deref(), Some("sunny"));

        assert!(catalog.moods.delete(&mood.mood_id).await);
        assert!(!catalog.moods.delete(&mood.mood_id).await);
        assert!(catalog.moods.get(&mood.mood_id).await.is_none());
    }

    #[tokio::test]
    async fn test_moods_are_listed_for_everyone() {
        let catalog = memory_catalog().await;
        let owner = catalog
            .users
            .create(&crate::models::NewUser::new("ana", "a@x.com", "h"))
            .await
            .unwrap();

        catalog
            .moods
            .create(&NewMood::new("Calm", "").created_by(&owner.user_id))
            .await
            .unwrap();
        catalog.moods.create(&NewMood::new("Angry", "")).await.unwrap();

        let names: Vec<_> = catalog
            .moods
            .list()
            .await
            .into_iter()
            .map(|m| m.mood_name)
            .collect();
        assert_eq!(names, vec!["Calm", "Angry"]);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let catalog = memory_catalog().await;
        assert!(catalog.moods.create(&NewMood::new(" ", "x")).await.is_none());
        assert!(catalog.moods.list().await.is_empty());
    }
}
