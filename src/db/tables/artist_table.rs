//! Artist table operations

use tracing::warn;

use super::{delete_matching, find_all, find_one, insert_payload, settle, update_payload};
use crate::db::schema::ARTISTS;
use crate::db::{Filter, Query, SharedStore};
use crate::models::{Artist, ArtistUpdate, NewArtist};

const KEY: &str = "artist_id";

/// Artist table operations
#[derive(Clone)]
pub struct ArtistTable {
    store: SharedStore,
}

impl ArtistTable {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, artist: &NewArtist) -> Option<Artist> {
        if let Err(err) = artist.validate() {
            warn!("Refusing to create artist: {}", err);
            return None;
        }

        settle(
            "create artist",
            insert_payload(self.store.as_ref(), ARTISTS.name, artist).await,
            None,
        )
    }

    pub async fn get(&self, artist_id: &str) -> Option<Artist> {
        settle(
            "get artist",
            find_one(self.store.as_ref(), ARTISTS.name, KEY, artist_id).await,
            None,
        )
    }

    pub async fn update(&self, artist_id: &str, changes: &ArtistUpdate) -> bool {
        if changes.is_empty() {
            warn!("No fields to update for artist {}", artist_id);
            return false;
        }

        settle(
            "update artist",
            update_payload(
                self.store.as_ref(),
                ARTISTS.name,
                changes,
                &[Filter::eq(KEY, artist_id)],
            )
            .await,
            false,
        )
    }

    pub async fn delete(&self, artist_id: &str) -> bool {
        settle(
            "delete artist",
            delete_matching(self.store.as_ref(), ARTISTS.name, &[Filter::eq(KEY, artist_id)])
                .await,
            false,
        )
    }

    pub async fn list(&self) -> Vec<Artist> {
        settle(
            "list artists",
            find_all(
                self.store.as_ref(),
                ARTISTS.name,
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
    async fn test_artist_lifecycle() {
        let catalog = memory_catalog().await;
        let artist = catalog
            .artists
            .create(&NewArtist::new("Nina", Some("jazz")))
            .await
            .unwrap();
        assert_eq!(artist.description.as_deref(), Some("jazz"));

        let changes = ArtistUpdate {
            name: Some("Nina S.".to_string()),
            description: None,
        };
        assert!(catalog.artists.update(&artist.artist_id, &changes).await);

        let fetched = catalog.artists.get(&artist.artist_id).await.unwrap();
        assert_eq!(fetched.name, "Nina S.");
        assert_eq!(fetched.description.as_deref(), Some("jazz"));

        assert!(catalog.artists.delete(&artist.artist_id).await);
        assert!(!catalog.artists.delete(&artist.artist_id).await);
    }

    #[tokio::test]
    async fn test_missing_name() {
        let catalog = memory_catalog().await;
        assert!(catalog.artists.create(&NewArtist::new("", None)).await.is_none());
        assert!(catalog.artists.list().await.is_empty());
    }
}
