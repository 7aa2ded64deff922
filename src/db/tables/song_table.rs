//! Song table operations

use tracing::warn;

use super::{delete_matching, find_all, find_one, insert_payload, settle, update_payload};
use crate::db::schema::SONGS;
use crate::db::{Filter, Query, SharedStore};
use crate::models::{NewSong, Song, SongUpdate};

const KEY: &str = "song_id";

/// Song table operations
#[derive(Clone)]
pub struct SongTable {
    store: SharedStore,
}

impl SongTable {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, song: &NewSong) -> Option<Song> {
        if let Err(err) = song.validate() {
            warn!("Refusing to create song: {}", err);
            return None;
        }

        settle(
            "create song",
            insert_payload(self.store.as_ref(), SONGS.name, song).await,
            None,
        )
    }

    pub async fn get(&self, song_id: &str) -> Option<Song> {
        settle(
            "get song",
            find_one(self.store.as_ref(), SONGS.name, KEY, song_id).await,
            None,
        )
    }

    pub async fn update(&self, song_id: &str, changes: &SongUpdate) -> bool {
        if changes.is_empty() {
            warn!("No fields to update for song {}", song_id);
            return false;
        }
        if let Err(err) = changes.validate() {
            warn!("Refusing to update song: {}", err);
            return false;
        }

        settle(
            "update song",
            update_payload(
                self.store.as_ref(),
                SONGS.name,
                changes,
                &[Filter::eq(KEY, song_id)],
            )
            .await,
            false,
        )
    }

    pub async fn delete(&self, song_id: &str) -> bool {
        settle(
            "delete song",
            delete_matching(self.store.as_ref(), SONGS.name, &[Filter::eq(KEY, song_id)]).await,
            false,
        )
    }

    pub async fn list(&self) -> Vec<Song> {
        self.list_where(Query::all()).await
    }

    async fn list_where(&self, query: Query) -> Vec<Song> {
        settle(
            "list songs",
            find_all(self.store.as_ref(), SONGS.name, &query.order("created_at")).await,
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_catalog;
    use crate::models::NewArtist;

    #[tokio::test]
    async fn test_song_lifecycle() {
        let catalog = memory_catalog().await;
        let artist = catalog
            .artists
            .create(&NewArtist::new("Nina", None))
            .await
            .unwrap();

        let song = catalog
            .songs
            .create(
                &NewSong::new("Song A")
                    .lasting(Some(180))
                    .by_artist(Some(&artist.artist_id)),
            )
            .await
            .unwrap();
        assert_eq!(song.title, "Song A");
        assert_eq!(song.duration, Some(180));
        assert_eq!(song.artist_id.as_deref(), Some(artist.artist_id.as_str()));

        let changes = SongUpdate {
            duration: Some(200),
            ..Default::default()
        };
        assert!(catalog.songs.update(&song.song_id, &changes).await);
        assert_eq!(catalog.songs.get(&song.song_id).await.unwrap().duration, Some(200));

        let negative = SongUpdate {
            duration: Some(-5),
            ..Default::default()
        };
        assert!(!catalog.songs.update(&song.song_id, &negative).await);

        assert!(catalog.songs.delete(&song.song_id).await);
        assert!(catalog.songs.list().await.is_empty());
    }
}
