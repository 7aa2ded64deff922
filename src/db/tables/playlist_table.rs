//! Playlist table operations

use tracing::{debug, warn};

use super::{delete_matching, find_all, find_one, insert_payload, settle, update_payload};
use crate::db::schema::PLAYLISTS;
use crate::db::{Filter, Query, SharedStore};
use crate::models::{NewPlaylist, Playlist, PlaylistUpdate};

const KEY: &str = "playlist_id";

/// Playlist table operations
#[derive(Clone)]
pub struct PlaylistTable {
    store: SharedStore,
}

impl PlaylistTable {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, playlist: &NewPlaylist) -> Option<Playlist> {
        if let Err(err) = playlist.validate() {
            warn!("Refusing to create playlist: {}", err);
            return None;
        }

        settle(
            "create playlist",
            insert_payload(self.store.as_ref(), PLAYLISTS.name, playlist).await,
            None,
        )
    }

    pub async fn get(&self, playlist_id: &str) -> Option<Playlist> {
        settle(
            "get playlist",
            find_one(self.store.as_ref(), PLAYLISTS.name, KEY, playlist_id).await,
            None,
        )
    }

    pub async fn update(&self, playlist_id: &str, changes: &PlaylistUpdate) -> bool {
        if changes.is_empty() {
            warn!("No fields to update for playlist {}", playlist_id);
            return false;
        }

        settle(
            "update playlist",
            update_payload(
                self.store.as_ref(),
                PLAYLISTS.name,
                changes,
                &[Filter::eq(KEY, playlist_id)],
            )
            .await,
            false,
        )
    }

    pub async fn delete(&self, playlist_id: &str) -> bool {
        settle(
            "delete playlist",
            delete_matching(
                self.store.as_ref(),
                PLAYLISTS.name,
                &[Filter::eq(KEY, playlist_id)],
            )
            .await,
            false,
        )
    }

    /// Get all playlists
    pub async fn list(&self) -> Vec<Playlist> {
        self.list_where(Query::all()).await
    }

    /// Playlists owned by a user
    pub async fn list_by_user(&self, user_id: &str) -> Vec<Playlist> {
        self.list_where(Query::all().eq("user_id", user_id)).await
    }

    /// Playlists tagged with a mood; no mood selected means no playlists
    pub async fn list_by_mood(&self, mood_id: Option<&str>) -> Vec<Playlist> {
        let Some(mood_id) = mood_id.filter(|m| !m.is_empty()) else {
            return Vec::new();
        };

        let playlists = self.list_where(Query::all().eq("mood_id", mood_id)).await;
        if playlists.is_empty() {
            debug!("No playlists found for mood {}", mood_id);
        }
        playlists
    }

    async fn list_where(&self, query: Query) -> Vec<Playlist> {
        settle(
            "list playlists",
            find_all(
                self.store.as_ref(),
                PLAYLISTS.name,
                &query.order("created_at"),
            )
            .await,
            Vec::new(),
        )
    }
}
