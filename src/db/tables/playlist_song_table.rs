//! Playlist-song link table operations

use std::collections::HashMap;

use tracing::{info, warn};

use super::{delete_matching, find_all, insert_payload, settle};
use crate::db::schema::{PLAYLISTS, PLAYLIST_SONGS, SONGS};
use crate::db::{Filter, Query, SharedStore, StoreError};
use crate::models::{Playlist, PlaylistSong, Song};

/// Membership of songs in playlists
#[derive(Clone)]
pub struct PlaylistSongTable {
    store: SharedStore,
}

impl PlaylistSongTable {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Link a song to a playlist; a song already on the playlist is not added twice
    pub async fn add(&self, playlist_id: &str, song_id: &str) -> bool {
        if playlist_id.trim().is_empty() || song_id.trim().is_empty() {
            warn!("Refusing to link song: playlist and song are both required");
            return false;
        }

        if self.contains(playlist_id, song_id).await {
            warn!("Song {} is already on playlist {}", song_id, playlist_id);
            return false;
        }

        let link = PlaylistSong {
            playlist_id: playlist_id.to_string(),
            song_id: song_id.to_string(),
        };
        let added: Option<PlaylistSong> = settle(
            "add song to playlist",
            insert_payload(self.store.as_ref(), PLAYLIST_SONGS.name, &link).await,
            None,
        );
        if added.is_some() {
            info!("Added song {} to playlist {}", song_id, playlist_id);
        }
        added.is_some()
    }

    pub async fn remove(&self, playlist_id: &str, song_id: &str) -> bool {
        settle(
            "remove song from playlist",
            delete_matching(
                self.store.as_ref(),
                PLAYLIST_SONGS.name,
                &link_filters(playlist_id, song_id),
            )
            .await,
            false,
        )
    }

    pub async fn contains(&self, playlist_id: &str, song_id: &str) -> bool {
        let query = Query {
            filters: link_filters(playlist_id, song_id),
            ..Query::all()
        };
        let links: Vec<PlaylistSong> = settle(
            "look up playlist link",
            find_all(self.store.as_ref(), PLAYLIST_SONGS.name, &query).await,
            Vec::new(),
        );
        !links.is_empty()
    }

    /// Songs on a playlist, in the order they were added
    pub async fn list_songs(&self, playlist_id: &str) -> Vec<Song> {
        settle(
            "list playlist songs",
            self.songs_of(playlist_id).await,
            Vec::new(),
        )
    }

    /// Playlists a song appears on
    pub async fn list_playlists(&self, song_id: &str) -> Vec<Playlist> {
        settle(
            "list playlists for song",
            self.playlists_of(song_id).await,
            Vec::new(),
        )
    }

    async fn songs_of(&self, playlist_id: &str) -> Result<Vec<Song>, StoreError> {
        let links: Vec<PlaylistSong> = find_all(
            self.store.as_ref(),
            PLAYLIST_SONGS.name,
            &Query::all().eq("playlist_id", playlist_id),
        )
        .await?;
        let ids: Vec<String> = links.into_iter().map(|l| l.song_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let songs: Vec<Song> = find_all(
            self.store.as_ref(),
            SONGS.name,
            &Query::all().is_in("song_id", ids.iter().cloned().map(Into::into).collect()),
        )
        .await?;

        Ok(in_link_order(songs, &ids, |s| &s.song_id))
    }

    async fn playlists_of(&self, song_id: &str) -> Result<Vec<Playlist>, StoreError> {
        let links: Vec<PlaylistSong> = find_all(
            self.store.as_ref(),
            PLAYLIST_SONGS.name,
            &Query::all().eq("song_id", song_id),
        )
        .await?;
        let ids: Vec<String> = links.into_iter().map(|l| l.playlist_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let playlists: Vec<Playlist> = find_all(
            self.store.as_ref(),
            PLAYLISTS.name,
            &Query::all().is_in("playlist_id", ids.iter().cloned().map(Into::into).collect()),
        )
        .await?;

        Ok(in_link_order(playlists, &ids, |p| &p.playlist_id))
    }
}

fn link_filters(playlist_id: &str, song_id: &str) -> Vec<Filter> {
    vec![
        Filter::eq("playlist_id", playlist_id),
        Filter::eq("song_id", song_id),
    ]
}

/// Reorder fetched rows to follow the link table; rows without a link are dropped
pub(crate) fn in_link_order<T, F>(rows: Vec<T>, ids: &[String], id_of: F) -> Vec<T>
where
    F: Fn(&T) -> &String,
{
    let mut by_id: HashMap<String, T> = rows
        .into_iter()
        .map(|row| (id_of(&row).clone(), row))
        .collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
