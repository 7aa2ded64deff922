//! Playlist model

use serde::{Deserialize, Serialize};

use super::{require, ValidationError};

/// A playlist row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(alias = "id")]
    pub playlist_id: String,
    #[serde(alias = "playlist_name", alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Owner user ID
    pub user_id: String,
    #[serde(default)]
    pub mood_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Payload for creating a playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlaylist {
    pub user_id: String,
    #[serde(alias = "playlist_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_id: Option<String>,
}

impl NewPlaylist {
    pub fn new(user_id: &str, name: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.trim().to_string(),
            description: String::new(),
            mood_id: None,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    pub fn with_mood(mut self, mood_id: Option<&str>) -> Self {
        self.mood_id = mood_id.filter(|m| !m.is_empty()).map(str::to_string);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("owning user", &self.user_id)?;
        require("playlist name", &self.name)
    }
}

/// Partial update of a playlist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistUpdate {
    #[serde(default, alias = "playlist_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_id: Option<String>,
}

impl PlaylistUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.mood_id.is_none()
    }
}

/// A playlist/song association row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSong {
    pub playlist_id: String,
    pub song_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_drifted_name_columns() {
        for key in ["name", "playlist_name", "title"] {
            let mut row = json!({ "playlist_id": "p1", "user_id": "u1" });
            row[key] = json!("Party Mix");

            let playlist: Playlist = serde_json::from_value(row).unwrap();
            assert_eq!(playlist.name, "Party Mix");
            assert!(playlist.mood_id.is_none());
        }
    }

    #[test]
    fn test_equality_covers_every_field() {
        let row = json!({ "playlist_id": "p1", "name": "Mix", "user_id": "u1" });
        let before: Playlist = serde_json::from_value(row).unwrap();

        let mut renamed = before.clone();
        renamed.name = "Renamed".into();
        assert_ne!(before, renamed);

        let mut tagged = before.clone();
        tagged.mood_id = Some("m1".into());
        assert_ne!(before, tagged);

        assert_eq!(before, before.clone());
    }

    #[test]
    fn test_new_playlist_drops_blank_mood() {
        let playlist = NewPlaylist::new("u1", "Focus").with_mood(Some(""));
        assert!(playlist.mood_id.is_none());
        assert_eq!(
            serde_json::to_value(&playlist).unwrap(),
            json!({ "user_id": "u1", "name": "Focus", "description": "" })
        );
    }

    #[test]
    fn test_new_playlist_requires_owner_and_name() {
        assert_eq!(
            NewPlaylist::new("", "Focus").validate(),
            Err(ValidationError::Missing("owning user"))
        );
        assert_eq!(
            NewPlaylist::new("u1", " ").validate(),
            Err(ValidationError::Missing("playlist name"))
        );
    }
}
