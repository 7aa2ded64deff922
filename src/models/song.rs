//! Song model

use serde::{Deserialize, Serialize};

use super::{require, ValidationError};

/// A song row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    #[serde(alias = "id")]
    pub song_id: String,
    #[serde(alias = "name", alias = "song_name")]
    pub title: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub genre_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Song {
    /// Duration as `m:ss`, empty when unknown
    pub fn duration_label(&self) -> String {
        match self.duration {
            Some(secs) if secs >= 0 => format!("{}:{:02}", secs / 60, secs % 60),
            _ => String::new(),
        }
    }
}

/// Payload for creating a song
#[derive(Debug, Clone, Serialize)]
pub struct NewSong {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<String>,
}

impl NewSong {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            duration: None,
            artist_id: None,
            genre_id: None,
        }
    }

    pub fn lasting(mut self, seconds: Option<i64>) -> Self {
        self.duration = seconds;
        self
    }

    pub fn by_artist(mut self, artist_id: Option<&str>) -> Self {
        self.artist_id = artist_id.filter(|a| !a.is_empty()).map(str::to_string);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        check_duration(self.duration)
    }
}

/// Partial update of a song
#[derive(Debug, Clone, Default, Serialize)]
pub struct SongUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<String>,
}

impl SongUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.duration.is_none()
            && self.artist_id.is_none()
            && self.genre_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_duration(self.duration)
    }
}

fn check_duration(duration: Option<i64>) -> Result<(), ValidationError> {
    match duration {
        Some(secs) if secs < 0 => Err(ValidationError::Invalid {
            field: "duration",
            reason: "cannot be negative".to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duration_label() {
        let mut song: Song = serde_json::from_value(json!({
            "song_id": "s1",
            "song_name": "Song A",
            "duration": 215,
        }))
        .unwrap();
        assert_eq!(song.title, "Song A");
        assert_eq!(song.duration_label(), "3:35");

        song.duration = None;
        assert_eq!(song.duration_label(), "");
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(NewSong::new("x").lasting(Some(-1)).validate().is_err());
        assert!(NewSong::new("x").lasting(Some(0)).validate().is_ok());
        assert_eq!(NewSong::new("").validate(), Err(ValidationError::Missing("title")));
    }
}
