//! Data models for moodlist
//!
//! Row models decode whatever the store returns, tolerating the column names
//! older schema revisions used. `New*` payloads are validated before any store
//! call; `*Update` payloads carry only the fields that should change.

mod artist;
mod mood;
mod playlist;
mod report;
mod song;
mod user;

pub use artist::{Artist, ArtistUpdate, NewArtist};
pub use mood::{Mood, MoodUpdate, NewMood};
pub use playlist::{NewPlaylist, Playlist, PlaylistSong, PlaylistUpdate};
pub use report::{MoodCount, RoleCount};
pub use song::{NewSong, Song, SongUpdate};
pub use user::{NewUser, User, UserRole, UserUpdate};

use thiserror::Error;

/// A payload that cannot be sent to the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Reject blank required fields
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        assert!(require("name", "Chill").is_ok());
        assert_eq!(require("name", "   "), Err(ValidationError::Missing("name")));
        assert_eq!(
            ValidationError::Missing("email").to_string(),
            "email is required"
        );
    }
}
