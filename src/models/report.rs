//! Aggregate report rows

use serde::{Deserialize, Serialize};

/// One row of the users-by-role aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

/// One row of the playlists-by-mood aggregate; `mood_id` is null for playlists without a mood
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodCount {
    #[serde(default)]
    pub mood_id: Option<String>,
    pub count: i64,
}
