//! Mood model
//!
//! Moods form one catalog-wide list. `user_id` records who created a mood and
//! is never used to scope listings.

use serde::{Deserialize, Serialize};

use super::{require, ValidationError};

/// A mood row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    #[serde(alias = "id")]
    pub mood_id: String,
    #[serde(alias = "name")]
    pub mood_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Payload for creating a mood
#[derive(Debug, Clone, Serialize)]
pub struct NewMood {
    pub mood_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NewMood {
    pub fn new(mood_name: &str, description: &str) -> Self {
        Self {
            mood_name: mood_name.trim().to_string(),
            description: description.trim().to_string(),
            user_id: None,
        }
    }

    pub fn created_by(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("mood name", &self.mood_name)
    }
}

/// Partial update of a mood
#[derive(Debug, Clone, Default, Serialize)]
pub struct MoodUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MoodUpdate {
    pub fn is_empty(&self) -> bool {
        self.mood_name.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_legacy_name_column() {
        let mood: Mood = serde_json::from_value(json!({
            "mood_id": "m1",
            "name": "Happy",
            "description": null,
        }))
        .unwrap();
        assert_eq!(mood.mood_name, "Happy");
        assert!(mood.description.is_none());
    }

    #[test]
    fn test_new_mood_payload() {
        let mood = NewMood::new(" Calm ", "");
        assert_eq!(
            serde_json::to_value(&mood).unwrap(),
            json!({ "mood_name": "Calm", "description": "" })
        );
        assert_eq!(
            NewMood::new("", "x").validate(),
            Err(ValidationError::Missing("mood name"))
        );
    }
}
