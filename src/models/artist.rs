//! Artist model

use serde::{Deserialize, Serialize};

use super::{require, ValidationError};

/// An artist row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(alias = "id")]
    pub artist_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Payload for creating an artist
#[derive(Debug, Clone, Serialize)]
pub struct NewArtist {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NewArtist {
    pub fn new(name: &str, description: Option<&str>) -> Self {
        Self {
            name: name.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            user_id: None,
        }
    }

    pub fn created_by(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("artist name", &self.name)
    }
}

/// Partial update of an artist
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtistUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ArtistUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_description_is_omitted() {
        let artist = NewArtist::new("Nina", Some("  "));
        assert_eq!(serde_json::to_value(&artist).unwrap(), json!({ "name": "Nina" }));
    }
}
