//! User model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{require, ValidationError};

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserRole {
    #[default]
    #[serde(alias = "user")]
    User,
    #[serde(alias = "admin")]
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 2] = [UserRole::User, UserRole::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "User",
            UserRole::Admin => "Admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(ValidationError::Invalid {
                field: "role",
                reason: format!("must be User or Admin, not '{}'", other),
            }),
        }
    }
}

/// A user profile row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "id")]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
    /// Absent for profiles created from an identity-service sign-up
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Payload for creating a user
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn new(username: &str, email: &str, password_hash: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password_hash: password_hash.to_string(),
            role: UserRole::default(),
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("username", &self.username)?;
        require("email", &self.email)?;
        require("password", &self.password_hash)?;
        if !self.email.contains('@') {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: "must contain '@'".to_string(),
            });
        }
        Ok(())
    }
}

/// Partial update of a user
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.role.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!(" User ".parse::<UserRole>(), Ok(UserRole::User));
        assert!("curator".parse::<UserRole>().is_err());
        assert_eq!(UserRole::default(), UserRole::User);
    }

    #[test]
    fn test_decode_profile_without_hash() {
        let user: User = serde_json::from_value(json!({
            "user_id": "u1",
            "email": "a@x.com",
            "username": "a",
            "role": "Admin",
        }))
        .unwrap();

        assert_eq!(user.role, UserRole::Admin);
        assert!(user.password_hash.is_none());
    }

    #[test]
    fn test_new_user_validation() {
        assert!(NewUser::new("ana", "ana@x.com", "hash").validate().is_ok());
        assert_eq!(
            NewUser::new("", "ana@x.com", "hash").validate(),
            Err(ValidationError::Missing("username"))
        );
        assert!(matches!(
            NewUser::new("ana", "not-an-email", "hash").validate(),
            Err(ValidationError::Invalid { field: "email", .. })
        ));
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let update = UserUpdate {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "role": "Admin" }));
        assert!(UserUpdate::default().is_empty());
    }
}
