//! Hosted auth service client (`/auth/v1`)

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{AuthError, AuthSession, AuthUser, IdentityProvider};

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::Decode(err.to_string())
        } else {
            AuthError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    user: UserBody,
}

/// Sign-up answers with the user itself, or with a session when no
/// confirmation is required
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session { user: UserBody },
    User(UserBody),
}

/// The service has used several error layouts over time
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn text(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
    }
}

fn classify(status: StatusCode, body: &str) -> AuthError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let text = parsed
        .text()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}: {}", status, body));
    let lowered = text.to_lowercase();

    match parsed.error_code.as_deref() {
        Some("invalid_credentials") => AuthError::InvalidCredentials,
        Some("user_already_exists") | Some("email_exists") => AuthError::AlreadyRegistered,
        _ if lowered.contains("invalid login credentials") => AuthError::InvalidCredentials,
        _ if lowered.contains("already registered") => AuthError::AlreadyRegistered,
        _ => AuthError::Rejected(text),
    }
}

fn account(user: UserBody, email: &str) -> AuthUser {
    AuthUser {
        id: user.id,
        email: user.email.unwrap_or_else(|| email.to_string()),
    }
}

/// Client for the hosted auth service next to the REST store
pub struct GoTrueClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoTrueClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn post(&self, path: &str, bearer: &str, body: Value) -> Result<Response, AuthError> {
        let url = format!("{}/auth/v1/{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(classify(status, &text))
        }
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let body = json!({ "email": email, "password": password });
        let token: TokenBody = self
            .post("token?grant_type=password", &self.api_key, body)
            .await?
            .json()
            .await?;

        Ok(AuthSession {
            user: account(token.user, email),
            access_token: token.access_token,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let body = json!({ "email": email, "password": password });
        let answer: SignUpBody = self.post("signup", &self.api_key, body).await?.json().await?;

        let user = match answer {
            SignUpBody::Session { user } | SignUpBody::User(user) => user,
        };
        Ok(account(user, email))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.post("logout", access_token, json!({})).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error_layouts() {
        let current = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, current),
            AuthError::InvalidCredentials
        ));

        let legacy = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, legacy),
            AuthError::InvalidCredentials
        ));

        let taken = r#"{"code":422,"msg":"User already registered"}"#;
        assert!(matches!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, taken),
            AuthError::AlreadyRegistered
        ));

        match classify(StatusCode::BAD_GATEWAY, "upstream down") {
            AuthError::Rejected(text) => assert!(text.contains("upstream down")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sign_up_body_shapes() {
        let confirm: SignUpBody =
            serde_json::from_str(r#"{"id":"u1","email":"a@x.com","role":"authenticated"}"#).unwrap();
        assert!(matches!(confirm, SignUpBody::User(ref u) if u.id == "u1"));

        let session: SignUpBody = serde_json::from_str(
            r#"{"access_token":"t","user":{"id":"u2","email":"b@x.com"}}"#,
        )
        .unwrap();
        assert!(matches!(session, SignUpBody::Session { ref user } if user.id == "u2"));
    }

    #[test]
    fn test_account_falls_back_to_requested_email() {
        let user = UserBody {
            id: "u1".into(),
            email: None,
        };
        assert_eq!(account(user, "a@x.com").email, "a@x.com");
    }
}
