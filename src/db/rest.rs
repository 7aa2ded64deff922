//! PostgREST-compatible remote store
//!
//! Table operations map onto `/rest/v1/<table>` with `eq.`/`in.` filters in the
//! query string, aggregate calls onto `/rest/v1/rpc/<function>`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Filter, Query, Record, SharedStore, Store, StoreError};

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Remote store client
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
    /// bearer token; the anon key until a user signs in
    bearer: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bearer: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, path);
        debug!("{} {}", method, url);

        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .header("Prefer", "return=representation")
    }

    async fn rows(response: Response) -> Result<Vec<Record>, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
            let (code, message) = match body {
                Some(b) => {
                    let mut message = b.message.unwrap_or_else(|| status.to_string());
                    if let Some(details) = b.details {
                        message = format!("{} ({})", message, details);
                    }
                    (b.code, message)
                }
                None => (None, format!("{}: {}", status, text)),
            };
            return Err(StoreError::Rejected { code, message });
        }

        match response.json::<Value>().await? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(StoreError::Decode(format!("expected a row, got {}", other))),
                })
                .collect(),
            Value::Object(map) => Ok(vec![map]),
            Value::Null => Ok(Vec::new()),
            other => Err(StoreError::Decode(format!("expected rows, got {}", other))),
        }
    }
}

/// Render a filter value the way PostgREST expects it in a query string
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Filters as `(column, operator.value)` query pairs
pub(crate) fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, Value::Null) => (column.clone(), "is.null".to_string()),
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", literal(value))),
            Filter::In(column, values) => {
                let items: Vec<String> = values
                    .iter()
                    .map(|v| format!("\"{}\"", literal(v).replace('"', "\\\"")))
                    .collect();
                (column.clone(), format!("in.({})", items.join(",")))
            }
        })
        .collect()
}

/// Full query string for a select
pub(crate) fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![(
        "select".to_string(),
        query
            .columns
            .as_ref()
            .map(|c| c.join(","))
            .unwrap_or_else(|| "*".to_string()),
    )];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order_by {
        params.push(("order".to_string(), format!("{}.asc", order)));
    }
    params
}

#[async_trait]
impl Store for RestStore {
    async fn insert(&self, table: &str, record: Record) -> Result<Vec<Record>, StoreError> {
        let response = self
            .request(Method::POST, table)
            .json(&record)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        if query
            .filters
            .iter()
            .any(|f| matches!(f, Filter::In(_, values) if values.is_empty()))
        {
            return Ok(Vec::new());
        }

        let response = self
            .request(Method::GET, table)
            .query(&select_params(query))
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn update(
        &self,
        table: &str,
        changes: Record,
        filters: &[Filter],
    ) -> Result<Vec<Record>, StoreError> {
        if filters.is_empty() {
            return Err(StoreError::Unfiltered("update"));
        }

        let response = self
            .request(Method::PATCH, table)
            .query(&filter_params(filters))
            .json(&changes)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, StoreError> {
        if filters.is_empty() {
            return Err(StoreError::Unfiltered("delete"));
        }

        let response = self
            .request(Method::DELETE, table)
            .query(&filter_params(filters))
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn rpc(&self, function: &str) -> Result<Vec<Record>, StoreError> {
        let response = self
            .request(Method::POST, &format!("rpc/{}", function))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::rows(response).await
    }

    fn for_session(&self, access_token: &str) -> SharedStore {
        let mut scoped = self.clone();
        scoped.bearer = access_token.to_string();
        Arc::new(scoped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_params() {
        let params = filter_params(&[
            Filter::eq("playlist_id", "p1"),
            Filter::eq("mood_id", Value::Null),
            Filter::is_in("song_id", vec![json!("a"), json!("b")]),
        ]);

        assert_eq!(
            params,
            vec![
                ("playlist_id".to_string(), "eq.p1".to_string()),
                ("mood_id".to_string(), "is.null".to_string()),
                ("song_id".to_string(), "in.(\"a\",\"b\")".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_params() {
        let query = Query::all().columns(&["song_id"]).eq("duration", 200).order("created_at");
        assert_eq!(
            select_params(&query),
            vec![
                ("select".to_string(), "song_id".to_string()),
                ("duration".to_string(), "eq.200".to_string()),
                ("order".to_string(), "created_at.asc".to_string()),
            ]
        );
        assert_eq!(select_params(&Query::all())[0].1, "*");
    }

    #[test]
    fn test_session_scoping_keeps_api_key() {
        let store = RestStore::new("https://example.test/", "anon", Duration::from_secs(5)).unwrap();
        assert_eq!(store.base_url, "https://example.test");
        assert_eq!(store.bearer, "anon");

        let mut scoped = store.clone();
        scoped.bearer = "user-token".to_string();
        assert_eq!(scoped.api_key, "anon");
    }
}
