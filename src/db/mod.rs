//! Store access for moodlist
//!
//! Every backend speaks the same generic table contract: insert, select,
//! update and delete against a named table, plus named aggregate calls.
//! The entity tables in [`tables`] are the only callers of this contract.

mod engine;
mod rest;
pub mod schema;
pub mod tables;
#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use engine::SqliteStore;
pub use rest::RestStore;
pub use tables::*;

/// One row as the store returns it
pub type Record = serde_json::Map<String, Value>;

/// Store handle shared by every table
pub type SharedStore = Arc<dyn Store>;

/// Errors surfaced by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// constraint violation or permission denial reported by the store
    #[error("store rejected the request: {message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },
    #[error("store unreachable: {0}")]
    Transport(String),
    #[error("unexpected store response: {0}")]
    Decode(String),
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    /// update/delete without a filter would touch every row
    #[error("refusing to {0} without a filter")]
    Unfiltered(&'static str),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// A column predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn is_in(column: &str, values: Vec<Value>) -> Self {
        Filter::In(column.to_string(), values)
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::In(c, _) => c,
        }
    }
}

/// A select request: optional projection, filters and ordering
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order_by: Option<String>,
}

impl Query {
    /// Select every column of every row
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn is_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::is_in(column, values));
        self
    }

    pub fn order(mut self, column: &str) -> Self {
        self.order_by = Some(column.to_string());
        self
    }
}

/// Generic table operations offered by the external store
///
/// Mutations return the affected rows, so an empty vector means nothing
/// matched. Errors are returned, never swallowed, at this level.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert(&self, table: &str, record: Record) -> Result<Vec<Record>, StoreError>;

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError>;

    async fn update(
        &self,
        table: &str,
        changes: Record,
        filters: &[Filter],
    ) -> Result<Vec<Record>, StoreError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, StoreError>;

    /// Call a stored aggregate by name
    async fn rpc(&self, function: &str) -> Result<Vec<Record>, StoreError>;

    /// A handle that acts on behalf of a signed-in user
    fn for_session(&self, access_token: &str) -> SharedStore;
}

/// Serialize a payload struct into a store record
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(format!("expected an object, got {}", other))),
    }
}

/// Deserialize a store record into a model
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Every table of the catalog, bound to one store handle
#[derive(Clone)]
pub struct Catalog {
    pub store: SharedStore,
    pub users: UserTable,
    pub moods: MoodTable,
    pub playlists: PlaylistTable,
    pub songs: SongTable,
    pub artists: ArtistTable,
    pub playlist_songs: PlaylistSongTable,
    pub reports: ReportTable,
}

impl Catalog {
    pub fn new(store: SharedStore) -> Self {
        Self {
            users: UserTable::new(store.clone()),
            moods: MoodTable::new(store.clone()),
            playlists: PlaylistTable::new(store.clone()),
            songs: SongTable::new(store.clone()),
            artists: ArtistTable::new(store.clone()),
            playlist_songs: PlaylistSongTable::new(store.clone()),
            reports: ReportTable::new(store.clone()),
            store,
        }
    }

    /// Rebind every table to a session-scoped store handle
    pub fn for_session(&self, access_token: &str) -> Self {
        Self::new(self.store.for_session(access_token))
    }
}
