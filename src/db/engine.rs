//! Local SQLite store
//!
//! Implements the generic table contract on top of an SQLite database so the
//! catalog can run without the managed service. Identifiers and creation
//! timestamps are assigned here, the same way the remote store assigns them.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::schema::{self, TableDef};
use super::{Filter, Query, Record, SharedStore, Store, StoreError};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => StoreError::Rejected {
                code: db.code().map(|c| c.into_owned()),
                message: db.message().to_string(),
            },
            other => StoreError::Transport(other.to_string()),
        }
    }
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Transport(format!("{}: {}", parent.display(), e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        info!("Opened local store at {}", path.display());
        Self::with_pool(pool).await
    }

    /// A private in-memory database, gone when the store is dropped
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // every connection would get its own memory database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        for def in schema::TABLES {
            sqlx::query(def.ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn lookup(table: &str) -> Result<&'static TableDef, StoreError> {
    schema::table(table).ok_or_else(|| StoreError::UnknownTable(table.to_string()))
}

fn check_column(def: &TableDef, column: &str) -> Result<(), StoreError> {
    if def.has_column(column) {
        Ok(())
    } else {
        Err(StoreError::UnknownColumn {
            table: def.name.to_string(),
            column: column.to_string(),
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Build a `WHERE` clause, pushing bound values in placeholder order
fn where_clause(
    def: &TableDef,
    filters: &[Filter],
    params: &mut Vec<Value>,
) -> Result<String, StoreError> {
    if filters.is_empty() {
        return Ok(String::new());
    }

    let mut parts = Vec::with_capacity(filters.len());
    for filter in filters {
        check_column(def, filter.column())?;
        match filter {
            Filter::Eq(column, Value::Null) => parts.push(format!("{} IS NULL", column)),
            Filter::Eq(column, value) => {
                parts.push(format!("{} = ?", column));
                params.push(value.clone());
            }
            Filter::In(_, values) if values.is_empty() => parts.push("0 = 1".to_string()),
            Filter::In(column, values) => {
                parts.push(format!("{} IN ({})", column, vec!["?"; values.len()].join(", ")));
                params.extend(values.iter().cloned());
            }
        }
    }

    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

fn decode_row(row: &SqliteRow) -> Result<Record, StoreError> {
    let mut record = Record::new();

    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let kind = raw.type_info().name().to_string();
            match kind.as_str() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(idx)?),
                "REAL" => Value::from(row.try_get::<f64, _>(idx)?),
                _ => Value::from(row.try_get::<String, _>(idx)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

async fn fetch(
    pool: &SqlitePool,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Record>, StoreError> {
    debug!("sqlite: {}", sql);

    let mut query = sqlx::query(sql);
    for value in params {
        query = bind_value(query, value);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(decode_row).collect()
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert(&self, table: &str, mut record: Record) -> Result<Vec<Record>, StoreError> {
        let def = lookup(table)?;

        if let Some(key) = def.key {
            if record.get(key).map_or(true, Value::is_null) {
                record.insert(key.to_string(), Value::from(uuid::Uuid::new_v4().to_string()));
            }
        }
        if def.timestamped && record.get("created_at").map_or(true, Value::is_null) {
            record.insert("created_at".to_string(), Value::from(now()));
        }

        let mut columns = Vec::with_capacity(record.len());
        let mut params = Vec::with_capacity(record.len());
        for (column, value) in record {
            check_column(def, &column)?;
            columns.push(column);
            params.push(value);
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            def.name,
            columns.join(", "),
            vec!["?"; params.len()].join(", ")
        );

        fetch(&self.pool, &sql, &params).await
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        let def = lookup(table)?;

        let projection = match &query.columns {
            Some(columns) => {
                for column in columns {
                    check_column(def, column)?;
                }
                columns.join(", ")
            }
            None => "*".to_string(),
        };

        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            projection,
            def.name,
            where_clause(def, &query.filters, &mut params)?
        );

        if let Some(order) = &query.order_by {
            check_column(def, order)?;
            sql.push_str(&format!(" ORDER BY {}, rowid", order));
        }

        fetch(&self.pool, &sql, &params).await
    }

    async fn update(
        &self,
        table: &str,
        changes: Record,
        filters: &[Filter],
    ) -> Result<Vec<Record>, StoreError> {
        let def = lookup(table)?;
        if filters.is_empty() {
            return Err(StoreError::Unfiltered("update"));
        }
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let mut assignments = Vec::with_capacity(changes.len());
        let mut params = Vec::with_capacity(changes.len() + filters.len());
        for (column, value) in changes {
            check_column(def, &column)?;
            assignments.push(format!("{} = ?", column));
            params.push(value);
        }

        let sql = format!(
            "UPDATE {} SET {}{} RETURNING *",
            def.name,
            assignments.join(", "),
            where_clause(def, filters, &mut params)?
        );

        fetch(&self.pool, &sql, &params).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, StoreError> {
        let def = lookup(table)?;
        if filters.is_empty() {
            return Err(StoreError::Unfiltered("delete"));
        }

        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM {}{} RETURNING *",
            def.name,
            where_clause(def, filters, &mut params)?
        );

        fetch(&self.pool, &sql, &params).await
    }

    async fn rpc(&self, function: &str) -> Result<Vec<Record>, StoreError> {
        let sql = match function {
            schema::COUNT_USERS_BY_ROLE => {
                "SELECT role, COUNT(*) AS count FROM users GROUP BY role ORDER BY role"
            }
            schema::COUNT_PLAYLISTS_BY_MOOD => {
                "SELECT mood_id, COUNT(*) AS count FROM playlists GROUP BY mood_id ORDER BY mood_id"
            }
            other => return Err(StoreError::UnknownFunction(other.to_string())),
        };

        fetch(&self.pool, sql, &[]).await
    }

    fn for_session(&self, _access_token: &str) -> SharedStore {
        // the local database has no row-level security
        Arc::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    async fn store_with_user() -> (SqliteStore, String) {
        let store = SqliteStore::in_memory().await.unwrap();
        let rows = store
            .insert(
                "users",
                record(json!({ "username": "ana", "email": "ana@x.com", "role": "Admin" })),
            )
            .await
            .unwrap();
        let id = rows[0]["user_id"].as_str().unwrap().to_string();
        (store, id)
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamp() {
        let (store, id) = store_with_user().await;
        assert!(!id.is_empty());

        let rows = store
            .select("users", &Query::all().eq("user_id", id.as_str()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["username"], json!("ana"));
        assert!(rows[0]["created_at"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_unique_email_is_rejected() {
        let (store, _) = store_with_user().await;
        let err = store
            .insert("users", record(json!({ "username": "other", "email": "ana@x.com" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));

        let rows = store.select("users", &Query::all()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_integer_columns_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let rows = store
            .insert("songs", record(json!({ "title": "Song A", "duration": 215 })))
            .await
            .unwrap();
        assert_eq!(rows[0]["duration"], json!(215));
        assert_eq!(rows[0]["artist_id"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_and_delete_report_affected_rows() {
        let (store, id) = store_with_user().await;
        let filters = [Filter::eq("user_id", id.as_str())];

        let updated = store
            .update("users", record(json!({ "username": "ana2" })), &filters)
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["username"], json!("ana2"));

        let missing = [Filter::eq("user_id", "nope")];
        assert!(store.delete("users", &missing).await.unwrap().is_empty());
        assert_eq!(store.delete("users", &filters).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unfiltered_mutations_are_refused() {
        let (store, _) = store_with_user().await;
        assert!(matches!(
            store.delete("users", &[]).await,
            Err(StoreError::Unfiltered("delete"))
        ));
        assert!(matches!(
            store.update("users", record(json!({ "role": "User" })), &[]).await,
            Err(StoreError::Unfiltered("update"))
        ));
    }

    #[tokio::test]
    async fn test_unknown_names_are_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(matches!(
            store.select("tracks", &Query::all()).await,
            Err(StoreError::UnknownTable(_))
        ));
        assert!(matches!(
            store
                .insert("playlists", record(json!({ "playlist_name": "x" })))
                .await,
            Err(StoreError::UnknownColumn { .. })
        ));
        assert!(matches!(
            store.rpc("drop_everything").await,
            Err(StoreError::UnknownFunction(_))
        ));
    }

    #[tokio::test]
    async fn test_select_with_in_filter_and_projection() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut ids = Vec::new();
        for title in ["a", "b", "c"] {
            let rows = store
                .insert("songs", record(json!({ "title": title })))
                .await
                .unwrap();
            ids.push(rows[0]["song_id"].clone());
        }

        let rows = store
            .select(
                "songs",
                &Query::all()
                    .columns(&["title"])
                    .is_in("song_id", vec![ids[0].clone(), ids[2].clone()])
                    .order("created_at"),
            )
            .await
            .unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("a"), json!("c")]);
        assert_eq!(rows[0].len(), 1);

        let none = store
            .select("songs", &Query::all().is_in("song_id", Vec::new()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_role_counts() {
        let (store, _) = store_with_user().await;
        store
            .insert("users", record(json!({ "username": "bo", "email": "bo@x.com" })))
            .await
            .unwrap();

        let rows = store.rpc(schema::COUNT_USERS_BY_ROLE).await.unwrap();
        assert_eq!(
            rows,
            vec![
                record(json!({ "role": "Admin", "count": 1 })),
                record(json!({ "role": "User", "count": 1 })),
            ]
        );
    }
}
