//! Entity access layer
//!
//! One table type per entity. Operations never return store errors: a failed
//! call is logged and answered with the operation's empty value (`None`,
//! `false` or an empty list).

mod artist_table;
mod mood_table;
mod playlist_song_table;
mod playlist_table;
mod report_table;
mod song_table;
mod user_table;

pub use artist_table::ArtistTable;
pub use mood_table::MoodTable;
pub(crate) use playlist_song_table::in_link_order;
pub use playlist_song_table::PlaylistSongTable;
pub use playlist_table::PlaylistTable;
pub use report_table::ReportTable;
pub use song_table::SongTable;
pub use user_table::UserTable;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::{from_record, to_record, Filter, Query, Store, StoreError};

/// Log a failed store call and fall back to the operation's empty value
pub(crate) fn settle<T>(operation: &str, result: Result<T, StoreError>, empty: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!("Failed to {}: {}", operation, err);
            empty
        }
    }
}

/// Insert a payload and decode the row the store hands back
pub(crate) async fn insert_payload<P, R>(
    store: &dyn Store,
    table: &str,
    payload: &P,
) -> Result<Option<R>, StoreError>
where
    P: Serialize + Sync,
    R: DeserializeOwned,
{
    let rows = store.insert(table, to_record(payload)?).await?;
    rows.into_iter().next().map(from_record).transpose()
}

pub(crate) async fn find_one<R: DeserializeOwned>(
    store: &dyn Store,
    table: &str,
    column: &str,
    value: &str,
) -> Result<Option<R>, StoreError> {
    let rows = store.select(table, &Query::all().eq(column, value)).await?;
    rows.into_iter().next().map(from_record).transpose()
}

pub(crate) async fn find_all<R: DeserializeOwned>(
    store: &dyn Store,
    table: &str,
    query: &Query,
) -> Result<Vec<R>, StoreError> {
    store
        .select(table, query)
        .await?
        .into_iter()
        .map(from_record)
        .collect()
}

/// Apply a partial update; true only when the store reports a changed row
pub(crate) async fn update_payload<P: Serialize + Sync>(
    store: &dyn Store,
    table: &str,
    payload: &P,
    filters: &[Filter],
) -> Result<bool, StoreError> {
    let rows = store.update(table, to_record(payload)?, filters).await?;
    Ok(!rows.is_empty())
}

/// Delete matching rows; true only when the store reports a removed row
pub(crate) async fn delete_matching(
    store: &dyn Store,
    table: &str,
    filters: &[Filter],
) -> Result<bool, StoreError> {
    Ok(!store.delete(table, filters).await?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle() {
        assert_eq!(settle("count", Ok(3), 0), 3);
        assert_eq!(
            settle("count", Err(StoreError::Transport("down".into())), 0),
            0
        );
    }
}
