//! Table layout of the catalog
//!
//! The remote store owns the real schema; this description is what the local
//! SQLite backend creates and what both backends validate column names against.

/// A catalog table
#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    /// Generated identifier column, if the table has one
    pub key: Option<&'static str>,
    pub columns: &'static [&'static str],
    /// Whether `created_at` is filled in by the store
    pub timestamped: bool,
    pub ddl: &'static str,
}

impl TableDef {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

pub const USERS: TableDef = TableDef {
    name: "users",
    key: Some("user_id"),
    columns: &["user_id", "username", "email", "password_hash", "role", "created_at"],
    timestamped: true,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT,
            role TEXT NOT NULL DEFAULT 'User' CHECK (role IN ('User', 'Admin')),
            created_at TEXT NOT NULL
        );
        "#,
};

pub const MOODS: TableDef = TableDef {
    name: "moods",
    key: Some("mood_id"),
    columns: &["mood_id", "mood_name", "description", "user_id", "created_at"],
    timestamped: true,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS moods (
            mood_id TEXT PRIMARY KEY,
            mood_name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            user_id TEXT REFERENCES users(user_id) ON DELETE SET NULL ON UPDATE CASCADE,
            created_at TEXT NOT NULL
        );
        "#,
};

pub const PLAYLISTS: TableDef = TableDef {
    name: "playlists",
    key: Some("playlist_id"),
    columns: &["playlist_id", "name", "description", "user_id", "mood_id", "created_at"],
    timestamped: true,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS playlists (
            playlist_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE ON UPDATE CASCADE,
            mood_id TEXT REFERENCES moods(mood_id) ON DELETE SET NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_playlists_user_id ON playlists(user_id);
        CREATE INDEX IF NOT EXISTS idx_playlists_mood_id ON playlists(mood_id);
        "#,
};

pub const ARTISTS: TableDef = TableDef {
    name: "artists",
    key: Some("artist_id"),
    columns: &["artist_id", "name", "description", "user_id", "created_at"],
    timestamped: true,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS artists (
            artist_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            user_id TEXT REFERENCES users(user_id) ON DELETE SET NULL ON UPDATE CASCADE,
            created_at TEXT NOT NULL
        );
        "#,
};

pub const SONGS: TableDef = TableDef {
    name: "songs",
    key: Some("song_id"),
    columns: &["song_id", "title", "duration", "artist_id", "genre_id", "created_at"],
    timestamped: true,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS songs (
            song_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            duration INTEGER,
            artist_id TEXT REFERENCES artists(artist_id) ON DELETE SET NULL,
            genre_id TEXT,
            created_at TEXT NOT NULL
        );
        "#,
};

pub const PLAYLIST_SONGS: TableDef = TableDef {
    name: "playlist_songs",
    key: None,
    columns: &["playlist_id", "song_id"],
    timestamped: false,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS playlist_songs (
            playlist_id TEXT NOT NULL REFERENCES playlists(playlist_id) ON DELETE CASCADE,
            song_id TEXT NOT NULL REFERENCES songs(song_id) ON DELETE CASCADE,
            UNIQUE (playlist_id, song_id)
        );
        CREATE INDEX IF NOT EXISTS idx_playlist_songs_song_id ON playlist_songs(song_id);
        "#,
};

/// Sign-in credentials for the local identity provider
pub const CREDENTIALS: TableDef = TableDef {
    name: "credentials",
    key: Some("id"),
    columns: &["id", "email", "password_hash", "created_at"],
    timestamped: true,
    ddl: r#"
        CREATE TABLE IF NOT EXISTS credentials (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
};

/// Tables in creation order (referenced tables first)
pub const TABLES: &[&TableDef] = &[
    &USERS,
    &MOODS,
    &PLAYLISTS,
    &ARTISTS,
    &SONGS,
    &PLAYLIST_SONGS,
    &CREDENTIALS,
];

/// Named aggregate calls
pub const COUNT_USERS_BY_ROLE: &str = "count_users_by_role";
pub const COUNT_PLAYLISTS_BY_MOOD: &str = "count_playlists_by_mood";

/// Look up a table by name
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().copied().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        assert_eq!(table("playlists").map(|t| t.name), Some("playlists"));
        assert!(table("tracks").is_none());
    }

    #[test]
    fn test_keys_are_columns() {
        for def in TABLES {
            if let Some(key) = def.key {
                assert!(def.has_column(key), "{} lacks its key column", def.name);
            }
            if def.timestamped {
                assert!(def.has_column("created_at"));
            }
        }
    }
}
