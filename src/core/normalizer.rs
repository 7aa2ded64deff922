//! Operation normalizer
//!
//! Playlist operations are resolved against whatever data-access object is at
//! hand: a list of candidate method invocations is tried most likely first,
//! and when none of them answers, the operation runs directly against the
//! store's tables. Callers always get a plain value back, never an error.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::schema::{PLAYLISTS, PLAYLIST_SONGS, SONGS};
use crate::db::{
    from_record, in_link_order, to_record, Filter, PlaylistSongTable, PlaylistTable, Query,
    Record, SharedStore, StoreError,
};
use crate::models::{NewPlaylist, Playlist, PlaylistUpdate, Song};

/// Arguments of one invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    Positional(Vec<Value>),
    /// a single attribute map
    Payload(Record),
}

impl Args {
    pub fn none() -> Self {
        Args::Positional(Vec::new())
    }

    fn positional(&self) -> Result<&[Value], CallError> {
        match self {
            Args::Positional(values) => Ok(values),
            Args::Payload(_) => Err(CallError::Shape("expected positional arguments".into())),
        }
    }
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("no such method")]
    Missing,
    /// the method exists but does not take arguments of this shape
    #[error("argument mismatch: {0}")]
    Shape(String),
    #[error("{0}")]
    Failed(String),
}

/// Invoke data-access methods by name
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn call(&self, method: &str, args: &Args) -> Result<Value, CallError>;
}

/// One candidate invocation
#[derive(Debug, Clone)]
pub struct Candidate {
    pub method: &'static str,
    pub args: Args,
    /// shape retried once when `args` is refused
    pub reduced: Option<Args>,
}

impl Candidate {
    pub fn new(method: &'static str, args: Args) -> Self {
        Self {
            method,
            args,
            reduced: None,
        }
    }

    pub fn positional(method: &'static str, args: Vec<Value>) -> Self {
        Self::new(method, Args::Positional(args))
    }

    pub fn or_bare(mut self) -> Self {
        self.reduced = Some(Args::none());
        self
    }
}

/// What counts as an answer for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// one record; an empty array is no answer
    Record,
    /// any array, even empty, is an answer
    Listing,
    /// `true`, a record or a non-empty array confirms; `false` is no answer
    Confirmation,
}

/// Normalize a raw return value, `None` meaning "try the next candidate"
pub fn normalize(value: Value, expect: Expect) -> Option<Value> {
    match (expect, value) {
        (_, Value::Null) => None,
        (Expect::Record, Value::Array(rows)) => rows.into_iter().next().filter(Value::is_object),
        (Expect::Record, row @ Value::Object(_)) => Some(row),
        (Expect::Record, _) => None,
        (Expect::Listing, rows @ Value::Array(_)) => Some(rows),
        (Expect::Listing, row @ Value::Object(_)) => Some(Value::Array(vec![row])),
        (Expect::Listing, _) => None,
        (Expect::Confirmation, Value::Bool(true)) => Some(Value::Bool(true)),
        (Expect::Confirmation, Value::Bool(false)) => None,
        (Expect::Confirmation, Value::Array(rows)) if rows.is_empty() => None,
        (Expect::Confirmation, _) => Some(Value::Bool(true)),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            debug!("Discarding undecodable answer: {}", err);
            None
        }
    }
}

fn text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

/// Playlist operations resolved over candidate methods with a store fallback
pub struct Normalizer {
    store: SharedStore,
}

impl Normalizer {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn first_answer(
        &self,
        attempts: Vec<(&dyn Dispatch, Candidate)>,
        expect: Expect,
    ) -> Option<Value> {
        for (target, candidate) in attempts {
            let outcome = match target.call(candidate.method, &candidate.args).await {
                Err(CallError::Shape(reason)) => match &candidate.reduced {
                    Some(reduced) => {
                        debug!(
                            "{} refused its arguments ({}), retrying reduced",
                            candidate.method, reason
                        );
                        target.call(candidate.method, reduced).await
                    }
                    None => Err(CallError::Shape(reason)),
                },
                other => other,
            };

            match outcome {
                Ok(value) => {
                    if let Some(answer) = normalize(value, expect) {
                        return Some(answer);
                    }
                }
                Err(CallError::Missing) => {}
                Err(err) => debug!("Candidate {} failed: {}", candidate.method, err),
            }
        }
        None
    }

    fn settle<T>(&self, operation: &str, result: Result<T, StoreError>, empty: T) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                warn!("Fallback {} failed: {}", operation, err);
                empty
            }
        }
    }

    pub async fn create_playlist(
        &self,
        target: &dyn Dispatch,
        user_id: &str,
        name: &str,
        description: &str,
        mood_id: Option<&str>,
    ) -> Option<Playlist> {
        let payload = json!({
            "playlist_id": uuid::Uuid::new_v4().to_string(),
            "user_id": user_id,
            "playlist_name": name,
            "description": description,
            "mood_id": mood_id,
            "created_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        });
        let payload = match payload {
            Value::Object(map) => map,
            _ => Record::new(),
        };

        let candidates = vec![
            Candidate::positional(
                "create_playlist",
                vec![user_id.into(), name.into(), description.into(), text(mood_id)],
            ),
            Candidate::positional(
                "create_playlist",
                vec![name.into(), description.into(), text(mood_id), user_id.into()],
            ),
            Candidate::positional(
                "create_playlist",
                vec![name.into(), description.into(), text(mood_id)],
            ),
            Candidate::new("create_playlist", Args::Payload(payload)),
        ];
        let attempts = candidates.into_iter().map(|c| (target, c)).collect();

        if let Some(created) = self.first_answer(attempts, Expect::Record).await.and_then(decode) {
            return Some(created);
        }

        let playlist = NewPlaylist::new(user_id, name)
            .describe(description)
            .with_mood(mood_id);
        if let Err(err) = playlist.validate() {
            warn!("Refusing to create playlist: {}", err);
            return None;
        }
        self.settle("create playlist", self.insert_playlist(&playlist).await, None)
    }

    async fn insert_playlist(&self, playlist: &NewPlaylist) -> Result<Option<Playlist>, StoreError> {
        let mut record = to_record(playlist)?;
        record.insert("playlist_id".into(), uuid::Uuid::new_v4().to_string().into());
        let rows = self.store.insert(PLAYLISTS.name, record).await?;
        rows.into_iter().next().map(from_record).transpose()
    }

    pub async fn update_playlist(
        &self,
        target: &dyn Dispatch,
        playlist_id: &str,
        changes: &PlaylistUpdate,
    ) -> bool {
        if changes.is_empty() {
            return false;
        }

        let name = text(changes.name.as_deref());
        let description = text(changes.description.as_deref());
        let mood_id = text(changes.mood_id.as_deref());

        let candidates = vec![
            Candidate::positional(
                "update_playlist",
                vec![playlist_id.into(), name.clone(), description.clone(), mood_id.clone()],
            ),
            Candidate::positional(
                "update_playlist",
                vec![
                    playlist_id.into(),
                    json!({ "playlist_name": name, "description": description, "mood_id": mood_id }),
                ],
            ),
            Candidate::positional("update_playlist", vec![playlist_id.into(), name.clone()]),
            Candidate::positional(
                "update_playlist",
                vec![playlist_id.into(), json!({ "playlist_name": name })],
            ),
        ];
        let attempts = candidates.into_iter().map(|c| (target, c)).collect();

        if self.first_answer(attempts, Expect::Confirmation).await.is_some() {
            return true;
        }

        let result = match to_record(changes) {
            Ok(record) => self
                .store
                .update(PLAYLISTS.name, record, &[Filter::eq("playlist_id", playlist_id)])
                .await
                .map(|rows| !rows.is_empty()),
            Err(err) => Err(err),
        };
        self.settle("update playlist", result, false)
    }

    pub async fn delete_playlist(
        &self,
        target: &dyn Dispatch,
        playlist_id: &str,
        user_id: Option<&str>,
    ) -> bool {
        let candidates = vec![
            Candidate::positional("delete_playlist", vec![playlist_id.into()]),
            Candidate::positional("delete_playlist", vec![playlist_id.into(), text(user_id)]),
            Candidate::positional("delete_playlist_by_id", vec![playlist_id.into()]),
        ];
        let attempts = candidates.into_iter().map(|c| (target, c)).collect();

        if self.first_answer(attempts, Expect::Confirmation).await.is_some() {
            return true;
        }

        let result = self
            .store
            .delete(PLAYLISTS.name, &[Filter::eq("playlist_id", playlist_id)])
            .await
            .map(|rows| !rows.is_empty());
        self.settle("delete playlist", result, false)
    }

    pub async fn list_playlists_for_user(&self, target: &dyn Dispatch, user_id: &str) -> Vec<Playlist> {
        let candidates = vec![
            Candidate::positional("list_playlists_by_user", vec![user_id.into()]).or_bare(),
            Candidate::positional("get_playlists_by_user", vec![user_id.into()]).or_bare(),
            Candidate::positional("list_playlists", vec![user_id.into()]).or_bare(),
            Candidate::positional("list_playlists", vec![]),
            Candidate::positional("get_playlists", vec![user_id.into()]).or_bare(),
            Candidate::positional("get_playlists", vec![]),
        ];
        let attempts = candidates.into_iter().map(|c| (target, c)).collect();

        if let Some(listed) = self.first_answer(attempts, Expect::Listing).await.and_then(decode) {
            return listed;
        }

        let query = Query::all().eq("user_id", user_id).order("created_at");
        let result = match self.store.select(PLAYLISTS.name, &query).await {
            Ok(rows) => rows.into_iter().map(from_record).collect(),
            Err(err) => Err(err),
        };
        self.settle("list playlists", result, Vec::new())
    }

    pub async fn add_song_to_playlist(
        &self,
        target: &dyn Dispatch,
        playlist_id: &str,
        song_id: &str,
    ) -> bool {
        let args = vec![Value::from(playlist_id), Value::from(song_id)];
        let attempts = ["add_song_to_playlist", "add_song", "attach_song"]
            .into_iter()
            .map(|method| (target, Candidate::positional(method, args.clone())))
            .collect();

        if self.first_answer(attempts, Expect::Confirmation).await.is_some() {
            return true;
        }

        let result = self.link(playlist_id, song_id).await;
        self.settle("add song to playlist", result, false)
    }

    async fn link(&self, playlist_id: &str, song_id: &str) -> Result<bool, StoreError> {
        let filters = vec![
            Filter::eq("playlist_id", playlist_id),
            Filter::eq("song_id", song_id),
        ];
        let existing = self
            .store
            .select(
                PLAYLIST_SONGS.name,
                &Query {
                    filters,
                    ..Query::all()
                },
            )
            .await?;
        if !existing.is_empty() {
            return Ok(false);
        }

        let record = to_record(&json!({ "playlist_id": playlist_id, "song_id": song_id }))?;
        Ok(!self.store.insert(PLAYLIST_SONGS.name, record).await?.is_empty())
    }

    pub async fn remove_song_from_playlist(
        &self,
        target: &dyn Dispatch,
        playlist_id: &str,
        song_id: &str,
    ) -> bool {
        let args = vec![Value::from(playlist_id), Value::from(song_id)];
        let attempts = ["remove_song_from_playlist", "remove_song", "detach_song"]
            .into_iter()
            .map(|method| (target, Candidate::positional(method, args.clone())))
            .collect();

        if self.first_answer(attempts, Expect::Confirmation).await.is_some() {
            return true;
        }

        let result = self
            .store
            .delete(
                PLAYLIST_SONGS.name,
                &[
                    Filter::eq("playlist_id", playlist_id),
                    Filter::eq("song_id", song_id),
                ],
            )
            .await
            .map(|rows| !rows.is_empty());
        self.settle("remove song from playlist", result, false)
    }

    /// Songs on a playlist; `links` is asked before `playlists`
    pub async fn songs_in_playlist(
        &self,
        links: &dyn Dispatch,
        playlists: &dyn Dispatch,
        playlist_id: &str,
    ) -> Vec<Song> {
        let args = vec![Value::from(playlist_id)];
        let attempts = vec![
            (links, Candidate::positional("list_songs_in_playlist", args.clone())),
            (links, Candidate::positional("get_songs_in_playlist", args.clone())),
            (playlists, Candidate::positional("get_songs_in_playlist", args.clone())),
            (playlists, Candidate::positional("list_songs_in_playlist", args)),
        ];

        if let Some(songs) = self.first_answer(attempts, Expect::Listing).await.and_then(decode) {
            return songs;
        }

        let result = self.join_songs(playlist_id).await;
        self.settle("list playlist songs", result, Vec::new())
    }

    async fn join_songs(&self, playlist_id: &str) -> Result<Vec<Song>, StoreError> {
        let links = self
            .store
            .select(
                PLAYLIST_SONGS.name,
                &Query::all().columns(&["song_id"]).eq("playlist_id", playlist_id),
            )
            .await?;
        let ids: Vec<String> = links
            .iter()
            .filter_map(|link| link.get("song_id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::all().is_in("song_id", ids.iter().cloned().map(Value::from).collect());
        let songs = self
            .store
            .select(SONGS.name, &query)
            .await?
            .into_iter()
            .map(from_record)
            .collect::<Result<Vec<Song>, _>>()?;
        Ok(in_link_order(songs, &ids, |s| &s.song_id))
    }
}

fn opt_text(args: &[Value], index: usize) -> Result<Option<String>, CallError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CallError::Shape(format!("argument {} is not text: {}", index, other))),
    }
}

fn req_text(args: &[Value], index: usize) -> Result<String, CallError> {
    opt_text(args, index)?.ok_or_else(|| CallError::Shape(format!("argument {} is required", index)))
}

fn arity(args: &[Value], expected: usize) -> Result<(), CallError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CallError::Shape(format!(
            "expected {} arguments, got {}",
            expected,
            args.len()
        )))
    }
}

fn answer<T: serde::Serialize>(value: T) -> Result<Value, CallError> {
    serde_json::to_value(value).map_err(|e| CallError::Failed(e.to_string()))
}

#[async_trait]
impl Dispatch for PlaylistTable {
    async fn call(&self, method: &str, args: &Args) -> Result<Value, CallError> {
        match method {
            "create_playlist" => {
                let playlist = match args {
                    Args::Payload(record) => from_record::<NewPlaylist>(record.clone())
                        .map_err(|e| CallError::Shape(e.to_string()))?,
                    Args::Positional(values) => {
                        arity(values, 4)?;
                        NewPlaylist::new(&req_text(values, 0)?, &req_text(values, 1)?)
                            .describe(&opt_text(values, 2)?.unwrap_or_default())
                            .with_mood(opt_text(values, 3)?.as_deref())
                    }
                };
                answer(self.create(&playlist).await)
            }
            "update_playlist" => {
                let values = args.positional()?;
                arity(values, 4)?;
                let changes = PlaylistUpdate {
                    name: opt_text(values, 1)?,
                    description: opt_text(values, 2)?,
                    mood_id: opt_text(values, 3)?,
                };
                answer(self.update(&req_text(values, 0)?, &changes).await)
            }
            "delete_playlist" => {
                let values = args.positional()?;
                arity(values, 1)?;
                answer(self.delete(&req_text(values, 0)?).await)
            }
            "list_playlists_by_user" => {
                let values = args.positional()?;
                arity(values, 1)?;
                answer(self.list_by_user(&req_text(values, 0)?).await)
            }
            "list_playlists" => {
                arity(args.positional()?, 0)?;
                answer(self.list().await)
            }
            _ => Err(CallError::Missing),
        }
    }
}

#[async_trait]
impl Dispatch for PlaylistSongTable {
    async fn call(&self, method: &str, args: &Args) -> Result<Value, CallError> {
        let values = args.positional()?;
        match method {
            "add_song_to_playlist" => {
                arity(values, 2)?;
                answer(self.add(&req_text(values, 0)?, &req_text(values, 1)?).await)
            }
            "remove_song_from_playlist" => {
                arity(values, 2)?;
                answer(self.remove(&req_text(values, 0)?, &req_text(values, 1)?).await)
            }
            "list_songs_in_playlist" => {
                arity(values, 1)?;
                answer(self.list_songs(&req_text(values, 0)?).await)
            }
            _ => Err(CallError::Missing),
        }
    }
}
