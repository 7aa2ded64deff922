//! Test helpers for code that talks to a store

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{Catalog, Filter, Query, Record, SharedStore, SqliteStore, Store, StoreError};

/// Wraps a store and counts every call that reaches it
pub struct CountingStore {
    inner: SharedStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: SharedStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn insert(&self, table: &str, record: Record) -> Result<Vec<Record>, StoreError> {
        self.hit();
        self.inner.insert(table, record).await
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        self.hit();
        self.inner.select(table, query).await
    }

    async fn update(
        &self,
        table: &str,
        changes: Record,
        filters: &[Filter],
    ) -> Result<Vec<Record>, StoreError> {
        self.hit();
        self.inner.update(table, changes, filters).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, StoreError> {
        self.hit();
        self.inner.delete(table, filters).await
    }

    async fn rpc(&self, function: &str) -> Result<Vec<Record>, StoreError> {
        self.hit();
        self.inner.rpc(function).await
    }

    fn for_session(&self, access_token: &str) -> SharedStore {
        self.inner.for_session(access_token)
    }
}

/// A store that fails every call, standing in for an unreachable service
pub struct OfflineStore;

#[async_trait]
impl Store for OfflineStore {
    async fn insert(&self, _table: &str, _record: Record) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }

    async fn select(&self, _table: &str, _query: &Query) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }

    async fn update(
        &self,
        _table: &str,
        _changes: Record,
        _filters: &[Filter],
    ) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }

    async fn delete(&self, _table: &str, _filters: &[Filter]) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }

    async fn rpc(&self, _function: &str) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Transport("connection refused".into()))
    }

    fn for_session(&self, _access_token: &str) -> SharedStore {
        Arc::new(OfflineStore)
    }
}

/// A catalog over a fresh in-memory database
pub async fn memory_catalog() -> Catalog {
    let store = SqliteStore::in_memory().await.expect("in-memory store");
    Catalog::new(Arc::new(store))
}
