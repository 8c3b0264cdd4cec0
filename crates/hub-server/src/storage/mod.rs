//! Storage layer
//!
//! Every read and write goes through [`PersistenceGateway`], which is bound once at
//! startup to either the SQLite store or, when that is unreachable, to an
//! in-memory substitute.

pub mod db;
pub mod memory;

pub use db::SqliteStore;
pub use memory::{MemoryMode, MemoryStore};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// A stored record: a JSON object
pub type Document = Map<String, Value>;

/// Logical record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Stations,
    Comments,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Stations => "stations",
            Collection::Comments => "comments",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Invalid filter field: {0}")]
    InvalidFilter(String),
}

/// Conjunction of field equality clauses.
///
/// A `null` clause matches documents where the field is null or missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| doc.get(field).unwrap_or(&Value::Null) == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Capability set shared by the live and in-memory stores
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: Collection, doc: Document) -> Result<(), PersistenceError>;

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, PersistenceError>;

    /// Replace the first document matching `key` with `doc`, or insert it
    async fn upsert(
        &self,
        collection: Collection,
        key: &Filter,
        doc: Document,
    ) -> Result<UpsertOutcome, PersistenceError>;

    /// Remove matching documents, returning how many were removed
    async fn delete(&self, collection: Collection, filter: &Filter)
        -> Result<u64, PersistenceError>;
}

/// Which backend the gateway was bound to at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Connected,
    Degraded,
}

impl StoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMode::Connected => "connected",
            StoreMode::Degraded => "degraded",
        }
    }
}

/// How far a write made it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Applied to the live store
    Durable,
    /// Applied to the in-memory substitute only
    Volatile,
    /// The store rejected the write and the error was swallowed
    NotDurable,
}

impl Durability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Durability::Durable => "durable",
            Durability::Volatile => "volatile",
            Durability::NotDurable => "not-durable",
        }
    }
}

/// A value returned to the caller together with the durability of its write
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<T> {
    pub value: T,
    pub durability: Durability,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub connect_timeout: Duration,
    pub memory_mode: MemoryMode,
}

/// Process-wide persistence handle
pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
    mode: StoreMode,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn DocumentStore>, mode: StoreMode) -> Self {
        Self { store, mode }
    }

    /// Gateway bound to a fresh in-memory store
    pub fn in_memory(memory_mode: MemoryMode) -> Self {
        Self::new(Arc::new(MemoryStore::new(memory_mode)), StoreMode::Degraded)
    }

    /// Connect to the configured store, falling back to memory on any failure.
    ///
    /// Never fails. The choice is final for the lifetime of the gateway.
    pub async fn connect(config: &StoreConfig) -> Self {
        match SqliteStore::connect(&config.database_url, config.connect_timeout).await {
            Ok(store) => {
                info!("Persistence connected: {}", config.database_url);
                Self::new(Arc::new(store), StoreMode::Connected)
            }
            Err(e) => {
                warn!(
                    "Store at {} unreachable ({}), running degraded with {:?} in-memory store",
                    config.database_url, e, config.memory_mode
                );
                Self::in_memory(config.memory_mode)
            }
        }
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    /// Durability of a write that the backing store accepted
    pub fn applied(&self) -> Durability {
        match self.mode {
            StoreMode::Connected => Durability::Durable,
            StoreMode::Degraded => Durability::Volatile,
        }
    }

    pub async fn insert(&self, collection: Collection, doc: Document) -> Result<(), PersistenceError> {
        self.store.insert(collection, doc).await
    }

    pub async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, PersistenceError> {
        self.store.find(collection, filter).await
    }

    pub async fn upsert(
        &self,
        collection: Collection,
        key: &Filter,
        doc: Document,
    ) -> Result<UpsertOutcome, PersistenceError> {
        self.store.upsert(collection, key, doc).await
    }

    pub async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, PersistenceError> {
        self.store.delete(collection, filter).await
    }
}
