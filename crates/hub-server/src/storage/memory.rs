//! In-memory document store used when the database is unreachable
//!
//! Nothing here survives a restart.

use super::{Collection, Document, DocumentStore, Filter, PersistenceError, UpsertOutcome};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

/// Matching behaviour of the in-memory store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    /// Real filtering, upsert-by-key and delete counts
    #[default]
    Filtered,
    /// Filters are ignored: `find` returns everything, `upsert` appends and
    /// `delete` removes nothing and reports zero.
    Legacy,
}

pub struct MemoryStore {
    mode: MemoryMode,
    data: DashMap<Collection, Vec<Document>>,
}

impl MemoryStore {
    pub fn new(mode: MemoryMode) -> Self {
        Self {
            mode,
            data: DashMap::new(),
        }
    }

    /// Number of documents held in a collection
    pub fn len(&self, collection: Collection) -> usize {
        self.data.get(&collection).map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryMode::default())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: Collection, doc: Document) -> Result<(), PersistenceError> {
        self.data.entry(collection).or_default().push(doc);
        Ok(())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, PersistenceError> {
        let Some(docs) = self.data.get(&collection) else {
            return Ok(Vec::new());
        };

        Ok(match self.mode {
            MemoryMode::Filtered => docs.iter().filter(|d| filter.matches(d)).cloned().collect(),
            MemoryMode::Legacy => docs.to_vec(),
        })
    }

    async fn upsert(
        &self,
        collection: Collection,
        key: &Filter,
        doc: Document,
    ) -> Result<UpsertOutcome, PersistenceError> {
        let mut docs = self.data.entry(collection).or_default();

        if self.mode == MemoryMode::Filtered {
            if let Some(existing) = docs.iter_mut().find(|d| key.matches(d)) {
                *existing = doc;
                return Ok(UpsertOutcome::Replaced);
            }
        }

        docs.push(doc);
        Ok(UpsertOutcome::Inserted)
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, PersistenceError> {
        if self.mode == MemoryMode::Legacy {
            return Ok(0);
        }

        let Some(mut docs) = self.data.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }
}
