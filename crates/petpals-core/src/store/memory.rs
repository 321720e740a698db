//! In-memory document store

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DocumentStore, Fields, Query, StoredDocument, WriteBatch, WriteOp};
use crate::error::{Error, Result};
use crate::models::RecordId;

/// Kind of store operation, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOp {
    Read,
    Write,
}

type Collections = BTreeMap<String, BTreeMap<RecordId, Fields>>;

#[derive(Debug, Default)]
struct State {
    collections: Collections,
    failing: BTreeSet<(String, StoreOp)>,
}

impl State {
    fn check(&self, collection: &str, op: StoreOp) -> Result<()> {
        if self.failing.contains(&(collection.to_string(), op)) {
            return Err(Error::Unavailable(format!(
                "{op:?} on '{collection}' rejected by the store"
            )));
        }
        Ok(())
    }
}

/// Document store kept entirely in memory.
///
/// Behaves like the hosted store for queries, cursors and batches, and lets
/// tests make reads or writes on a collection fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` touching `collection` fail until restored
    pub async fn fail_collection(&self, collection: &str, op: StoreOp) {
        self.state
            .lock()
            .await
            .failing
            .insert((collection.to_string(), op));
    }

    /// Clear injected failures for `collection`
    pub async fn restore_collection(&self, collection: &str) {
        self.state
            .lock()
            .await
            .failing
            .retain(|(name, _)| name != collection);
    }

    /// Number of documents currently in `collection`
    pub async fn len(&self, collection: &str) -> usize {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn matching(collections: &Collections, query: &Query) -> Vec<StoredDocument> {
        collections
            .get(query.collection_name())
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| StoredDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn apply(collections: &mut Collections, op: WriteOp) -> Result<()> {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
            } => {
                collections.entry(collection).or_default().insert(id, fields);
            }
            WriteOp::Update {
                collection,
                id,
                fields,
            } => {
                let existing = collections
                    .get_mut(&collection)
                    .and_then(|documents| documents.get_mut(&id))
                    .ok_or_else(|| Error::not_found(&collection, &id))?;
                existing.extend(fields);
            }
            WriteOp::Delete { collection, id } => {
                if let Some(documents) = collections.get_mut(&collection) {
                    documents.remove(&id);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn run_query(&self, query: &Query) -> Result<Vec<StoredDocument>> {
        query.validate()?;
        let state = self.state.lock().await;
        state.check(query.collection_name(), StoreOp::Read)?;

        let mut documents = Self::matching(&state.collections, query);
        drop(state);

        documents.retain(|document| query.admits(document));
        documents.sort_by(|a, b| query.order().compare(a, b));
        if let Some(limit) = query.limit_value() {
            documents.truncate(limit);
        }
        Ok(documents)
    }

    async fn count(&self, query: &Query) -> Result<usize> {
        query.validate()?;
        let state = self.state.lock().await;
        state.check(query.collection_name(), StoreOp::Read)?;

        let count = Self::matching(&state.collections, query)
            .iter()
            .filter(|document| query.filter_list().iter().all(|f| f.matches(document)))
            .count();
        Ok(count)
    }

    async fn get(&self, collection: &str, id: &RecordId) -> Result<Option<StoredDocument>> {
        let state = self.state.lock().await;
        state.check(collection, StoreOp::Read)?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| StoredDocument::new(id.clone(), fields.clone())))
    }

    async fn set(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check(collection, StoreOp::Write)?;
        Self::apply(
            &mut state.collections,
            WriteOp::Set {
                collection: collection.to_string(),
                id: id.clone(),
                fields,
            },
        )
    }

    async fn update(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check(collection, StoreOp::Write)?;
        Self::apply(
            &mut state.collections,
            WriteOp::Update {
                collection: collection.to_string(),
                id: id.clone(),
                fields,
            },
        )
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.check(collection, StoreOp::Write)?;
        Ok(state
            .collections
            .get_mut(collection)
            .is_some_and(|documents| documents.remove(id).is_some()))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut state = self.state.lock().await;
        for op in batch.ops() {
            state.check(op.collection(), StoreOp::Write)?;
        }

        // Apply to a copy so a failing write leaves nothing behind.
        let mut staged = state.collections.clone();
        for op in batch.ops().iter().cloned() {
            Self::apply(&mut staged, op)?;
        }
        state.collections = staged;
        Ok(())
    }
}
