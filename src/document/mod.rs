//! In-process document store.
//!
//! Collections hold JSON objects keyed by a string `_id`. Reads clone the
//! matching documents out from under a read lock, so a caller never holds the
//! lock across an await point. Every write marks the store dirty for the
//! persistence worker when one is attached; the worker takes its own
//! snapshot, so the last upload always reflects the last write.

pub mod filter;
pub mod path;
pub mod persistence;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

pub use filter::Filter;

use crate::pagination::{Projection, SortDirection, SortSpec};
use path::{compare_values, copy_path, get_path, remove_path};

pub const ID_FIELD: &str = "_id";

pub type Snapshot = BTreeMap<String, Vec<Value>>;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Time-ordered identifier, so identity order is creation order.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

#[derive(Clone, Default)]
pub struct DocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Value>>>>,
    persist_sender: Option<mpsc::Sender<()>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            collections: Arc::new(RwLock::new(snapshot.into_iter().collect())),
            persist_sender: None,
        }
    }

    /// Signals `sender` after every write. See [`persistence::persistence_channel`].
    pub fn with_persistence(mut self, sender: mpsc::Sender<()>) -> Self {
        self.persist_sender = Some(sender);
        self
    }

    /// A handle on the same collections that does not signal the worker.
    pub fn detached(mut self) -> Self {
        self.persist_sender = None;
        self
    }

    pub fn collection(&self, name: &str) -> Collection {
        Collection {
            store: self.clone(),
            name: name.to_string(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.collections
            .read()
            .iter()
            .map(|(name, docs)| (name.clone(), docs.clone()))
            .collect()
    }

    fn mark_dirty(&self) {
        if let Some(sender) = &self.persist_sender {
            match sender.try_send(()) {
                // A signal is already pending and the worker snapshots later.
                Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                Err(mpsc::error::TrySendError::Closed(())) => {
                    log::error!("Document persistence worker is gone; write not persisted");
                }
            }
        }
    }
}

/// Sorts in place by one field, falling back to `_id` for equal keys.
pub fn sort_documents(docs: &mut [Value], sort: &SortSpec) {
    docs.sort_by(|a, b| {
        let ord = compare_values(get_path(a, &sort.field), get_path(b, &sort.field))
            .then_with(|| compare_values(get_path(a, ID_FIELD), get_path(b, ID_FIELD)));
        match sort.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

pub fn apply_projection(doc: Value, projection: &Projection) -> Value {
    match projection {
        Projection::Exclude(paths) => {
            let mut doc = doc;
            for path in paths {
                remove_path(&mut doc, path);
            }
            doc
        }
        Projection::Include(paths) => {
            let mut target = Map::new();
            copy_path(&doc, &mut target, ID_FIELD);
            for path in paths {
                copy_path(&doc, &mut target, path);
            }
            Value::Object(target)
        }
    }
}

#[derive(Clone)]
pub struct Collection {
    store: DocumentStore,
    name: String,
}

impl Collection {
    fn read<R>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        let guard = self.store.collections.read();
        match guard.get(&self.name) {
            Some(docs) => f(docs),
            None => f(&[]),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let result = {
            let mut guard = self.store.collections.write();
            let docs = guard.entry(self.name.clone()).or_default();
            f(docs)
        };
        self.store.mark_dirty();
        result
    }

    pub fn insert<T: Serialize>(&self, item: &T) -> Result<(), DocumentError> {
        let doc = serde_json::to_value(item)?;
        let id = document_id(&doc)?.to_string();
        self.write(|docs| -> Result<(), DocumentError> {
            if docs.iter().any(|d| document_id(d).ok() == Some(id.as_str())) {
                return Err(DocumentError::InvalidDocument(format!("duplicate _id {}", id)));
            }
            docs.push(doc);
            Ok(())
        })
    }

    pub fn find_by_id(&self, id: &str) -> Option<Value> {
        self.read(|docs| docs.iter().find(|d| has_id(d, id)).cloned())
    }

    pub fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, DocumentError> {
        self.find_by_id(id)
            .map(serde_json::from_value)
            .transpose()
            .map_err(DocumentError::from)
    }

    pub fn exists(&self, filter: &Filter) -> bool {
        self.read(|docs| docs.iter().any(|d| filter.matches(d)))
    }

    pub fn find(&self, filter: &Filter, sort: Option<&SortSpec>, skip: u64, limit: Option<u64>) -> Vec<Value> {
        let mut matched: Vec<Value> = self.read(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect());
        if let Some(sort) = sort {
            sort_documents(&mut matched, sort);
        }
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        matched.into_iter().skip(skip).take(limit).collect()
    }

    pub fn find_as<T: DeserializeOwned>(&self, filter: &Filter, sort: Option<&SortSpec>) -> Result<Vec<T>, DocumentError> {
        self.find(filter, sort, 0, None)
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(DocumentError::from))
            .collect()
    }

    pub fn count(&self, filter: &Filter) -> u64 {
        self.read(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
    }

    /// Distinct values of `field` among matching documents, ascending.
    pub fn distinct(&self, field: &str, filter: &Filter) -> Vec<Value> {
        let mut values: Vec<Value> = self.read(|docs| {
            docs.iter()
                .filter(|d| filter.matches(d))
                .map(|d| get_path(d, field).cloned().unwrap_or(Value::Null))
                .collect()
        });
        values.sort_by(|a, b| compare_values(Some(a), Some(b)));
        values.dedup_by(|a, b| compare_values(Some(a), Some(b)) == std::cmp::Ordering::Equal);
        values
    }

    /// Replaces the stored document with the same `_id`. Returns false when
    /// no such document exists.
    pub fn replace<T: Serialize>(&self, item: &T) -> Result<bool, DocumentError> {
        let doc = serde_json::to_value(item)?;
        let id = document_id(&doc)?.to_string();
        Ok(self.write(|docs| match docs.iter_mut().find(|d| has_id(d, &id)) {
            Some(slot) => {
                *slot = doc;
                true
            }
            None => false,
        }))
    }

    /// Read-modify-write of one document under the write lock.
    pub fn update_with<T, F>(&self, id: &str, f: F) -> Result<Option<T>, DocumentError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        self.write(|docs| -> Result<Option<T>, DocumentError> {
            let Some(slot) = docs.iter_mut().find(|d| has_id(d, id)) else {
                return Ok(None);
            };
            let mut item: T = serde_json::from_value(slot.clone())?;
            f(&mut item);
            *slot = serde_json::to_value(&item)?;
            Ok(Some(item))
        })
    }

    pub fn delete(&self, id: &str) -> bool {
        self.write(|docs| {
            let before = docs.len();
            docs.retain(|d| !has_id(d, id));
            docs.len() != before
        })
    }
}

fn document_id(doc: &Value) -> Result<&str, DocumentError> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| DocumentError::InvalidDocument("missing string _id".to_string()))
}

fn has_id(doc: &Value, id: &str) -> bool {
    doc.get(ID_FIELD).and_then(Value::as_str) == Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Note {
        #[serde(rename = "_id")]
        id: String,
        title: String,
        rank: i64,
    }

    fn note(id: &str, title: &str, rank: i64) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            rank,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = DocumentStore::new();
        let notes = store.collection("notes");
        notes.insert(&note("a", "first", 1)).unwrap();

        let found: Option<Note> = notes.get("a").unwrap();
        assert_eq!(found, Some(note("a", "first", 1)));
        assert!(notes.get::<Note>("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let store = DocumentStore::new();
        let notes = store.collection("notes");
        notes.insert(&note("a", "first", 1)).unwrap();
        assert!(notes.insert(&note("a", "again", 2)).is_err());
    }

    #[test]
    fn test_find_sort_skip_limit() {
        let store = DocumentStore::new();
        let notes = store.collection("notes");
        for (id, rank) in [("a", 3), ("b", 1), ("c", 2)] {
            notes.insert(&note(id, id, rank)).unwrap();
        }

        let sort = SortSpec {
            field: "rank".to_string(),
            direction: SortDirection::Ascending,
        };
        let page = notes.find(&Filter::All, Some(&sort), 1, Some(1));
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["_id"], json!("c"));
    }

    #[test]
    fn test_distinct_is_sorted_and_unique() {
        let store = DocumentStore::new();
        let notes = store.collection("notes");
        for (id, rank) in [("a", 3), ("b", 1), ("c", 3)] {
            notes.insert(&note(id, id, rank)).unwrap();
        }
        assert_eq!(notes.distinct("rank", &Filter::All), vec![json!(1), json!(3)]);
    }

    #[test]
    fn test_update_with_and_delete() {
        let store = DocumentStore::new();
        let notes = store.collection("notes");
        notes.insert(&note("a", "first", 1)).unwrap();

        let updated: Option<Note> = notes.update_with("a", |n: &mut Note| n.rank = 9).unwrap();
        assert_eq!(updated.map(|n| n.rank), Some(9));
        assert!(notes.delete("a"));
        assert!(!notes.delete("a"));
        assert_eq!(notes.count(&Filter::All), 0);
    }

    #[test]
    fn test_projection_include_keeps_id() {
        let doc = json!({"_id": "a", "title": "t", "rank": 1});
        let projected = apply_projection(doc, &Projection::Include(vec!["title".to_string()]));
        assert_eq!(projected, json!({"_id": "a", "title": "t"}));
    }

    #[test]
    fn test_writes_coalesce_into_one_dirty_signal() {
        let (tx, mut rx) = persistence::persistence_channel();
        let store = DocumentStore::new().with_persistence(tx);
        let notes = store.collection("notes");
        notes.insert(&note("a", "first", 1)).unwrap();
        notes.insert(&note("b", "second", 2)).unwrap();
        assert!(notes.delete("a"));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert_eq!(store.snapshot()["notes"].len(), 1);
    }

    #[test]
    fn test_detached_store_does_not_signal() {
        let (tx, mut rx) = persistence::persistence_channel();
        let store = DocumentStore::new().with_persistence(tx).detached();
        store.collection("notes").insert(&note("a", "first", 1)).unwrap();

        assert!(rx.try_recv().is_err());
    }
}
