//! Pagination over a document store collection.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{PageQuery, PageSource, Projection};
use crate::document::{apply_projection, Collection, DocumentError, DocumentStore, Filter, ID_FIELD};

/// A reference field that can be replaced by the documents it points at.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub path: String,
    pub collection: String,
    pub select: Option<Projection>,
}

impl Relation {
    pub fn new(name: &str, collection: &str) -> Self {
        Self {
            name: name.to_string(),
            path: name.to_string(),
            collection: collection.to_string(),
            select: None,
        }
    }

    pub fn select(mut self, projection: Projection) -> Self {
        self.select = Some(projection);
        self
    }
}

pub struct DocumentSource<T> {
    store: DocumentStore,
    collection: Collection,
    relations: Vec<Relation>,
    _item: PhantomData<fn() -> T>,
}

impl<T> DocumentSource<T> {
    pub fn new(store: &DocumentStore, collection: &str) -> Self {
        Self {
            store: store.clone(),
            collection: store.collection(collection),
            relations: Vec::new(),
            _item: PhantomData,
        }
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    fn expand(&self, doc: &mut Value, requested: &[String]) {
        let Value::Object(map) = doc else {
            return;
        };
        for relation in self.relations.iter().filter(|r| requested.contains(&r.name)) {
            let Some(reference) = map.get(&relation.path).cloned() else {
                continue;
            };
            let target = self.store.collection(&relation.collection);
            let resolve = |id: &Value| -> Option<Value> {
                let found = target.find_by_id(id.as_str()?)?;
                Some(match &relation.select {
                    Some(projection) => apply_projection(found, projection),
                    None => found,
                })
            };
            let populated = match &reference {
                Value::Array(ids) => Value::Array(ids.iter().filter_map(resolve).collect()),
                Value::Null => Value::Null,
                id => resolve(id).unwrap_or(Value::Null),
            };
            map.insert(relation.path.clone(), populated);
        }
    }
}

#[async_trait]
impl<T> PageSource for DocumentSource<T>
where
    T: DeserializeOwned + Send,
{
    type Item = T;
    type Filter = Filter;
    type Error = DocumentError;

    fn identity_field(&self) -> &str {
        ID_FIELD
    }

    async fn fetch(&self, query: &PageQuery<'_, Filter>) -> Result<Vec<T>, DocumentError> {
        let docs = self
            .collection
            .find(query.filter, Some(query.sort), query.offset, Some(query.limit));

        docs.into_iter()
            .map(|mut doc| {
                self.expand(&mut doc, query.relations);
                let doc = match query.projection {
                    Some(projection) => apply_projection(doc, projection),
                    None => doc,
                };
                serde_json::from_value(doc).map_err(DocumentError::from)
            })
            .collect()
    }

    async fn count(&self, filter: &Filter, _relations: &[String]) -> Result<u64, DocumentError> {
        Ok(self.collection.count(filter))
    }
}
