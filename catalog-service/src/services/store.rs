//! Document store abstraction.
//!
//! Handlers never talk to MongoDB directly: they go through a
//! [`DocumentStore`] handle constructed at startup and injected via state.
//! [`MemoryStore`] implements the same contract in process.

use crate::query::FilterTree;
use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::{doc, Bson, Document};
use service_core::error::AppError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A single-row partial update: `$set` the given fields, `$unset` the listed ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    pub set: Document,
    pub unset: Vec<String>,
}

impl UpdateSpec {
    pub fn to_document(&self) -> Document {
        let mut update = Document::new();
        if !self.set.is_empty() {
            update.insert("$set", self.set.clone());
        }
        if !self.unset.is_empty() {
            let fields: Document = self
                .unset
                .iter()
                .map(|f| (f.clone(), Bson::String(String::new())))
                .collect();
            update.insert("$unset", fields);
        }
        update
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_many(
        &self,
        collection: &str,
        filter: Option<&FilterTree>,
    ) -> Result<Vec<Document>, AppError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &FilterTree,
    ) -> Result<Option<Document>, AppError>;

    /// Apply `update` to the first matching row and return it as updated,
    /// or `None` when nothing matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &FilterTree,
        update: &UpdateSpec,
    ) -> Result<Option<Document>, AppError>;

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// In-process store with MongoDB-compatible filter semantics.
///
/// Rows keep insertion order. Every accepted `update_one` is counted.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of updates that matched a row.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

fn set_path(row: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            row.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(row.get(head), Some(Bson::Document(_))) {
                row.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = row.get_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

fn unset_path(row: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            row.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = row.get_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_many(
        &self,
        collection: &str,
        filter: Option<&FilterTree>,
    ) -> Result<Vec<Document>, AppError> {
        let rows = match self.collections.get(collection) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        Ok(rows
            .iter()
            .filter(|row| filter.map_or(true, |f| f.matches(row)))
            .cloned()
            .collect())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &FilterTree,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|rows| rows.iter().find(|row| filter.matches(row)).cloned()))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &FilterTree,
        update: &UpdateSpec,
    ) -> Result<Option<Document>, AppError> {
        let mut rows = match self.collections.get_mut(collection) {
            Some(rows) => rows,
            None => return Ok(None),
        };
        let row = match rows.iter_mut().find(|row| filter.matches(row)) {
            Some(row) => row,
            None => return Ok(None),
        };

        for (field, value) in update.set.iter() {
            set_path(row, field, value.clone());
        }
        for field in &update.unset {
            unset_path(row, field);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(Some(row.clone()))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), AppError> {
        let mut rows = self.collections.entry(collection.to_string()).or_default();
        if let Some(id) = document.get("_id") {
            if rows.iter().any(|row| row.get("_id") == Some(id)) {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "duplicate key {} in {}",
                    id,
                    collection
                )));
            }
        }
        rows.push(document);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
