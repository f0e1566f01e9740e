//! Turns a target request into the concrete set of rooms a batch applies to.

use std::collections::HashSet;
use std::sync::Arc;

use ingest_core::models::{TargetId, TargetScope};
use ingest_core::{IngestError, IngestResult, ValidationError};

use crate::store::TargetStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRequest {
    Single(TargetId),
    /// An explicit selection wins over the category filter when both are given.
    Bulk {
        selected: Vec<TargetId>,
        category: Option<String>,
    },
}

#[derive(Clone)]
pub struct TargetResolver {
    store: Arc<dyn TargetStore>,
}

impl TargetResolver {
    pub fn new(store: Arc<dyn TargetStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, request: &TargetRequest) -> IngestResult<TargetScope> {
        match request {
            TargetRequest::Single(id) => {
                let found = self.store.get(id).await.map_err(store_error)?;
                if found.is_none() {
                    return Err(ValidationError::UnknownTarget(*id).into());
                }
                Ok(TargetScope::Single(*id))
            }
            TargetRequest::Bulk { selected, category } => {
                let rooms = self.store.list().await.map_err(store_error)?;

                let ids: Vec<TargetId> = if !selected.is_empty() {
                    let known: HashSet<TargetId> = rooms.iter().map(|r| r.id).collect();
                    let mut seen = HashSet::new();
                    let mut ids = Vec::with_capacity(selected.len());
                    for id in selected {
                        if !known.contains(id) {
                            return Err(ValidationError::UnknownTarget(*id).into());
                        }
                        if seen.insert(*id) {
                            ids.push(*id);
                        }
                    }
                    ids
                } else {
                    match category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                        Some(category) => rooms
                            .iter()
                            .filter(|r| r.matches_category(category))
                            .map(|r| r.id)
                            .collect(),
                        None => Vec::new(),
                    }
                };

                if ids.is_empty() {
                    return Err(ValidationError::NoTargets.into());
                }
                tracing::debug!(target_count = ids.len(), "Resolved bulk targets");
                Ok(TargetScope::Bulk(ids))
            }
        }
    }
}

fn store_error(e: anyhow::Error) -> IngestError {
    IngestError::Internal(format!("Failed to load rooms: {:#}", e))
}
