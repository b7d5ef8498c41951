//! In-process coordination store.

use super::{CoordinationStore, StackRecord};
use crate::error::Result;
use crate::models::StackKey;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// [`CoordinationStore`] backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryCoordinationStore {
    records: DashMap<StackKey, StackRecord>,
}

impl InMemoryCoordinationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn put(&self, key: &StackKey, record: StackRecord) -> Result<()> {
        debug!(
            stack_key = %key,
            client_request_token = %record.client_request_token,
            "Writing stack record"
        );
        self.records.insert(key.clone(), record);
        Ok(())
    }

    async fn get(&self, key: &StackKey) -> Result<Option<StackRecord>> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &StackKey) -> Result<()> {
        debug!(stack_key = %key, "Deleting stack record");
        self.records.remove(key);
        Ok(())
    }
}
