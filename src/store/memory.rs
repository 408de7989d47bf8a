//! In-memory profile store for tests and throwaway runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::profile::Profile;
use crate::store::traits::{ProfileStore, decode, encode, not_found};

/// Keeps encoded profiles in a map, so reads go through the same JSON
/// decoding as the libSQL backend.
#[derive(Default)]
pub struct MemoryProfileStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn exists(&self, identity: &str) -> Result<bool, DatabaseError> {
        Ok(self.records.read().await.contains_key(identity))
    }

    async fn get(&self, identity: &str) -> Result<Profile, DatabaseError> {
        let records = self.records.read().await;
        let data = records.get(identity).ok_or_else(|| not_found(identity))?;
        decode(identity, data)
    }

    async fn put(&self, identity: &str, profile: &Profile) -> Result<(), DatabaseError> {
        let data = encode(profile)?;
        self.records.write().await.insert(identity.to_string(), data);
        Ok(())
    }
}
