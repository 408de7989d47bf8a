//! `ProfileStore` trait: async key-value interface for profile persistence.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::profile::Profile;

/// Entity name used in `DatabaseError::NotFound`.
pub const PROFILE_ENTITY: &str = "profile";

/// Backend-agnostic profile persistence, keyed by identity.
///
/// There is no in-process locking: concurrent writers to the same identity
/// resolve as last-write-wins at the backend.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Whether a profile is stored under `identity`.
    async fn exists(&self, identity: &str) -> Result<bool, DatabaseError>;

    /// Load a profile. Missing records are `DatabaseError::NotFound`.
    async fn get(&self, identity: &str) -> Result<Profile, DatabaseError>;

    /// Insert or replace the profile stored under `identity`.
    async fn put(&self, identity: &str, profile: &Profile) -> Result<(), DatabaseError>;
}

pub(crate) fn not_found(identity: &str) -> DatabaseError {
    DatabaseError::NotFound {
        entity: PROFILE_ENTITY.to_string(),
        id: identity.to_string(),
    }
}

pub(crate) fn encode(profile: &Profile) -> Result<String, DatabaseError> {
    serde_json::to_string(profile).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

pub(crate) fn decode(identity: &str, data: &str) -> Result<Profile, DatabaseError> {
    serde_json::from_str(data).map_err(|e| {
        DatabaseError::Serialization(format!("corrupt profile record for {identity}: {e}"))
    })
}
