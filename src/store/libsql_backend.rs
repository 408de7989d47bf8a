//! libSQL backend for the async `ProfileStore` implementation.
//!
//! Profiles are stored as JSON documents keyed by identity. Supports local
//! file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::profile::Profile;
use crate::store::migrations;
use crate::store::traits::{ProfileStore, decode, encode, not_found};

/// libSQL profile store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlProfileStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlProfileStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    async fn load(&self, identity: &str) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT data FROM profiles WHERE identity = ?1",
                params![identity],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_profile: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }
}

#[async_trait]
impl ProfileStore for LibSqlProfileStore {
    async fn exists(&self, identity: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM profiles WHERE identity = ?1",
                params![identity],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("profile_exists: {e}")))?;

        match rows.next().await {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(DatabaseError::Query(format!("profile_exists: {e}"))),
        }
    }

    async fn get(&self, identity: &str) -> Result<Profile, DatabaseError> {
        let data = self.load(identity).await?.ok_or_else(|| not_found(identity))?;
        decode(identity, &data)
    }

    async fn put(&self, identity: &str, profile: &Profile) -> Result<(), DatabaseError> {
        let data = encode(profile)?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO profiles (identity, data, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (identity) DO UPDATE SET data = ?2, updated_at = ?3",
                params![identity, data, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("put_profile: {e}")))?;

        debug!(identity, "Profile saved");
        Ok(())
    }
}
