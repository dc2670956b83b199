//! Storage layer for ReportVault.
//!
//! This crate provides the backends behind the two storage-layer traits
//! ([`ContentStore`] and [`IndexStore`]), the bounded report cache, the
//! query planner, and the [`ReportStore`] facade that composes them into
//! the public store/get/search/bulk/delete/archive/validate/metrics
//! operations.
//!
//! [`ContentStore`]: reportvault_core::ContentStore
//! [`IndexStore`]: reportvault_core::IndexStore

use reportvault_core::{ReportStoreConfig, Result};
use std::sync::Arc;

pub mod cache;
pub mod derive;
pub mod memory;
pub mod planner;
pub mod sqlite;
pub mod store;

pub use cache::ReportCache;
pub use memory::{InMemoryContentStore, InMemoryIndexStore};
pub use planner::{FetchPath, QueryPlan, QueryPlanner, ResidualFilter};
pub use sqlite::{SqliteContentStore, SqliteIndexStore};
pub use store::ReportStore;

/// Which backend pair a [`ReportStore`] is built over.
///
/// `Memory` is for tests and local development; `Sqlite` is the durable
/// profile, with both stores sharing one connection pool.
pub enum StorageProfile {
    /// In-memory backends; all data is lost on drop.
    Memory,
    /// SQLite backends sharing a single pool.
    Sqlite {
        /// Connection string, e.g. `sqlite://reportvault.db` or
        /// `sqlite::memory:`.
        database_url: String,
    },
}

impl StorageProfile {
    /// Build a ready-to-use [`ReportStore`] for this profile.
    pub async fn build(self, config: ReportStoreConfig) -> Result<ReportStore> {
        match self {
            Self::Memory => Ok(ReportStore::new(
                Arc::new(InMemoryContentStore::new()),
                Arc::new(InMemoryIndexStore::new()),
                config,
            )),
            Self::Sqlite { database_url } => {
                let pool = sqlite::open_pool(&database_url).await?;
                let content = SqliteContentStore::from_pool(pool.clone()).await?;
                let index = SqliteIndexStore::from_pool(pool).await?;
                Ok(ReportStore::new(
                    Arc::new(content),
                    Arc::new(index),
                    config,
                ))
            }
        }
    }
}
