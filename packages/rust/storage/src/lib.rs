//! Persistence gateway for the slug→link mapping.
//!
//! The [`LinkStore`] trait is the whole contract the core needs: list,
//! bulk upsert, and lookup by slug. Two backends implement it:
//! - [`FileStore`] — a local flat file holding a JSON array
//! - [`RemoteStore`] — a remote tabular HTTP store addressed by
//!   (base URL, API token, table name)
//!
//! Upsert merge policy is "new value wins", applied per full record keyed
//! by slug.

mod file;
mod remote;

use async_trait::async_trait;

use linkforge_shared::{PersistedLink, Result};

pub use file::FileStore;
pub use remote::RemoteStore;

/// Durable key-value store for link records, keyed by slug.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Fetch all persisted records.
    async fn list(&self) -> Result<Vec<PersistedLink>>;

    /// Insert or overwrite records by slug. Must be a no-op on empty input.
    async fn upsert(&self, records: &[PersistedLink]) -> Result<()>;

    /// Fetch one record by its slug.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<PersistedLink>>;
}
