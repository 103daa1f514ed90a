//! Storage contracts consumed by the repository and the connection monitor.
//!
//! A client hands out collections. Filters are always passed explicitly:
//! `Filter::all()` stands in for "no filter".

mod options;
mod outcome;
mod update;

pub use options::{FindOptions, Projection};
pub use outcome::{DeleteOutcome, ReplaceOutcome, UpdateOutcome};
pub use update::{UpdateOp, UpdateSpec};

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use common::{ClientSettings, StoreResult};
use domain::EntityId;
use query::{Document, Filter};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// One named collection of documents.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Collection name
    fn name(&self) -> String;

    /// Matching documents, ordered and windowed by `options`
    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<Document>>;

    async fn count(&self, filter: &Filter) -> StoreResult<u64>;

    /// Insert one document, assigning `_id` when absent
    async fn insert_one(&self, document: Document) -> StoreResult<EntityId>;

    /// Insert a batch; ids are returned in input order
    async fn insert_many(&self, documents: Vec<Document>) -> StoreResult<Vec<EntityId>>;

    /// Replace the first matching document wholesale, keeping its `_id`
    async fn replace_one(&self, filter: &Filter, replacement: Document)
        -> StoreResult<ReplaceOutcome>;

    /// Apply a partial update to every matching document
    async fn update_many(&self, filter: &Filter, update: &UpdateSpec)
        -> StoreResult<UpdateOutcome>;

    async fn delete_many(&self, filter: &Filter) -> StoreResult<DeleteOutcome>;
}

/// A live connection to a store.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Unique per constructed client; a reconnect yields a new id
    fn client_id(&self) -> Uuid;

    /// Settings sufficient to build an equivalent client
    fn settings(&self) -> ClientSettings;

    /// Administrative liveness probe
    async fn ping(&self) -> StoreResult<()>;

    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection>;

    /// Build a brand-new client from this client's settings.
    ///
    /// Construction does not verify connectivity.
    async fn reconnect(&self) -> StoreResult<Arc<dyn StoreClient>>;
}
