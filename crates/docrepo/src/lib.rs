//! Generic document repository.
//!
//! This crate provides:
//! - [`Repository`]: CRUD, query, paging, projection and aggregates over one
//!   entity collection, async with cancellation plus blocking twins
//! - [`ClientHandle`]: the shared, replaceable store client
//! - [`ConnectionMonitor`]: background liveness probing and reconnection
//! - [`memory`]: an in-process store implementing the storage contracts
//!
//! ```
//! use docrepo::memory::MemoryClient;
//! use docrepo::{new_query, ClientHandle, ClientSettings, Entity, EntityId, Predicate, Repository};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Lead {
//!     #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
//!     id: Option<EntityId>,
//!     company_id: String,
//! }
//!
//! impl Entity for Lead {}
//!
//! let client = MemoryClient::connect(ClientSettings::new("memory://doc-example")).unwrap();
//! let handle = ClientHandle::with_client(Arc::new(client));
//! let leads = Repository::<Lead>::new(&handle, "crm").unwrap();
//!
//! leads.add_blocking(&Lead { id: None, company_id: "C1".into() }).unwrap();
//!
//! let in_c1 = new_query(Predicate::<Lead>::new(|it| it.field("company_id").eq("C1")));
//! assert_eq!(leads.count_blocking(Some(&in_c1)).unwrap(), 1);
//! ```

pub mod client;
pub mod memory;
pub mod monitor;
pub mod page;
pub mod repository;
pub mod store;

pub use client::ClientHandle;
pub use monitor::{ConnectionMonitor, ConnectionState, MonitorHandle, MonitorState};
pub use page::Page;
pub use repository::Repository;
pub use store::{
    DeleteOutcome, DocumentCollection, FindOptions, Projection, ReplaceOutcome, StoreClient,
    UpdateOp, UpdateOutcome, UpdateSpec,
};

#[cfg(any(test, feature = "test-utils"))]
pub use store::{MockDocumentCollection, MockStoreClient};

pub use common::{ClientSettings, MonitorConfig, StoreConfig, StoreError, StoreResult};
pub use domain::{Entity, EntityId};
pub use query::{and, new_query, or, Filter, Predicate, Sort, SortDirection};
pub use tokio_util::sync::CancellationToken;
