//! Shared, replaceable client handle.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use common::{StoreError, StoreResult};

use crate::store::StoreClient;

static GLOBAL: Lazy<ClientHandle> = Lazy::new(ClientHandle::new);

/// A cloneable slot holding the current store client.
///
/// All clones share one slot. The connection monitor replaces the client
/// wholesale; readers see either the old or the new client. Repositories
/// resolve their collection once, at construction, and keep using it after
/// a replacement.
#[derive(Clone, Default)]
pub struct ClientHandle {
    slot: Arc<RwLock<Option<Arc<dyn StoreClient>>>>,
}

impl ClientHandle {
    /// Create an empty handle
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Arc<dyn StoreClient>) -> Self {
        let handle = Self::new();
        handle.set(client);
        handle
    }

    /// The process-wide handle
    pub fn global() -> ClientHandle {
        GLOBAL.clone()
    }

    /// Install `client`, returning the one it replaced.
    pub fn set(&self, client: Arc<dyn StoreClient>) -> Option<Arc<dyn StoreClient>> {
        self.slot.write().replace(client)
    }

    pub fn clear(&self) -> Option<Arc<dyn StoreClient>> {
        self.slot.write().take()
    }

    pub fn current(&self) -> Option<Arc<dyn StoreClient>> {
        self.slot.read().clone()
    }

    /// The current client, or a configuration error when none was set.
    pub fn require(&self) -> StoreResult<Arc<dyn StoreClient>> {
        self.current().ok_or_else(|| {
            StoreError::configuration("no store client has been set on the client handle")
        })
    }

    pub fn is_set(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Whether both handles share one slot
    pub fn same_slot(&self, other: &ClientHandle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("client_id", &self.current().map(|c| c.client_id()))
            .finish()
    }
}
