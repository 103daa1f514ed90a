//! Named in-process servers.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

use common::constants::MEMORY_URL_SCHEME;
use common::{StoreError, StoreResult};
use domain::EntityId;
use query::Document;

static SERVERS: Lazy<Mutex<HashMap<String, Arc<MemoryServer>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Documents of one collection, in insertion order, with an `_id` index.
#[derive(Debug, Default)]
pub(crate) struct CollectionData {
    pub(crate) documents: Vec<Document>,
    pub(crate) ids: HashSet<EntityId>,
}

pub(crate) type SharedCollection = Arc<RwLock<CollectionData>>;

/// An in-process document server addressed as `memory://<name>`.
///
/// Every client connected to the same name sees the same data, so a
/// replacement client built from the same settings picks up where the old
/// one left off.
pub struct MemoryServer {
    name: String,
    collections: RwLock<HashMap<(String, String), SharedCollection>>,
    available: AtomicBool,
    ping_delay: Mutex<Duration>,
    connections: AtomicU64,
}

impl MemoryServer {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            ping_delay: Mutex::new(Duration::ZERO),
            connections: AtomicU64::new(0),
        }
    }

    /// Get or create the server registered under `name`.
    pub fn named(name: &str) -> Arc<MemoryServer> {
        SERVERS
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryServer::new(name)))
            .clone()
    }

    /// Resolve a `memory://<name>` URL.
    pub fn lookup(url: &str) -> StoreResult<Arc<MemoryServer>> {
        match url.strip_prefix(MEMORY_URL_SCHEME) {
            Some(name) if !name.is_empty() => Ok(Self::named(name)),
            _ => Err(StoreError::configuration(format!(
                "unsupported store url for the in-memory store (expected {}<name>)",
                MEMORY_URL_SCHEME
            ))),
        }
    }

    /// Drop the registry entry. Existing clients keep their server.
    pub fn remove(name: &str) -> Option<Arc<MemoryServer>> {
        SERVERS.lock().remove(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> String {
        format!("{}{}", MEMORY_URL_SCHEME, self.name)
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Delay every ping by `delay`, e.g. to trip a probe timeout.
    pub fn set_ping_delay(&self, delay: Duration) {
        *self.ping_delay.lock() = delay;
    }

    pub fn ping_delay(&self) -> Duration {
        *self.ping_delay.lock()
    }

    /// Number of clients connected so far
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn drop_database(&self, database: &str) {
        self.collections.write().retain(|(db, _), _| db != database);
    }

    pub(crate) fn register_connection(&self) {
        self.connections.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn check_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::unavailable(format!(
                "memory server '{}' is not reachable",
                self.name
            )))
        }
    }

    pub(crate) fn collection(&self, database: &str, name: &str) -> SharedCollection {
        let key = (database.to_string(), name.to_string());
        if let Some(existing) = self.collections.read().get(&key) {
            return Arc::clone(existing);
        }
        Arc::clone(self.collections.write().entry(key).or_default())
    }
}

impl std::fmt::Debug for MemoryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryServer")
            .field("name", &self.name)
            .field("available", &self.is_available())
            .field("connections", &self.connections())
            .finish()
    }
}
