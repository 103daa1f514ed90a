//! In-memory store client.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use common::{ClientSettings, StoreResult};

use super::collection::MemoryCollection;
use super::server::MemoryServer;
use crate::store::{DocumentCollection, StoreClient};

/// Client for a [`MemoryServer`], built purely from [`ClientSettings`].
#[derive(Debug)]
pub struct MemoryClient {
    id: Uuid,
    settings: ClientSettings,
    server: Arc<MemoryServer>,
}

impl MemoryClient {
    /// Connect to the server named by `settings.url` (`memory://<name>`).
    ///
    /// Like a real driver, construction does not contact the server.
    pub fn connect(settings: ClientSettings) -> StoreResult<Self> {
        let server = MemoryServer::lookup(&settings.url)?;
        server.register_connection();
        let client = Self {
            id: Uuid::new_v4(),
            settings,
            server,
        };
        tracing::debug!(
            client_id = %client.id,
            server = client.server.name(),
            app_name = %client.settings.app_name,
            "Memory client created"
        );
        Ok(client)
    }

    pub fn server(&self) -> &Arc<MemoryServer> {
        &self.server
    }
}

#[async_trait]
impl StoreClient for MemoryClient {
    fn client_id(&self) -> Uuid {
        self.id
    }

    fn settings(&self) -> ClientSettings {
        self.settings.clone()
    }

    async fn ping(&self) -> StoreResult<()> {
        let delay = self.server.ping_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.server.check_available()
    }

    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection> {
        let data = self.server.collection(database, name);
        Arc::new(MemoryCollection::new(Arc::clone(&self.server), name, data))
    }

    async fn reconnect(&self) -> StoreResult<Arc<dyn StoreClient>> {
        let fresh = MemoryClient::connect(self.settings())?;
        Ok(Arc::new(fresh))
    }
}
