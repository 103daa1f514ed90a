//! Background connection health loop.
//!
//! Probes the current client on a fixed interval. A failed or timed-out
//! probe builds a fresh client from the old client's settings and swaps it
//! into the [`ClientHandle`] without verifying it; the next probe does that.
//! Failures are logged and the loop carries on until shutdown.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use common::{MonitorConfig, StoreError, StoreResult};

use crate::client::ClientHandle;
use crate::store::StoreClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting,
}

/// Snapshot published after every probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    pub state: ConnectionState,
    /// Probes issued so far
    pub probes: u64,
    /// Probes that failed or timed out
    pub failures: u64,
    /// Replacement clients installed into the handle
    pub reconnects: u64,
    /// Client in the handle after the last probe
    pub client_id: Option<Uuid>,
    pub last_error: Option<String>,
}

impl MonitorState {
    fn initial(client_id: Option<Uuid>) -> Self {
        Self {
            state: ConnectionState::Connected,
            probes: 0,
            failures: 0,
            reconnects: 0,
            client_id,
            last_error: None,
        }
    }
}

pub struct ConnectionMonitor {
    handle: ClientHandle,
    config: MonitorConfig,
    state: watch::Sender<MonitorState>,
    shutdown: CancellationToken,
}

impl ConnectionMonitor {
    pub fn new(handle: ClientHandle, config: MonitorConfig) -> Self {
        let initial = MonitorState::initial(handle.current().map(|c| c.client_id()));
        let (state, _) = watch::channel(initial);
        Self {
            handle,
            config,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the loop on the current tokio runtime.
    pub fn spawn(self) -> MonitorHandle {
        let state = self.subscribe();
        let shutdown = self.shutdown_token();
        let task = tokio::spawn(self.run());
        MonitorHandle {
            task,
            state,
            shutdown,
        }
    }

    /// Probe, sleep, repeat until the shutdown token fires.
    pub async fn run(self) {
        info!(
            probe_timeout = ?self.config.probe_timeout,
            interval = ?self.config.interval,
            "Connection monitor started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = self.tick() => {}
            }
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("Connection monitor stopped");
    }

    /// One probe, plus a reconnect when the probe fails.
    pub async fn tick(&self) -> ConnectionState {
        let Some(client) = self.handle.current() else {
            warn!("No store client set; nothing to probe");
            self.publish(|s| {
                s.state = ConnectionState::Reconnecting;
                s.failures += 1;
                s.last_error = Some("no store client set".to_string());
            });
            return ConnectionState::Reconnecting;
        };

        match self.probe(client.as_ref()).await {
            Ok(()) => {
                debug!(client_id = %client.client_id(), "Store liveness probe succeeded");
                self.publish(|s| {
                    s.probes += 1;
                    s.state = ConnectionState::Connected;
                    s.client_id = Some(client.client_id());
                    s.last_error = None;
                });
                ConnectionState::Connected
            }
            Err(err) => {
                warn!(
                    client_id = %client.client_id(),
                    error = %err,
                    "Store liveness probe failed; reconnecting"
                );
                let message = err.to_string();
                self.publish(|s| {
                    s.probes += 1;
                    s.state = ConnectionState::Reconnecting;
                    s.failures += 1;
                    s.last_error = Some(message);
                });
                self.reconnect(client.as_ref()).await;
                ConnectionState::Reconnecting
            }
        }
    }

    async fn probe(&self, client: &dyn StoreClient) -> StoreResult<()> {
        match tokio::time::timeout(self.config.probe_timeout, client.ping()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::timeout(format!(
                "liveness probe exceeded {:?}",
                self.config.probe_timeout
            ))),
        }
    }

    async fn reconnect(&self, client: &dyn StoreClient) {
        match client.reconnect().await {
            Ok(fresh) => {
                let fresh_id = fresh.client_id();
                self.handle.set(fresh);
                info!(
                    previous = %client.client_id(),
                    client_id = %fresh_id,
                    "Store client replaced"
                );
                self.publish(|s| {
                    s.reconnects += 1;
                    s.client_id = Some(fresh_id);
                });
            }
            Err(err) => {
                error!(
                    client_id = %client.client_id(),
                    error = %err,
                    "Failed to build replacement store client"
                );
                self.publish(|s| s.last_error = Some(err.to_string()));
            }
        }
    }

    fn publish(&self, update: impl FnOnce(&mut MonitorState)) {
        self.state.send_modify(update);
    }
}

/// Handle to a spawned monitor task.
pub struct MonitorHandle {
    task: JoinHandle<()>,
    state: watch::Receiver<MonitorState>,
    shutdown: CancellationToken,
}

impl MonitorHandle {
    /// Latest published state
    pub fn state(&self) -> MonitorState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for the task to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "Connection monitor task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use crate::store::{DocumentCollection, MockDocumentCollection, MockStoreClient};
    use domain::Entity;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> MonitorConfig {
        MonitorConfig {
            probe_timeout: Duration::from_millis(50),
            interval: Duration::from_millis(10),
        }
    }

    fn healthy_client(id: Uuid) -> MockStoreClient {
        let mut client = MockStoreClient::new();
        client.expect_client_id().return_const(id);
        client.expect_ping().returning(|| Ok(()));
        client
    }

    #[tokio::test]
    async fn test_healthy_probe_keeps_client() {
        let id = Uuid::new_v4();
        let mut client = healthy_client(id);
        client.expect_reconnect().never();

        let handle = ClientHandle::with_client(Arc::new(client));
        let monitor = ConnectionMonitor::new(handle.clone(), config());

        assert_eq!(monitor.tick().await, ConnectionState::Connected);
        assert_eq!(handle.current().unwrap().client_id(), id);
        assert_eq!(monitor.subscribe().borrow().reconnects, 0);
    }

    #[tokio::test]
    async fn test_failed_probe_swaps_in_new_client() {
        let old_id = Uuid::new_v4();
        let new_id = Uuid::new_v4();

        let mut client = MockStoreClient::new();
        client.expect_client_id().return_const(old_id);
        client
            .expect_ping()
            .returning(|| Err(StoreError::unavailable("connection refused")));
        let fresh = healthy_client(new_id);
        client
            .expect_reconnect()
            .times(1)
            .return_once(move || Ok(Arc::new(fresh) as Arc<dyn StoreClient>));

        let handle = ClientHandle::with_client(Arc::new(client));
        let monitor = ConnectionMonitor::new(handle.clone(), config());

        assert_eq!(monitor.tick().await, ConnectionState::Reconnecting);
        assert_eq!(handle.current().unwrap().client_id(), new_id);

        let state = monitor.subscribe().borrow().clone();
        assert_eq!(state.probes, 1);
        assert_eq!(state.failures, 1);
        assert_eq!(state.reconnects, 1);
        assert_eq!(state.client_id, Some(new_id));

        // next probe runs against the replacement
        assert_eq!(monitor.tick().await, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_failed_reconnect_keeps_old_client() {
        let id = Uuid::new_v4();
        let mut client = MockStoreClient::new();
        client.expect_client_id().return_const(id);
        client
            .expect_ping()
            .returning(|| Err(StoreError::unavailable("down")));
        client
            .expect_reconnect()
            .returning(|| Err(StoreError::configuration("bad url")));

        let handle = ClientHandle::with_client(Arc::new(client));
        let monitor = ConnectionMonitor::new(handle.clone(), config());

        assert_eq!(monitor.tick().await, ConnectionState::Reconnecting);
        assert_eq!(monitor.tick().await, ConnectionState::Reconnecting);
        assert_eq!(handle.current().unwrap().client_id(), id);

        let state = monitor.subscribe().borrow().clone();
        assert_eq!(state.failures, 2);
        assert_eq!(state.reconnects, 0);
        assert!(state.last_error.unwrap().contains("bad url"));
    }

    #[tokio::test]
    async fn test_repository_built_before_swap_keeps_old_collection() {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        struct Note {
            text: String,
        }
        impl Entity for Note {}

        let mut old_notes = MockDocumentCollection::new();
        old_notes.expect_name().return_const("Note".to_string());
        old_notes.expect_count().times(1).returning(|_| Ok(7));

        let mut new_notes = MockDocumentCollection::new();
        new_notes.expect_name().return_const("Note".to_string());
        new_notes.expect_count().never();
        let new_notes: Arc<dyn DocumentCollection> = Arc::new(new_notes);

        let new_id = Uuid::new_v4();
        let mut fresh = MockStoreClient::new();
        fresh.expect_client_id().return_const(new_id);
        fresh
            .expect_collection()
            .returning(move |_, _| Arc::clone(&new_notes));

        let mut client = MockStoreClient::new();
        client.expect_client_id().return_const(Uuid::new_v4());
        client
            .expect_ping()
            .returning(|| Err(StoreError::unavailable("down")));
        client
            .expect_collection()
            .times(1)
            .return_once(move |_, _| Arc::new(old_notes) as Arc<dyn DocumentCollection>);
        client
            .expect_reconnect()
            .times(1)
            .return_once(move || Ok(Arc::new(fresh) as Arc<dyn StoreClient>));

        let handle = ClientHandle::with_client(Arc::new(client));
        let before = Repository::<Note>::new(&handle, "app").unwrap();

        let monitor = ConnectionMonitor::new(handle.clone(), config());
        assert_eq!(monitor.tick().await, ConnectionState::Reconnecting);
        assert_eq!(handle.current().unwrap().client_id(), new_id);

        // a repository built now binds the replacement's collection
        let after = Repository::<Note>::new(&handle, "app").unwrap();
        assert_eq!(after.collection_name(), "Note");

        // the earlier one still talks to the collection it was built with
        assert_eq!(before.count(None, None).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_empty_handle_is_not_fatal() {
        let monitor = ConnectionMonitor::new(ClientHandle::new(), config());
        assert_eq!(monitor.tick().await, ConnectionState::Reconnecting);
    }

    #[tokio::test]
    async fn test_spawned_loop_survives_failures_until_shutdown() {
        let mut client = MockStoreClient::new();
        client.expect_client_id().return_const(Uuid::new_v4());
        client
            .expect_ping()
            .returning(|| Err(StoreError::unavailable("down")));
        client
            .expect_reconnect()
            .returning(|| Err(StoreError::unavailable("still down")));

        let handle = ClientHandle::with_client(Arc::new(client));
        let monitor = ConnectionMonitor::new(handle, config()).spawn();
        let mut rx = monitor.subscribe();

        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.failures >= 3))
            .await
            .expect("monitor kept probing")
            .unwrap();

        assert!(!monitor.is_finished());
        monitor.shutdown().await;
    }
}
