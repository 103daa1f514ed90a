//! In-process reference store.
//!
//! Implements the storage contracts entirely in memory, for tests and for
//! embedding. Servers are addressed by URL (`memory://<name>`) through a
//! process-wide registry, so a client rebuilt from the same settings talks
//! to the same data.

mod client;
mod collection;
mod server;

pub use client::MemoryClient;
pub use collection::MemoryCollection;
pub use server::MemoryServer;
