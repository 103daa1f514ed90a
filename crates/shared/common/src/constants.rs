//! Workspace-wide constants
//!
//! Centralized location for magic values to improve maintainability.

// =============================================================================
// Store connection
// =============================================================================

/// Default store URL (in-process memory store)
pub const DEFAULT_STORE_URL: &str = "memory://default";

/// URL scheme served by the in-memory store
pub const MEMORY_URL_SCHEME: &str = "memory://";

/// Default application name reported to the store
pub const DEFAULT_APP_NAME: &str = "docrepo";

/// Default database name
pub const DEFAULT_DATABASE: &str = "app";

/// Default client connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Connection monitor
// =============================================================================

/// Upper bound on a single liveness probe, in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Pause between probes, in seconds
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 10;

// =============================================================================
// Logging
// =============================================================================

/// Filter used when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "info";
