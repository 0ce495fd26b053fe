//! Canonical structured event names used across `ejb-resolver`.

// Probe lifecycle events.
pub const PROBE_ATTEMPT: &str = "probe_attempt";
pub const PROBE_SKIPPED_FAILED: &str = "probe_skipped_failed";
pub const PROBE_SKIPPED_SCHEME: &str = "probe_skipped_scheme";
pub const PROBE_CONNECTED: &str = "probe_connected";
pub const PROBE_CHANNEL_OK: &str = "probe_channel_ok";
pub const PROBE_FAILED: &str = "probe_failed";
pub const PROBE_CANCELLED: &str = "probe_cancelled";

// Discovery-attempt coordination events.
pub const DISCOVERY_RETRY_ALL: &str = "discovery_retry_all";
pub const DISCOVERY_MATCH_PASS: &str = "discovery_match_pass";
pub const DISCOVERY_PHASE2_START: &str = "discovery_phase2_start";
pub const DISCOVERY_COMPLETE: &str = "discovery_complete";

// Resolver strategy and outcome events.
pub const RESOLVE_DIRECT: &str = "resolve_direct";
pub const RESOLVE_FIRST_MATCH: &str = "resolve_first_match";
pub const RESOLVE_CLUSTER: &str = "resolve_cluster";
pub const RESOLVE_ANY: &str = "resolve_any";
pub const RESOLVE_NO_MATCH: &str = "resolve_no_match";
pub const RESOLVE_FALLBACK_CLUSTER: &str = "resolve_fallback_cluster";
pub const SELECTOR_DECISION: &str = "selector_decision";
pub const SELECTOR_FAILED: &str = "selector_failed";
pub const NAMING_FALLBACK: &str = "naming_fallback";
pub const BLACKLIST_ADD: &str = "blacklist_add";
pub const SESSION_AFFINITY_SET: &str = "session_affinity_set";

// Registry events.
pub const REGISTRY_NODE_ADDED: &str = "registry_node_added";
pub const REGISTRY_NODE_REMOVED: &str = "registry_node_removed";
pub const REGISTRY_CLUSTER_REMOVED: &str = "registry_cluster_removed";
