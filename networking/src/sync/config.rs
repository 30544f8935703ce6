/// Sync engine configuration constants.

/// Maximum inclusion-proof requests in flight during one pending check.
pub const MAX_CONCURRENT_PROOF_REQUESTS: usize = 16;

/// Metric label for blocks synced while catching up to the contract head.
pub const MODE_CATCH_UP: &str = "catch_up";

/// Metric label for blocks synced from live submissions.
pub const MODE_LIVE: &str = "live";
