use std::time::Duration;

/// Tunable knobs of a node. Everything here has a sensible default; the
/// protocol constants proper (reward split, eviction threshold) are fixed in
/// the crate root and shared by all nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Target size of the owner set of a transaction hash.
    pub owner_fanout: usize,
    /// How long the bank waits for a mintette's period result before treating
    /// it as missing.
    pub period_timeout: Duration,
    /// A fresh state snapshot is persisted after this many logged operations.
    pub snapshot_interval: u64,
    /// Archived per-period logs and blocks older than this many periods are
    /// purged.
    pub log_retention_periods: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            owner_fanout: 3,
            period_timeout: Duration::from_secs(10),
            snapshot_interval: 64,
            log_retention_periods: 8,
        }
    }
}
