//! Application configuration for the play engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::play::PolicyInstance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub monitor: MonitorSettings,
    pub trailing: TrailingSettings,
    pub liveness: LivenessSettings,
    pub gtd: GtdSettings,
}

/// Record store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Root directory holding the lifecycle folders.
    pub root: PathBuf,
}

/// Orchestration cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Seconds between sweeps. Coarse by design; this is not a
    /// real-time scheduler.
    pub poll_interval_secs: u64,
}

/// Global trailing gate. Per-play sections must ALSO enable trailing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingSettings {
    pub enabled: bool,
}

/// Liveness monitor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessSettings {
    /// Seconds between monitor checks. Heartbeat older than twice this is
    /// a fatal-liveness event.
    pub check_interval_secs: u64,
    /// Max resident set size in MiB before a resource warning.
    pub max_rss_mib: u64,
    /// Max 1-minute load average before a resource warning.
    pub max_load_avg: f64,
}

/// Default dynamic-GTD configuration applied to plays that enable GTD but
/// carry no policy list of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtdSettings {
    pub enabled: bool,
    #[serde(default)]
    pub policies: Vec<PolicyInstance>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreSettings {
                root: PathBuf::from("plays"),
            },
            monitor: MonitorSettings {
                poll_interval_secs: 30,
            },
            trailing: TrailingSettings { enabled: false },
            liveness: LivenessSettings {
                check_interval_secs: 60,
                max_rss_mib: 512,
                max_load_avg: 8.0,
            },
            gtd: GtdSettings {
                enabled: false,
                policies: Vec::new(),
            },
        }
    }
}
