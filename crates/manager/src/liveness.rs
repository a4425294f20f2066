//! Liveness monitor — heartbeat tracking plus coarse resource thresholds.
//!
//! The orchestration loop beats once per sweep; this monitor runs on its own
//! timer and only observes. The heartbeat is the sole mutable state shared
//! between the two tasks, behind a single mutex. A stale heartbeat (older
//! than twice the check interval) is a fatal-liveness event routed to the
//! recovery hook; the in-flight sweep is never cancelled, only reported.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use play_engine_core::config::LivenessSettings;

#[derive(Debug)]
struct HeartbeatInner {
    last_beat: Instant,
    count: u64,
}

/// Shared heartbeat handle. Clones refer to the same underlying state.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    inner: Arc<Mutex<HeartbeatInner>>,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Heartbeat {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HeartbeatInner {
                last_beat: Instant::now(),
                count: 0,
            })),
        }
    }

    /// Called once per sweep by the orchestration loop.
    pub fn beat(&self) {
        let mut inner = self.inner.lock();
        inner.last_beat = Instant::now();
        inner.count += 1;
    }

    /// Time since the last beat.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.inner.lock().last_beat.elapsed()
    }

    /// Total beats since startup.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }
}

/// Recovery action invoked on a fatal-liveness event. Restart/alerting is
/// deployment-specific and lives outside this crate.
pub trait RecoveryHook: Send + Sync {
    fn on_stalled(&self, heartbeat_age: Duration);
}

/// Default hook: log and carry on.
pub struct LogOnlyRecovery;

impl RecoveryHook for LogOnlyRecovery {
    fn on_stalled(&self, heartbeat_age: Duration) {
        error!(
            age_secs = heartbeat_age.as_secs(),
            "Recovery hook invoked for stalled orchestration"
        );
    }
}

/// Watches heartbeat age and process resource usage on its own timer.
pub struct LivenessMonitor {
    heartbeat: Heartbeat,
    settings: LivenessSettings,
    hook: Arc<dyn RecoveryHook>,
}

impl LivenessMonitor {
    #[must_use]
    pub fn new(heartbeat: Heartbeat, settings: LivenessSettings, hook: Arc<dyn RecoveryHook>) -> Self {
        Self {
            heartbeat,
            settings,
            hook,
        }
    }

    /// Spawns the monitor task. It runs until the process exits.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = Duration::from_secs(self.settings.check_interval_secs);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                self.check();
            }
        })
    }

    /// One monitor pass: heartbeat age, then resource thresholds.
    pub fn check(&self) {
        let age = self.heartbeat.age();
        let stale_after = Duration::from_secs(self.settings.check_interval_secs * 2);
        if age > stale_after {
            error!(
                age_secs = age.as_secs(),
                threshold_secs = stale_after.as_secs(),
                beats = self.heartbeat.count(),
                "FATAL LIVENESS: orchestration heartbeat is stale"
            );
            self.hook.on_stalled(age);
        } else {
            debug!(age_secs = age.as_secs(), "Heartbeat fresh");
        }

        if let Some(rss_mib) = current_rss_mib() {
            if rss_mib > self.settings.max_rss_mib {
                warn!(
                    rss_mib,
                    max_mib = self.settings.max_rss_mib,
                    "Process memory above threshold"
                );
            }
        }
        if let Some(load) = load_average_1m() {
            if load > self.settings.max_load_avg {
                warn!(
                    load,
                    max_load = self.settings.max_load_avg,
                    "System load above threshold"
                );
            }
        }
    }
}

/// Resident set size of this process in MiB (Linux only).
#[must_use]
pub fn current_rss_mib() -> Option<u64> {
    if cfg!(target_os = "linux") {
        let statm = fs::read_to_string("/proc/self/statm").ok()?;
        parse_statm_rss_mib(&statm, 4096)
    } else {
        None
    }
}

/// 1-minute load average (Linux only).
#[must_use]
pub fn load_average_1m() -> Option<f64> {
    if cfg!(target_os = "linux") {
        let loadavg = fs::read_to_string("/proc/loadavg").ok()?;
        parse_loadavg_1m(&loadavg)
    } else {
        None
    }
}

fn parse_statm_rss_mib(statm: &str, page_size: u64) -> Option<u64> {
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * page_size / (1024 * 1024))
}

fn parse_loadavg_1m(loadavg: &str) -> Option<f64> {
    loadavg.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook(AtomicUsize);

    impl RecoveryHook for CountingHook {
        fn on_stalled(&self, _age: Duration) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn settings(check_secs: u64) -> LivenessSettings {
        LivenessSettings {
            check_interval_secs: check_secs,
            max_rss_mib: 512,
            max_load_avg: 8.0,
        }
    }

    #[test]
    fn beat_resets_age_and_counts() {
        let hb = Heartbeat::new();
        assert_eq!(hb.count(), 0);
        hb.beat();
        hb.beat();
        assert_eq!(hb.count(), 2);
        assert!(hb.age() < Duration::from_secs(1));
    }

    #[test]
    fn clones_share_state() {
        let hb = Heartbeat::new();
        let other = hb.clone();
        other.beat();
        assert_eq!(hb.count(), 1);
    }

    #[test]
    fn fresh_heartbeat_does_not_trigger_recovery() {
        let hb = Heartbeat::new();
        hb.beat();
        let hook = Arc::new(CountingHook(AtomicUsize::new(0)));
        let monitor = LivenessMonitor::new(hb, settings(60), hook.clone());

        monitor.check();
        assert_eq!(hook.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stale_heartbeat_triggers_recovery_hook() {
        let hb = Heartbeat::new();
        // check interval 0 → anything older than 0s is stale.
        std::thread::sleep(Duration::from_millis(10));
        let hook = Arc::new(CountingHook(AtomicUsize::new(0)));
        let monitor = LivenessMonitor::new(hb, settings(0), hook.clone());

        monitor.check();
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn statm_parses_resident_pages() {
        // 2048 resident pages at 4 KiB = 8 MiB.
        assert_eq!(parse_statm_rss_mib("12345 2048 300 1 0 900 0", 4096), Some(8));
        assert_eq!(parse_statm_rss_mib("garbage", 4096), None);
    }

    #[test]
    fn loadavg_parses_first_field() {
        assert_eq!(parse_loadavg_1m("1.42 0.98 0.76 2/345 6789"), Some(1.42));
        assert_eq!(parse_loadavg_1m(""), None);
    }

    #[tokio::test]
    async fn spawned_monitor_runs_until_aborted() {
        let hb = Heartbeat::new();
        hb.beat();
        let monitor = LivenessMonitor::new(hb, settings(3600), Arc::new(LogOnlyRecovery));
        let handle = monitor.spawn();
        // First tick fires immediately; give it a moment, then stop.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
