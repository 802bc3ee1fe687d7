use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;

/// Scheduler parameters. The host builds one at startup (defaults, a map, or
/// environment) and publishes it on a watch channel; the engine re-reads the
/// latest value at every scheduling decision, so toggling `enabled` or
/// changing the interval range takes effect on the next tick without
/// disturbing a run already in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineCfg {
    /// Global on/off switch for autonomous behavior.
    pub enabled: bool,
    /// Delay before the very first autonomous tick after start.
    pub startup_delay_secs: u64,
    /// Steady-state re-arm delay, drawn uniformly from this range.
    pub interval_min_secs: u64,
    pub interval_max_secs: u64,
    /// Watchdog ceiling for behaviors without their own override.
    pub default_max_duration_secs: u64,
    /// Poll interval while `enabled` is false.
    pub disabled_poll_secs: u64,
    /// RNG seed for selection and interval jitter. `None` seeds from entropy;
    /// tests pin it for reproducible draws.
    pub seed: Option<u64>,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            startup_delay_secs: 30,
            interval_min_secs: 300,
            interval_max_secs: 600,
            default_max_duration_secs: 60,
            disabled_poll_secs: 5,
            seed: None,
        }
    }
}

/// Environment variable prefix for `from_env`.
const ENV_PREFIX: &str = "MOCHI_";

impl EngineCfg {
    /// Build from a key/value map, falling back to defaults for missing or
    /// unparsable entries.
    pub fn from_map(m: &HashMap<String, String>) -> Self {
        let d = Self::default();
        Self {
            enabled: get_or(m, "enabled", d.enabled),
            startup_delay_secs: get_or(m, "startup_delay_secs", d.startup_delay_secs),
            interval_min_secs: get_or(m, "interval_min_secs", d.interval_min_secs),
            interval_max_secs: get_or(m, "interval_max_secs", d.interval_max_secs),
            default_max_duration_secs: get_or(
                m,
                "default_max_duration_secs",
                d.default_max_duration_secs,
            ),
            disabled_poll_secs: get_or(m, "disabled_poll_secs", d.disabled_poll_secs),
            seed: m.get("seed").and_then(|v| v.parse().ok()),
        }
    }

    /// Build from `MOCHI_*` environment variables (`MOCHI_ENABLED`,
    /// `MOCHI_INTERVAL_MIN_SECS`, ...).
    pub fn from_env() -> Self {
        let mut map = HashMap::new();
        for (key, value) in std::env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                map.insert(stripped.to_lowercase(), value);
            }
        }
        Self::from_map(&map)
    }

    /// Clamp degenerate values to safe floors instead of failing the
    /// scheduler: an inverted interval range is swapped, zero ceilings are
    /// floored at one second.
    pub fn sanitized(mut self) -> Self {
        if self.interval_min_secs > self.interval_max_secs {
            std::mem::swap(&mut self.interval_min_secs, &mut self.interval_max_secs);
        }
        self.default_max_duration_secs = self.default_max_duration_secs.max(1);
        self.disabled_poll_secs = self.disabled_poll_secs.max(1);
        self
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn disabled_poll(&self) -> Duration {
        Duration::from_secs(self.disabled_poll_secs)
    }
}

/// Create a config watch channel seeded with `cfg`. The engine keeps the
/// receiver; the host keeps the sender and pushes updates through it.
pub fn channel(cfg: EngineCfg) -> (watch::Sender<EngineCfg>, watch::Receiver<EngineCfg>) {
    watch::channel(cfg.sanitized())
}

fn get_or<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    map.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
