use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Per-behavior last-start timestamps.
///
/// Entries are written when a run *starts*, so a long-running behavior still
/// respects its cooldown measured from start time. The map is never pruned —
/// it is bounded by catalog size.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    last_start: HashMap<String, Instant>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_started(&mut self, id: &str, now: Instant) {
        self.last_start.insert(id.to_owned(), now);
    }

    pub fn last_start(&self, id: &str) -> Option<Instant> {
        self.last_start.get(id).copied()
    }

    /// Remaining cooldown for `id`, or `None` if the behavior has no pending
    /// cooldown (never started, zero cooldown, or already elapsed).
    pub fn remaining(&self, id: &str, cooldown: Duration, now: Instant) -> Option<Duration> {
        if cooldown.is_zero() {
            return None;
        }
        let started = self.last_start.get(id)?;
        let ready_at = *started + cooldown;
        if now >= ready_at {
            None
        } else {
            Some(ready_at - now)
        }
    }

    pub fn is_ready(&self, id: &str, cooldown: Duration, now: Instant) -> bool {
        self.remaining(id, cooldown, now).is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.last_start.is_empty()
    }
}

/// Remaining whole seconds, rounded up so UI text never reads "0s" while a
/// trigger would still be refused.
pub fn remaining_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 { secs + 1 } else { secs }
}

/// Format a remaining duration the way the cooldown menu shows it:
/// "45s", "2m 30s", "1h 02m".
pub fn friendly_text(remaining: Duration) -> String {
    let total = remaining_secs(remaining);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_counts_from_start() {
        let mut ledger = CooldownLedger::new();
        let t0 = Instant::now();
        ledger.mark_started("nap", t0);

        let cd = Duration::from_secs(300);
        assert_eq!(
            ledger.remaining("nap", cd, t0 + Duration::from_secs(100)),
            Some(Duration::from_secs(200))
        );
        assert_eq!(ledger.remaining("nap", cd, t0 + Duration::from_secs(300)), None);
        assert_eq!(ledger.remaining("nap", cd, t0 + Duration::from_secs(400)), None);
    }

    #[test]
    fn zero_cooldown_is_always_ready() {
        let mut ledger = CooldownLedger::new();
        let t0 = Instant::now();
        ledger.mark_started("joke", t0);
        assert!(ledger.is_ready("joke", Duration::ZERO, t0));
    }

    #[test]
    fn unknown_id_has_no_cooldown() {
        let ledger = CooldownLedger::new();
        assert_eq!(
            ledger.remaining("weather", Duration::from_secs(600), Instant::now()),
            None
        );
    }

    #[test]
    fn restart_resets_the_clock() {
        let mut ledger = CooldownLedger::new();
        let t0 = Instant::now();
        let cd = Duration::from_secs(60);
        ledger.mark_started("joke", t0);
        ledger.mark_started("joke", t0 + Duration::from_secs(50));
        assert_eq!(
            ledger.remaining("joke", cd, t0 + Duration::from_secs(60)),
            Some(Duration::from_secs(50))
        );
    }

    #[test]
    fn seconds_round_up() {
        assert_eq!(remaining_secs(Duration::from_millis(500)), 1);
        assert_eq!(remaining_secs(Duration::from_secs(2)), 2);
        assert_eq!(remaining_secs(Duration::from_millis(2001)), 3);
    }

    #[test]
    fn friendly_text_formats() {
        assert_eq!(friendly_text(Duration::from_secs(45)), "45s");
        assert_eq!(friendly_text(Duration::from_secs(150)), "2m 30s");
        assert_eq!(friendly_text(Duration::from_secs(3720)), "1h 02m");
        assert_eq!(friendly_text(Duration::ZERO), "0s");
    }
}
