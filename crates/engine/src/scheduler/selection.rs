//! Eligibility filtering and weighted random selection.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::Rng;
use tokio::time::Instant;

use crate::behavior::{Behavior, BehaviorContext};
use crate::catalog::BehaviorCatalog;
use crate::config::EngineCfg;
use crate::cooldown::CooldownLedger;

/// Floor for any re-arm delay, so degenerate configuration can never spin
/// the timer loop.
pub const MIN_REARM: Duration = Duration::from_millis(250);

/// Evaluate a behavior's `can_run` gate. A panic inside the gate counts as
/// "not eligible" — gates are supposed to be pure, and a broken one must not
/// take the tick down with it.
pub fn gate_allows(behavior: &dyn Behavior, ctx: &BehaviorContext) -> bool {
    match catch_unwind(AssertUnwindSafe(|| behavior.can_run(ctx))) {
        Ok(allowed) => allowed,
        Err(_) => {
            tracing::warn!(behavior = behavior.id(), "can_run panicked, skipping");
            false
        }
    }
}

/// Everything a manual trigger checks: kill switch, cooldown, gate.
/// Weight is deliberately not consulted here.
pub fn runnable(
    behavior: &Arc<dyn Behavior>,
    ledger: &CooldownLedger,
    now: Instant,
    ctx: &BehaviorContext,
) -> bool {
    if !behavior.enabled() {
        return false;
    }
    if !ledger.is_ready(behavior.id(), Duration::from_secs(behavior.cooldown_secs()), now) {
        return false;
    }
    gate_allows(behavior.as_ref(), ctx)
}

/// The weighted-selection pool for one tick: behaviors that carry positive
/// weight and pass every `runnable` check.
pub fn eligible<'a>(
    catalog: &'a BehaviorCatalog,
    ledger: &CooldownLedger,
    now: Instant,
    make_ctx: &dyn Fn(&str) -> BehaviorContext,
) -> Vec<&'a Arc<dyn Behavior>> {
    catalog
        .iter()
        .filter(|b| b.weight() > 0.0)
        .filter(|b| runnable(b, ledger, now, &make_ctx(b.id())))
        .collect()
}

/// Draw one behavior with probability proportional to its weight.
pub fn pick_weighted<'a>(
    pool: &[&'a Arc<dyn Behavior>],
    rng: &mut SmallRng,
) -> Option<&'a Arc<dyn Behavior>> {
    if pool.is_empty() {
        return None;
    }
    let weights: Vec<f64> = pool.iter().map(|b| b.weight()).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    Some(pool[dist.sample(rng)])
}

/// Steady-state re-arm delay: uniform over the configured range, floored at
/// [`MIN_REARM`].
pub fn draw_interval(cfg: &EngineCfg, rng: &mut SmallRng) -> Duration {
    let (min, max) = if cfg.interval_min_secs <= cfg.interval_max_secs {
        (cfg.interval_min_secs, cfg.interval_max_secs)
    } else {
        (cfg.interval_max_secs, cfg.interval_min_secs)
    };
    let secs = if min == max { min } else { rng.gen_range(min..=max) };
    Duration::from_secs(secs).max(MIN_REARM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::RunFuture;
    use crate::collab::Collaborators;
    use crate::flags::FlagRegistry;
    use rand::SeedableRng;
    use std::collections::HashMap;

    struct Stub {
        id: &'static str,
        weight: f64,
        cooldown: u64,
        enabled: bool,
        gate: bool,
        gate_panics: bool,
    }

    impl Stub {
        fn new(id: &'static str, weight: f64) -> Self {
            Self {
                id,
                weight,
                cooldown: 0,
                enabled: true,
                gate: true,
                gate_panics: false,
            }
        }
    }

    impl Behavior for Stub {
        fn id(&self) -> &str {
            self.id
        }

        fn display_name(&self) -> &str {
            self.id
        }

        fn weight(&self) -> f64 {
            self.weight
        }

        fn cooldown_secs(&self) -> u64 {
            self.cooldown
        }

        fn enabled(&self) -> bool {
            self.enabled
        }

        fn can_run(&self, _ctx: &BehaviorContext) -> bool {
            if self.gate_panics {
                panic!("gate blew up");
            }
            self.gate
        }

        fn run(&self, _ctx: BehaviorContext) -> RunFuture {
            Box::pin(async { Ok(()) })
        }
    }

    fn ctx_maker() -> impl Fn(&str) -> BehaviorContext {
        let flags = FlagRegistry::new();
        move |id: &str| BehaviorContext::new(id, flags.clone(), Collaborators::default())
    }

    fn pool_ids<'a>(pool: &'a [&'a Arc<dyn Behavior>]) -> Vec<&'a str> {
        pool.iter().map(|b| b.id()).collect()
    }

    #[test]
    fn eligibility_skips_ineligible_behaviors() {
        let zero_weight = Stub::new("zero-weight", 0.0);
        let disabled = Stub {
            enabled: false,
            ..Stub::new("disabled", 1.0)
        };
        let gated_off = Stub {
            gate: false,
            ..Stub::new("gated-off", 1.0)
        };
        let panicking = Stub {
            gate_panics: true,
            ..Stub::new("panicking", 1.0)
        };
        let cooling = Stub {
            cooldown: 300,
            ..Stub::new("cooling", 1.0)
        };
        let ok = Stub::new("ok", 1.0);

        let catalog = BehaviorCatalog::new(vec![
            Arc::new(zero_weight),
            Arc::new(disabled),
            Arc::new(gated_off),
            Arc::new(panicking),
            Arc::new(cooling),
            Arc::new(ok),
        ])
        .unwrap();

        let mut ledger = CooldownLedger::new();
        let now = Instant::now();
        ledger.mark_started("cooling", now);

        let make_ctx = ctx_maker();
        let pool = eligible(&catalog, &ledger, now, &make_ctx);
        assert_eq!(pool_ids(&pool), vec!["ok"]);
    }

    #[test]
    fn runnable_ignores_weight() {
        let b: Arc<dyn Behavior> = Arc::new(Stub::new("zero", 0.0));
        let ledger = CooldownLedger::new();
        let make_ctx = ctx_maker();
        assert!(runnable(&b, &ledger, Instant::now(), &make_ctx("zero")));
    }

    #[test]
    fn cooldown_expiry_readmits() {
        let b: Arc<dyn Behavior> = Arc::new(Stub {
            cooldown: 300,
            ..Stub::new("nap", 1.0)
        });
        let mut ledger = CooldownLedger::new();
        let t0 = Instant::now();
        ledger.mark_started("nap", t0);
        let make_ctx = ctx_maker();

        let ctx = make_ctx("nap");
        assert!(!runnable(&b, &ledger, t0 + Duration::from_secs(299), &ctx));
        assert!(runnable(&b, &ledger, t0 + Duration::from_secs(300), &ctx));
    }

    #[test]
    fn weighted_draw_matches_weights() {
        let a: Arc<dyn Behavior> = Arc::new(Stub::new("a", 1.0));
        let b: Arc<dyn Behavior> = Arc::new(Stub::new("b", 3.0));
        let pool = vec![&a, &b];

        let mut rng = SmallRng::seed_from_u64(7);
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..20_000 {
            let picked = pick_weighted(&pool, &mut rng).unwrap();
            *counts.entry(picked.id()).or_default() += 1;
        }

        let a_count = counts["a"] as f64;
        let b_count = counts["b"] as f64;
        let ratio = b_count / a_count;
        assert!(
            (2.6..=3.4).contains(&ratio),
            "expected ~3x selection ratio, got {ratio:.2} ({a_count} vs {b_count})"
        );
    }

    #[test]
    fn empty_pool_picks_nothing() {
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(pick_weighted(&[], &mut rng).is_none());
    }

    #[test]
    fn interval_stays_in_range() {
        let cfg = EngineCfg {
            interval_min_secs: 300,
            interval_max_secs: 600,
            ..EngineCfg::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..1000 {
            let d = draw_interval(&cfg, &mut rng);
            assert!(d >= Duration::from_secs(300) && d <= Duration::from_secs(600));
        }
    }

    #[test]
    fn degenerate_interval_is_floored() {
        let cfg = EngineCfg {
            interval_min_secs: 0,
            interval_max_secs: 0,
            ..EngineCfg::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(draw_interval(&cfg, &mut rng), MIN_REARM);
    }

    #[test]
    fn inverted_interval_bounds_are_swapped() {
        let cfg = EngineCfg {
            interval_min_secs: 600,
            interval_max_secs: 300,
            ..EngineCfg::default()
        };
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..100 {
            let d = draw_interval(&cfg, &mut rng);
            assert!(d >= Duration::from_secs(300) && d <= Duration::from_secs(600));
        }
    }
}
