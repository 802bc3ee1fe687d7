//! Napping: the mascot closes its eyes and ignores petting for a while.

use std::time::Duration;

use mochi_engine::{Behavior, BehaviorContext, RunFuture, flag};
use rand::Rng;

/// Sleeps for a random duration, holding `blink` and `petting` so the
/// sprite neither blinks nor reacts while dozing. Won't start mid-drag.
pub struct Nap {
    min_secs: u64,
    max_secs: u64,
}

impl Nap {
    pub fn new() -> Self {
        Self {
            min_secs: 45,
            max_secs: 90,
        }
    }
}

impl Default for Nap {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for Nap {
    fn id(&self) -> &str {
        "nap"
    }

    fn display_name(&self) -> &str {
        "Take a nap"
    }

    fn weight(&self) -> f64 {
        2.0
    }

    fn cooldown_secs(&self) -> u64 {
        600
    }

    fn max_duration_secs(&self) -> Option<u64> {
        Some(120)
    }

    fn can_run(&self, ctx: &BehaviorContext) -> bool {
        ctx.flags().is_enabled(flag::DRAG)
    }

    fn run(&self, ctx: BehaviorContext) -> RunFuture {
        let secs = rand::thread_rng().gen_range(self.min_secs..=self.max_secs);
        Box::pin(async move {
            let token = ctx.lock(&[flag::BLINK, flag::PETTING]);
            ctx.sound().play("snore");
            tracing::debug!(secs, "napping");
            tokio::time::sleep(Duration::from_secs(secs)).await;
            token.release();
            Ok(())
        })
    }
}
