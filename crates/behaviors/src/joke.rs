//! One-liners delivered through the speech bubble.

use mochi_engine::{Behavior, BehaviorContext, RunFuture};
use rand::seq::SliceRandom;

const JOKES: &[&str] = &[
    "I would tell you a UDP joke, but you might not get it.",
    "There are only two hard things in computer science: cache invalidation, naming things, and off-by-one errors.",
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "A SQL query walks into a bar, goes up to two tables and asks: may I join you?",
    "I told my computer I needed a break. Now it won't stop sending me KitKat ads.",
    "Why did the developer go broke? They used up all their cache.",
];

/// Tells a random one-liner. Short, frequent, harmless: the bread and
/// butter of an idle mascot.
pub struct JokeTeller {
    jokes: Vec<&'static str>,
}

impl JokeTeller {
    pub fn new() -> Self {
        Self {
            jokes: JOKES.to_vec(),
        }
    }
}

impl Default for JokeTeller {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for JokeTeller {
    fn id(&self) -> &str {
        "joke"
    }

    fn display_name(&self) -> &str {
        "Tell a joke"
    }

    fn weight(&self) -> f64 {
        3.0
    }

    fn cooldown_secs(&self) -> u64 {
        90
    }

    fn can_run(&self, _ctx: &BehaviorContext) -> bool {
        true
    }

    fn run(&self, ctx: BehaviorContext) -> RunFuture {
        let joke = self
            .jokes
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("I had a joke, but I forgot it.");
        Box::pin(async move {
            ctx.speech().say(joke);
            Ok(())
        })
    }
}
