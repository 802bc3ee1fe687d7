//! The `Behavior` trait — the main extension point for behavior authors.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::collab::{Collaborators, SceneHandle, SoundHandle, SpeechHandle};
use crate::flags::{FlagRegistry, FlagToken};

/// Boxed future returned by [`Behavior::run`].
pub type RunFuture = Pin<Box<dyn Future<Output = Result<(), BehaviorError>> + Send + 'static>>;

/// Error a behavior may surface from its run. The scheduler logs it and
/// treats the run as finished; it never propagates further.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A pluggable autonomous behavior.
///
/// Implementations are registered once in a
/// [`BehaviorCatalog`](crate::catalog::BehaviorCatalog) and stay stateless
/// between runs; anything a run needs lives in the [`BehaviorContext`] it is
/// handed or in transient locals of the returned future.
///
/// # Contract
///
/// - `can_run` must be side-effect free. It is evaluated fresh on every
///   scheduling attempt, and a panic inside it counts as "not eligible".
/// - The future returned by `run` must eventually resolve; resolving (with
///   `Ok` or `Err`) is the completion signal. A run that outlives its
///   watchdog window (`max_duration_secs`, or the engine default) is
///   forcibly finished and its flags swept.
/// - Flags acquired through [`BehaviorContext::lock`] should be released
///   (explicitly or by dropping the token) before the future resolves. The
///   scheduler sweeps leftovers, but that is a safety net, not the contract.
///
/// # Example
///
/// ```rust,ignore
/// struct Wave;
///
/// impl Behavior for Wave {
///     fn id(&self) -> &str { "wave" }
///     fn display_name(&self) -> &str { "Wave at the user" }
///     fn can_run(&self, ctx: &BehaviorContext) -> bool {
///         ctx.flags().is_enabled(flag::DRAG)
///     }
///     fn run(&self, ctx: BehaviorContext) -> RunFuture {
///         Box::pin(async move {
///             ctx.sound().play("pop");
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Behavior: Send + Sync + 'static {
    /// Unique identifier, also used as the flag owner for this behavior's
    /// locks.
    fn id(&self) -> &str;

    /// Human-readable name for menus and notifications.
    fn display_name(&self) -> &str;

    /// Selection weight. `0.0` removes the behavior from the random pool but
    /// leaves it manually triggerable.
    fn weight(&self) -> f64 {
        1.0
    }

    /// Minimum seconds between starts. `0` means no cooldown.
    fn cooldown_secs(&self) -> u64 {
        0
    }

    /// Per-behavior watchdog ceiling, overriding the engine default.
    fn max_duration_secs(&self) -> Option<u64> {
        None
    }

    /// Per-behavior kill switch. Disabled behaviors are skipped by selection
    /// and refused by manual triggers.
    fn enabled(&self) -> bool {
        true
    }

    /// Side-effect-free gate: can this behavior start right now?
    fn can_run(&self, ctx: &BehaviorContext) -> bool;

    /// Start a run. Must not block the calling task; long work belongs in
    /// the returned future.
    fn run(&self, ctx: BehaviorContext) -> RunFuture;
}

/// Per-run context: flag locking plus the opaque collaborator handles.
///
/// Cloning is cheap (everything inside is shared); the context handed to
/// `run` is owned so the future can move it around freely.
#[derive(Clone)]
pub struct BehaviorContext {
    behavior_id: Arc<str>,
    flags: FlagRegistry,
    collab: Collaborators,
}

impl BehaviorContext {
    pub fn new(behavior_id: &str, flags: FlagRegistry, collab: Collaborators) -> Self {
        Self {
            behavior_id: Arc::from(behavior_id),
            flags,
            collab,
        }
    }

    /// Acquire flags with this behavior's id as the owner, so the
    /// scheduler's forced sweep always matches.
    pub fn lock(&self, flags: &[&str]) -> FlagToken {
        self.flags.acquire(&self.behavior_id, flags)
    }

    pub fn behavior_id(&self) -> &str {
        &self.behavior_id
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    pub fn sound(&self) -> &dyn SoundHandle {
        self.collab.sound.as_ref()
    }

    pub fn speech(&self) -> &dyn SpeechHandle {
        self.collab.speech.as_ref()
    }

    pub fn scene(&self) -> &dyn SceneHandle {
        self.collab.scene.as_ref()
    }
}
