//! The behavior scheduler: a single cooperative task that owns the
//! single-active-run invariant.
//!
//! The loop multiplexes five wake sources with `tokio::select!`: the
//! cancellation token (stop), the command channel (manual triggers), the
//! internal completion channel, the watchdog deadline (armed only while a
//! run is active) and the periodic tick deadline (armed only while idle).
//! All waiting is "schedule a deadline and return to the loop" — nothing
//! here blocks, and behaviors run as spawned tasks that report back through
//! the completion channel.

pub mod selection;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::behavior::{Behavior, BehaviorContext};
use crate::catalog::BehaviorCatalog;
use crate::collab::Collaborators;
use crate::config::EngineCfg;
use crate::cooldown::{self, CooldownLedger};
use crate::flags::FlagRegistry;
use crate::notify::{self, NoticeReceiver, NoticeSender, RunNotice};

/// Watchdog windows never drop below this, whatever a behavior declares.
const WATCHDOG_FLOOR: Duration = Duration::from_secs(5);

/// Externally supplied predicate: is autonomous behavior permitted at all
/// right now (not mid-drag, no blocking menu open, sprite ready)?
pub type GateFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
    Panicked,
    TimedOut,
}

/// Snapshot broadcast on every start/finish, for status bars and tests.
#[derive(Debug, Clone, Default)]
pub struct EngineStatus {
    /// Id of the behavior currently running, if any.
    pub active: Option<String>,
    pub runs_started: u64,
    pub runs_finished: u64,
    /// Finishes forced by the watchdog or by stop (subset of `runs_finished`).
    pub runs_forced: u64,
}

struct RunFinished {
    seq: u64,
    outcome: RunOutcome,
}

enum Command {
    Trigger {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    TriggerAny {
        reply: oneshot::Sender<bool>,
    },
}

/// The record of the one run currently executing. `None` whenever the
/// mascot is idle; this field is the enforcement point for the
/// single-active-run invariant.
struct ActiveRun {
    id: String,
    seq: u64,
    started_at: Instant,
    deadline: Instant,
}

enum Wake {
    Stopped,
    Command(Command),
    CommandsClosed,
    Finished(RunFinished),
    Watchdog,
    Tick,
}

/// The scheduler task. Construct with [`Engine::new`], then spawn
/// [`Engine::run`]; interact through the returned [`EngineHandle`].
pub struct Engine {
    cfg_rx: watch::Receiver<EngineCfg>,
    catalog: Arc<BehaviorCatalog>,
    flags: FlagRegistry,
    gate: GateFn,
    collab: Collaborators,
    cmd_rx: mpsc::Receiver<Command>,
    /// Cleared once every handle is gone, to disarm the command arm.
    cmd_open: bool,
    done_tx: mpsc::UnboundedSender<RunFinished>,
    done_rx: mpsc::UnboundedReceiver<RunFinished>,
    notice_tx: NoticeSender,
    status_tx: watch::Sender<EngineStatus>,
    ledger: Arc<Mutex<CooldownLedger>>,
    active: Option<ActiveRun>,
    status: EngineStatus,
    seq: u64,
    next_tick: Instant,
    rng: SmallRng,
    shutdown: CancellationToken,
}

impl Engine {
    /// Create an engine. Returns (Engine, handle, notice_receiver). The
    /// caller spawns `engine.run()`; the handle serves triggers and queries;
    /// run-started notices arrive on the receiver.
    pub fn new(
        cfg_rx: watch::Receiver<EngineCfg>,
        catalog: Arc<BehaviorCatalog>,
        flags: FlagRegistry,
        gate: GateFn,
        collab: Collaborators,
    ) -> (Self, EngineHandle, NoticeReceiver) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = notify::channel(32);
        let (status_tx, status_rx) = watch::channel(EngineStatus::default());
        let ledger = Arc::new(Mutex::new(CooldownLedger::new()));
        let shutdown = CancellationToken::new();
        let rng = match cfg_rx.borrow().seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let engine = Self {
            cfg_rx,
            catalog: Arc::clone(&catalog),
            flags,
            gate,
            collab,
            cmd_rx,
            cmd_open: true,
            done_tx,
            done_rx,
            notice_tx,
            status_tx,
            ledger: Arc::clone(&ledger),
            active: None,
            status: EngineStatus::default(),
            seq: 0,
            next_tick: Instant::now(),
            rng,
            shutdown: shutdown.clone(),
        };
        let handle = EngineHandle {
            cmd_tx,
            catalog,
            ledger,
            status_rx,
            shutdown,
        };
        (engine, handle, notice_rx)
    }

    /// Enter the scheduler loop. Returns once [`EngineHandle::stop`] is
    /// called (or the token is cancelled); any active run is force-finished
    /// and its flags swept before returning.
    pub async fn run(&mut self) {
        let token = self.shutdown.clone();
        let startup = self.cfg_rx.borrow().startup_delay();
        self.next_tick = Instant::now() + startup;
        tracing::info!(
            behaviors = self.catalog.len(),
            startup_delay_secs = startup.as_secs(),
            "behavior engine started"
        );

        loop {
            let idle = self.active.is_none();
            let watchdog_at = self
                .active
                .as_ref()
                .map(|r| r.deadline)
                .unwrap_or_else(Instant::now);
            let tick_at = self.next_tick;

            let wake = tokio::select! {
                _ = token.cancelled() => Wake::Stopped,
                cmd = self.cmd_rx.recv(), if self.cmd_open => match cmd {
                    Some(cmd) => Wake::Command(cmd),
                    None => Wake::CommandsClosed,
                },
                Some(done) = self.done_rx.recv() => Wake::Finished(done),
                _ = time::sleep_until(watchdog_at), if !idle => Wake::Watchdog,
                _ = time::sleep_until(tick_at), if idle => Wake::Tick,
            };

            match wake {
                Wake::Stopped => break,
                Wake::CommandsClosed => self.cmd_open = false,
                Wake::Command(Command::Trigger { id, reply }) => {
                    let started = self.try_trigger(Some(&id));
                    let _ = reply.send(started);
                }
                Wake::Command(Command::TriggerAny { reply }) => {
                    let started = self.try_trigger(None);
                    let _ = reply.send(started);
                }
                Wake::Finished(done) => self.finish(done.seq, done.outcome),
                Wake::Watchdog => {
                    if let Some(run) = &self.active {
                        let seq = run.seq;
                        self.finish(seq, RunOutcome::TimedOut);
                    }
                }
                Wake::Tick => self.tick(),
            }
        }

        // Stop semantics: the pending timer dies with the loop; an active
        // run is forced to finish so no flag stays held.
        if let Some(run) = self.active.take() {
            self.flags.clear_owner(&run.id);
            self.status.active = None;
            self.status.runs_finished += 1;
            self.status.runs_forced += 1;
            self.publish_status();
            tracing::info!(behavior = %run.id, "run force-finished on stop");
        }
        tracing::info!("behavior engine stopped");
    }

    /// One periodic scheduling attempt.
    fn tick(&mut self) {
        let cfg = self.cfg_rx.borrow().clone();

        if !cfg.enabled {
            self.next_tick = Instant::now() + cfg.disabled_poll();
            return;
        }
        if self.active.is_some() {
            // The idle guard on the timer arm makes this unreachable, but a
            // stray tick must never double-start.
            tracing::debug!("tick fired while a run is active");
            self.next_tick = Instant::now() + cfg.disabled_poll();
            return;
        }
        if !(self.gate)() {
            tracing::debug!("global gate closed, nothing runs this tick");
            self.arm_steady(&cfg);
            return;
        }

        let now = Instant::now();
        let flags = self.flags.clone();
        let collab = self.collab.clone();
        let make_ctx =
            move |id: &str| BehaviorContext::new(id, flags.clone(), collab.clone());

        let picked: Option<Arc<dyn Behavior>> = {
            let ledger = guard(&self.ledger);
            let pool = selection::eligible(self.catalog.as_ref(), &ledger, now, &make_ctx);
            selection::pick_weighted(&pool, &mut self.rng).cloned()
        };

        match picked {
            Some(behavior) => self.start_run(&behavior, &cfg),
            None => {
                tracing::debug!("no eligible behavior this tick");
                self.arm_steady(&cfg);
            }
        }
    }

    /// Manual trigger: a specific behavior (`Some(id)`) or a fresh weighted
    /// draw (`None`). Same eligibility rules as the periodic path, same
    /// refusals — only the timer is bypassed.
    fn try_trigger(&mut self, id: Option<&str>) -> bool {
        let cfg = self.cfg_rx.borrow().clone();
        if !cfg.enabled || self.active.is_some() || !(self.gate)() {
            return false;
        }

        let now = Instant::now();
        let flags = self.flags.clone();
        let collab = self.collab.clone();
        let make_ctx =
            move |id: &str| BehaviorContext::new(id, flags.clone(), collab.clone());

        let picked: Option<Arc<dyn Behavior>> = {
            let ledger = guard(&self.ledger);
            match id {
                Some(id) => self
                    .catalog
                    .get(id)
                    .filter(|b| selection::runnable(b, &ledger, now, &make_ctx(b.id())))
                    .cloned(),
                None => {
                    let pool =
                        selection::eligible(self.catalog.as_ref(), &ledger, now, &make_ctx);
                    selection::pick_weighted(&pool, &mut self.rng).cloned()
                }
            }
        };

        match picked {
            Some(behavior) => {
                self.start_run(&behavior, &cfg);
                true
            }
            None => false,
        }
    }

    fn start_run(&mut self, behavior: &Arc<dyn Behavior>, cfg: &EngineCfg) {
        let now = Instant::now();
        let id = behavior.id().to_owned();

        // Ledger entry is written at start, not finish, so cooldowns count
        // from start time even for long runs.
        guard(&self.ledger).mark_started(&id, now);

        self.seq += 1;
        let seq = self.seq;
        let window = watchdog_window(behavior.as_ref(), cfg);
        self.active = Some(ActiveRun {
            id: id.clone(),
            seq,
            started_at: now,
            deadline: now + window,
        });
        self.status.active = Some(id.clone());
        self.status.runs_started += 1;
        self.publish_status();

        if self
            .notice_tx
            .try_send(RunNotice::new(&id, behavior.display_name()))
            .is_err()
        {
            tracing::warn!(behavior = %id, "notice channel full, run notice dropped");
        }
        tracing::info!(
            behavior = %id,
            seq,
            watchdog_secs = window.as_secs(),
            "run started"
        );

        let ctx = BehaviorContext::new(&id, self.flags.clone(), self.collab.clone());

        // A panic while building the run future is swallowed here and
        // treated as an immediate finish — it never reaches the loop.
        let fut = match catch_unwind(AssertUnwindSafe(|| behavior.run(ctx))) {
            Ok(fut) => fut,
            Err(_) => {
                tracing::warn!(behavior = %id, "behavior panicked before starting");
                self.finish(seq, RunOutcome::Panicked);
                return;
            }
        };

        // The relay task folds normal completion, behavior errors and
        // mid-run panics (JoinError) into one completion message.
        let task = tokio::spawn(fut);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = match task.await {
                Ok(Ok(())) => RunOutcome::Completed,
                Ok(Err(e)) => RunOutcome::Failed(e.to_string()),
                Err(_) => RunOutcome::Panicked,
            };
            let _ = done_tx.send(RunFinished { seq, outcome });
        });
    }

    /// Close out a run. Completions carry the sequence number of the run
    /// they belong to; anything stale (a behavior calling back after its
    /// watchdog already forced the finish) is a no-op.
    fn finish(&mut self, seq: u64, outcome: RunOutcome) {
        let Some(run) = self.active.take_if(|r| r.seq == seq) else {
            tracing::debug!(seq, "completion for an already-finished run ignored");
            return;
        };

        // Forced cleanup is unconditional: whatever the behavior still
        // holds under its id is swept.
        self.flags.clear_owner(&run.id);

        self.status.active = None;
        self.status.runs_finished += 1;
        if outcome == RunOutcome::TimedOut {
            self.status.runs_forced += 1;
        }
        self.publish_status();

        let elapsed_ms = run.started_at.elapsed().as_millis() as u64;
        match &outcome {
            RunOutcome::Completed => {
                tracing::info!(behavior = %run.id, elapsed_ms, "run finished");
            }
            RunOutcome::Failed(error) => {
                tracing::warn!(behavior = %run.id, elapsed_ms, error = %error, "run failed");
            }
            RunOutcome::Panicked => {
                tracing::warn!(behavior = %run.id, elapsed_ms, "run panicked");
            }
            RunOutcome::TimedOut => {
                tracing::warn!(
                    behavior = %run.id,
                    elapsed_ms,
                    "run exceeded its watchdog window, force-finished"
                );
            }
        }

        let cfg = self.cfg_rx.borrow().clone();
        self.arm_steady(&cfg);
    }

    fn arm_steady(&mut self, cfg: &EngineCfg) {
        let delay = selection::draw_interval(cfg, &mut self.rng);
        self.next_tick = Instant::now() + delay;
        tracing::debug!(delay_secs = delay.as_secs(), "periodic timer re-armed");
    }

    fn publish_status(&self) {
        // Only fails when every receiver is gone — benign.
        let _ = self.status_tx.send(self.status.clone());
    }
}

fn watchdog_window(behavior: &dyn Behavior, cfg: &EngineCfg) -> Duration {
    let secs = behavior
        .max_duration_secs()
        .unwrap_or(cfg.default_max_duration_secs);
    Duration::from_secs(secs).max(WATCHDOG_FLOOR)
}

fn guard(ledger: &Mutex<CooldownLedger>) -> MutexGuard<'_, CooldownLedger> {
    match ledger.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Cloneable handle to a running [`Engine`]: manual triggers, lifecycle,
/// and the read-only catalog/cooldown queries UI surfaces need.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<Command>,
    catalog: Arc<BehaviorCatalog>,
    ledger: Arc<Mutex<CooldownLedger>>,
    status_rx: watch::Receiver<EngineStatus>,
    shutdown: CancellationToken,
}

impl EngineHandle {
    /// Try to start the named behavior right now, bypassing the periodic
    /// cadence. Returns whether a run actually started.
    pub async fn trigger_event(&self, id: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        let cmd = Command::Trigger {
            id: id.to_owned(),
            reply,
        };
        if self.cmd_tx.send(cmd).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Try to start one behavior from the current weighted pool.
    pub async fn attempt_event_trigger(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::TriggerAny { reply }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Stop the engine: cancels the pending timer and force-finishes any
    /// active run. Safe to call at any time, from anywhere.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// The engine's cancellation token, for hosts that tie other tasks to
    /// the same lifetime.
    pub fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Latest status snapshot.
    pub fn status(&self) -> EngineStatus {
        self.status_rx.borrow().clone()
    }

    /// A status watch receiver, for waiting on state changes.
    pub fn watch_status(&self) -> watch::Receiver<EngineStatus> {
        self.status_rx.clone()
    }

    /// `(id, display_name)` pairs for every catalog behavior.
    pub fn events(&self) -> Vec<(String, String)> {
        self.catalog.listing()
    }

    pub fn event(&self, id: &str) -> Option<Arc<dyn Behavior>> {
        self.catalog.get(id).cloned()
    }

    /// Whether a menu should offer this behavior: known id, kill switch on,
    /// no cooldown pending. (The live gate still has the final say at
    /// trigger time.)
    pub fn is_event_enabled(&self, id: &str) -> bool {
        match self.catalog.get(id) {
            Some(b) => b.enabled() && self.remaining_of(b).is_none(),
            None => false,
        }
    }

    /// Remaining cooldown in whole seconds (rounded up), or `None` when the
    /// behavior could start as far as cooldowns are concerned.
    pub fn remaining_cooldown(&self, id: &str) -> Option<u64> {
        self.catalog
            .get(id)
            .and_then(|b| self.remaining_of(b))
            .map(cooldown::remaining_secs)
    }

    /// Remaining cooldown as menu text ("2m 30s"), or `None` when ready.
    pub fn cooldown_text(&self, id: &str) -> Option<String> {
        self.catalog
            .get(id)
            .and_then(|b| self.remaining_of(b))
            .map(cooldown::friendly_text)
    }

    fn remaining_of(&self, behavior: &Arc<dyn Behavior>) -> Option<Duration> {
        guard(&self.ledger).remaining(
            behavior.id(),
            Duration::from_secs(behavior.cooldown_secs()),
            Instant::now(),
        )
    }
}
