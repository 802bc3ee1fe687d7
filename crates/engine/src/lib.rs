//! `mochi-engine` — autonomous behavior scheduling for a desktop mascot.
//!
//! The engine decides which autonomous behavior (joke, weather report, nap,
//! ...) runs next, guarantees at most one runs at a time, keeps behaviors
//! from colliding with user interaction through a shared advisory flag
//! registry, and recovers from behaviors that hang or fail.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`flags`]     | `FlagRegistry` / `FlagToken` — named advisory capability flags |
//! | [`behavior`]  | `Behavior` trait, `BehaviorContext`, `BehaviorError`        |
//! | [`collab`]    | opaque sound/speech/scene collaborator traits               |
//! | [`catalog`]   | `BehaviorCatalog` — explicit behavior registration list     |
//! | [`cooldown`]  | `CooldownLedger` and cooldown presentation helpers          |
//! | [`config`]    | `EngineCfg` plus the live-config watch channel              |
//! | [`notify`]    | run-started notice channel for UI surfaces                  |
//! | [`scheduler`] | `Engine` / `EngineHandle` — the select loop itself          |
//!
//! # Concurrency model
//!
//! Single-threaded cooperative: the scheduler is one task multiplexing
//! timers and channels; behaviors are spawned futures that report back over
//! a completion channel. The flag registry is the only state shared more
//! widely, and everyone mutates it through the same token API.

pub mod behavior;
pub mod catalog;
pub mod collab;
pub mod config;
pub mod cooldown;
pub mod flags;
pub mod notify;
pub mod scheduler;

pub use behavior::{Behavior, BehaviorContext, BehaviorError, RunFuture};
pub use catalog::{BehaviorCatalog, CatalogError};
pub use collab::{Collaborators, SceneHandle, SoundHandle, SpeechHandle};
pub use config::EngineCfg;
pub use flags::{FlagRegistry, FlagToken, flag};
pub use notify::{NoticeReceiver, RunNotice};
pub use scheduler::{Engine, EngineHandle, EngineStatus, GateFn, RunOutcome};
