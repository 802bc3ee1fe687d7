//! Advisory capability flags shared between the scheduler, behaviors and the
//! host's interaction controllers.
//!
//! A flag is "enabled" while nobody holds it. Any number of owners may hold
//! the same flag; it becomes enabled again once every owner has released.
//! There is no blocking and no queueing — holders are advisory state, and the
//! scheduler's watchdog sweep (`clear_owner`) is the only lock-breaking
//! mechanism.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Well-known flag names. Hosts may invent additional flags; these are the
/// ones the stock interaction controllers and behaviors use.
pub mod flag {
    /// The user may pick the mascot up and drag it.
    pub const DRAG: &str = "drag";
    /// Autonomous eye blinking.
    pub const BLINK: &str = "blink";
    /// The mascot reacts to being petted.
    pub const PETTING: &str = "petting";
    /// The start menu may open.
    pub const MENU: &str = "menu";
    /// The eyes follow the cursor.
    pub const EYE_TRACKING: &str = "eye-tracking";
    /// Scene decorations may be spawned or removed.
    pub const DECORATIONS: &str = "decorations";
}

/// Reference-counted named-flag registry. Cheap to clone; all clones share
/// the same holder state.
#[derive(Clone, Default)]
pub struct FlagRegistry {
    inner: Arc<Mutex<HashMap<String, HashSet<String>>>>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, HashSet<String>>> {
        // Holder sets stay consistent even if a panic poisoned the mutex:
        // every mutation is a single insert/remove.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Add `owner` to the holder set of every flag in `flags` and return a
    /// token that releases exactly this acquisition. Never blocks.
    pub fn acquire(&self, owner: &str, flags: &[&str]) -> FlagToken {
        let mut map = self.guard();
        for f in flags {
            map.entry((*f).to_owned())
                .or_default()
                .insert(owner.to_owned());
        }
        drop(map);
        tracing::debug!(owner, ?flags, "flags acquired");
        FlagToken {
            registry: self.clone(),
            owner: owner.to_owned(),
            flags: flags.iter().map(|f| (*f).to_owned()).collect(),
            released: AtomicBool::new(false),
        }
    }

    /// True iff the flag has zero holders.
    pub fn is_enabled(&self, flag: &str) -> bool {
        !self.guard().contains_key(flag)
    }

    /// True iff at least one of the flags is currently held.
    pub fn any_disabled(&self, flags: &[&str]) -> bool {
        let map = self.guard();
        flags.iter().any(|f| map.contains_key(*f))
    }

    /// Current holders of a flag, mostly for diagnostics.
    pub fn holders(&self, flag: &str) -> Vec<String> {
        self.guard()
            .get(flag)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Force-remove `owner` from every flag it holds. Used when a run is
    /// forcibly finished so no flag can stay stuck behind a dead owner.
    pub fn clear_owner(&self, owner: &str) {
        let mut map = self.guard();
        let mut swept = 0usize;
        map.retain(|_, holders| {
            if holders.remove(owner) {
                swept += 1;
            }
            !holders.is_empty()
        });
        drop(map);
        if swept > 0 {
            tracing::debug!(owner, flags = swept, "owner swept from flags");
        }
    }

    fn release(&self, owner: &str, flags: &[String]) {
        let mut map = self.guard();
        for f in flags {
            if let Some(holders) = map.get_mut(f) {
                holders.remove(owner);
                if holders.is_empty() {
                    map.remove(f);
                }
            }
        }
    }
}

/// A releasable handle for one `acquire` call. `release()` is idempotent and
/// also runs on drop, but behaviors are expected to release explicitly —
/// the drop impl and the scheduler's `clear_owner` sweep are backstops.
pub struct FlagToken {
    registry: FlagRegistry,
    owner: String,
    flags: Vec<String>,
    released: AtomicBool,
}

impl FlagToken {
    /// Remove the owner from all flags named in this token. Safe to call
    /// more than once, and safe after the owner was already swept.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.registry.release(&self.owner, &self.flags);
        tracing::debug!(owner = %self.owner, flags = ?self.flags, "flags released");
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }
}

impl Drop for FlagToken {
    fn drop(&mut self) {
        self.release();
    }
}
