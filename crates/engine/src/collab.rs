//! Opaque collaborator handles passed through to behaviors.
//!
//! The engine never calls these itself — it only stores them and hands them
//! to each run through [`BehaviorContext`](crate::behavior::BehaviorContext).
//! Rendering, audio mixing and scene physics live behind these traits in the
//! host application.

use std::sync::Arc;

/// Sound playback by cue name ("snore", "pop", ...).
pub trait SoundHandle: Send + Sync {
    fn play(&self, cue: &str);
}

/// Speech-bubble queue. Lines are queued, not interleaved; the typewriter
/// effect is the host's concern.
pub trait SpeechHandle: Send + Sync {
    fn say(&self, text: &str);
}

/// Scene and decoration mutation.
pub trait SceneHandle: Send + Sync {
    fn decoration_count(&self) -> usize;
    /// Remove one decoration, returning its name if any was present.
    fn remove_decoration(&self) -> Option<String>;
}

/// The collaborator bundle a host supplies at engine construction.
#[derive(Clone)]
pub struct Collaborators {
    pub sound: Arc<dyn SoundHandle>,
    pub speech: Arc<dyn SpeechHandle>,
    pub scene: Arc<dyn SceneHandle>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            sound: Arc::new(NoopSound),
            speech: Arc::new(NoopSpeech),
            scene: Arc::new(NoopScene),
        }
    }
}

/// Discards every cue. Useful for tests and headless hosts.
pub struct NoopSound;

impl SoundHandle for NoopSound {
    fn play(&self, _cue: &str) {}
}

/// Discards every line.
pub struct NoopSpeech;

impl SpeechHandle for NoopSpeech {
    fn say(&self, _text: &str) {}
}

/// An empty scene with nothing to remove.
pub struct NoopScene;

impl SceneHandle for NoopScene {
    fn decoration_count(&self) -> usize {
        0
    }

    fn remove_decoration(&self) -> Option<String> {
        None
    }
}
