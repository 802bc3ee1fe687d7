//! Recording collaborator stubs shared by the behavior tests.

use std::sync::{Arc, Mutex};

use mochi_engine::{Collaborators, SceneHandle, SoundHandle, SpeechHandle};

#[derive(Default)]
pub struct RecordingSpeech(pub Mutex<Vec<String>>);

impl SpeechHandle for RecordingSpeech {
    fn say(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_owned());
    }
}

#[derive(Default)]
pub struct RecordingSound(pub Mutex<Vec<String>>);

impl SoundHandle for RecordingSound {
    fn play(&self, cue: &str) {
        self.0.lock().unwrap().push(cue.to_owned());
    }
}

pub struct StubScene {
    items: Mutex<Vec<String>>,
}

impl StubScene {
    pub fn with_items(items: &[&str]) -> Self {
        Self {
            items: Mutex::new(items.iter().map(|s| (*s).to_owned()).collect()),
        }
    }
}

impl SceneHandle for StubScene {
    fn decoration_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    fn remove_decoration(&self) -> Option<String> {
        self.items.lock().unwrap().pop()
    }
}

pub struct Recorded {
    pub speech: Arc<RecordingSpeech>,
    pub sound: Arc<RecordingSound>,
    pub scene: Arc<StubScene>,
    pub collab: Collaborators,
}

pub fn recording_collaborators(scene_items: &[&str]) -> Recorded {
    let speech = Arc::new(RecordingSpeech::default());
    let sound = Arc::new(RecordingSound::default());
    let scene = Arc::new(StubScene::with_items(scene_items));
    let collab = Collaborators {
        sound: sound.clone(),
        speech: speech.clone(),
        scene: scene.clone(),
    };
    Recorded {
        speech,
        sound,
        scene,
        collab,
    }
}
