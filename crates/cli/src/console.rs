//! Console-backed collaborators: what a real host renders, we print.

use std::sync::Mutex;

use mochi_engine::{SceneHandle, SoundHandle, SpeechHandle};

pub struct ConsoleSound;

impl SoundHandle for ConsoleSound {
    fn play(&self, cue: &str) {
        println!("[sound] {cue}");
    }
}

pub struct ConsoleSpeech;

impl SpeechHandle for ConsoleSpeech {
    fn say(&self, text: &str) {
        println!("(mochi) {text}");
    }
}

/// In-memory decoration list standing in for the scene.
pub struct ConsoleScene {
    items: Mutex<Vec<String>>,
}

impl ConsoleScene {
    pub fn with_items(items: &[&str]) -> Self {
        Self {
            items: Mutex::new(items.iter().map(|s| (*s).to_owned()).collect()),
        }
    }

    pub fn add_decoration(&self, name: &str) {
        self.items.lock().unwrap().push(name.to_owned());
    }

    pub fn list(&self) -> Vec<String> {
        self.items.lock().unwrap().clone()
    }
}

impl SceneHandle for ConsoleScene {
    fn decoration_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    fn remove_decoration(&self) -> Option<String> {
        self.items.lock().unwrap().pop()
    }
}
