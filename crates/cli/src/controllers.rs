//! Simulated interaction controllers.
//!
//! In the real application these are the drag handler and the start menu;
//! here they are toggled from the REPL. They hold flags through the same
//! token API behaviors use, which is exactly the shared-resource contract:
//! nobody touches another owner's holder set.

use mochi_engine::{FlagRegistry, FlagToken, flag};

const DRAG_OWNER: &str = "drag-controller";
const MENU_OWNER: &str = "start-menu";

pub struct InteractionControllers {
    flags: FlagRegistry,
    drag: Option<FlagToken>,
    menu: Option<FlagToken>,
}

impl InteractionControllers {
    pub fn new(flags: FlagRegistry) -> Self {
        Self {
            flags,
            drag: None,
            menu: None,
        }
    }

    /// Start/stop a simulated drag. While dragging, the drag flag is held
    /// and the global gate stays closed.
    pub fn set_dragging(&mut self, dragging: bool) {
        if dragging {
            if self.drag.is_none() {
                self.drag = Some(self.flags.acquire(DRAG_OWNER, &[flag::DRAG]));
            }
        } else if let Some(token) = self.drag.take() {
            token.release();
        }
    }

    pub fn set_menu_open(&mut self, open: bool) {
        if open {
            if self.menu.is_none() {
                self.menu = Some(self.flags.acquire(MENU_OWNER, &[flag::MENU]));
            }
        } else if let Some(token) = self.menu.take() {
            token.release();
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu.is_some()
    }
}
