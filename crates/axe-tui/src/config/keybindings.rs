use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use crate::app::Action;

/// A key combination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn shift(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::SHIFT,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Keybinding configuration - less-like navigation
pub struct KeyBindings {
    bindings: HashMap<KeyBinding, Action>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();

        bindings.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        bindings.insert(KeyBinding::new(KeyCode::Char('q')), Action::Quit);
        bindings.insert(KeyBinding::new(KeyCode::Char('?')), Action::ToggleHelp);
        bindings.insert(KeyBinding::shift(KeyCode::Char('?')), Action::ToggleHelp);

        // Line navigation
        bindings.insert(KeyBinding::new(KeyCode::Char('j')), Action::ScrollDown(1));
        bindings.insert(KeyBinding::new(KeyCode::Down), Action::ScrollDown(1));
        bindings.insert(KeyBinding::new(KeyCode::Char('k')), Action::ScrollUp(1));
        bindings.insert(KeyBinding::new(KeyCode::Up), Action::ScrollUp(1));

        // Page navigation
        bindings.insert(KeyBinding::new(KeyCode::PageDown), Action::PageDown);
        bindings.insert(KeyBinding::new(KeyCode::PageUp), Action::PageUp);
        bindings.insert(KeyBinding::ctrl(KeyCode::Char('f')), Action::PageDown);
        bindings.insert(KeyBinding::ctrl(KeyCode::Char('b')), Action::PageUp);

        // Top/bottom
        bindings.insert(KeyBinding::new(KeyCode::Char('g')), Action::ScrollToTop);
        bindings.insert(KeyBinding::new(KeyCode::Home), Action::ScrollToTop);
        bindings.insert(KeyBinding::shift(KeyCode::Char('G')), Action::ScrollToBottom);
        bindings.insert(KeyBinding::new(KeyCode::Char('G')), Action::ScrollToBottom);
        bindings.insert(KeyBinding::new(KeyCode::End), Action::ScrollToBottom);

        bindings.insert(KeyBinding::new(KeyCode::Char('f')), Action::ToggleFollow);

        Self { bindings }
    }

    /// Look up the action for a key event
    pub fn get_action(&self, key: &KeyEvent) -> Option<Action> {
        self.bindings.get(&KeyBinding::from_event(key)).cloned()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}
