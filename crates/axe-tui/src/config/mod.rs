//! Configuration for the pager

mod keybindings;

pub use keybindings::{KeyBinding, KeyBindings};
