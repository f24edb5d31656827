//! Terminal pager for axe
//!
//! Shows the merged log feed in a scrollback pager with a status bar,
//! key bindings and a throughput meter. Nothing here talks to the cluster;
//! the binary feeds records in.

pub mod app;
pub mod config;
pub mod meter;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, Pager};
pub use config::{KeyBinding, KeyBindings};
pub use meter::{Throughput, humanize_bytes};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar};
pub use ui::screens::PagerScreen;
pub use ui::{Layout, Theme};
