//! Application state and actions

mod action;
mod pager;
mod state;

pub use action::Action;
pub use pager::Pager;
pub use state::AppState;
