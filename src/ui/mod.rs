//! Terminal user interface.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `helpers` - Background task spawning
//! - `render` - View rendering dispatch and shared drawing helpers
//! - `catalog` - Filter bar and infinite game list
//! - `details` - Game page with comments
//! - `wishlist`, `profile`, `login` - Account views
//! - `help` - Keybinding overlay
//! - `status` - Status bar

mod catalog;
mod details;
mod events;
mod help;
mod helpers;
mod input;
mod login;
mod loop_runner;
mod profile;
mod render;
mod status;
mod wishlist;

pub use loop_runner::{run, Action};
