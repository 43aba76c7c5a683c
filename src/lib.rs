//! gamedex: a terminal video game catalog with wishlists and comments.

pub mod account;
pub mod app;
pub mod catalog;
pub mod config;
pub mod feed;
pub mod keybindings;
pub mod preferences;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod util;
