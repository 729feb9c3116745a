#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod data;
pub mod debounce;
pub mod download;
pub mod filter;
pub mod gallery;
pub mod github;
pub mod kitty;
pub mod logging;
pub mod media;
pub mod render;
pub mod state;
pub mod ui;
pub mod view;
pub mod viewer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
