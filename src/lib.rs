pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod models;
pub mod request;
pub mod search;
pub mod session;
pub mod tui;
