pub mod app;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod storage;

// Tunables persisted alongside the app state
pub mod config;

pub use app::App;

pub const DATA_DIR_NAME: &str = "gemchat";
