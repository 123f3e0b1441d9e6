// Public API for integration tests and potential library usage

pub mod api;
pub mod config;
pub mod error;
pub mod protocol;
pub mod roles;
pub mod scoring;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

// Background snapshot writer
pub mod broadcast;
