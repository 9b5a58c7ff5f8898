pub mod api;
pub mod config;
pub mod engine;
pub mod identity;
pub mod platform;
pub mod source;
pub mod store;
