pub mod config;
pub mod engine;
pub mod holiday;
pub mod http;
pub mod limits;
pub mod loader;
pub mod model;
pub mod observability;
pub mod reloader;
