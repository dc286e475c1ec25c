pub mod arguments;
pub mod config;
pub mod persist;
pub mod render;
pub mod updater;
pub mod version;
