pub mod api;
pub mod config;
pub mod dom;
pub mod error;
pub mod models;
pub mod protocol;
pub mod recording;
pub mod render;
