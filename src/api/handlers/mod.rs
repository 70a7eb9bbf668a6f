pub mod health;
pub mod messages;
pub mod recording;
pub mod render;
