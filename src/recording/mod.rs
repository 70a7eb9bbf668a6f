pub mod coordinator;
pub mod recorder;

pub use coordinator::{Coordinator, RenderedScript, SessionUpdate};
pub use recorder::Recorder;
