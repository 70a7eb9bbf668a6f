pub mod event;
pub mod log;
pub mod requests;
pub mod responses;
pub mod session;

pub use event::*;
pub use log::*;
pub use requests::*;
pub use responses::*;
pub use session::*;
