//! Session layer: per-file state, the message types, and request dispatch.

pub mod dispatch;
pub mod request;
pub mod state;

pub use dispatch::Session;
pub use request::{DataFormat, Request, Response};
pub use state::{SessionRegistry, SessionState};
