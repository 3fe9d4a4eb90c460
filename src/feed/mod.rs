//! Trade stream module
//!
//! Decodes inbound trade frames and keeps a streaming connection feeding
//! the price store, with an optional reconnect supervisor on top.

mod decoder;
mod stream;
mod supervisor;
mod types;

pub use decoder::decode_frame;
pub(crate) use decoder::price_from_value;
pub use stream::{StreamClient, StreamClientConfig};
pub use supervisor::{StreamSupervisor, SupervisorExit};
pub use types::{ConnectionState, StreamExit};
