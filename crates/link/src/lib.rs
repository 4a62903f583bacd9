//! Device to host log transport.
//!
//! The host runs a [`SyncServer`] which listens on TCP, advertises itself over mDNS and keeps at
//! most one [`Transport`] alive at a time. The device runs a [`SyncSession`] which browses for that
//! advertisement and connects to the first host it finds. Both ends exchange [`hl_proto::LogRecord`]s
//! and hand inbound ones to a [`RecordSink`].

mod active;
mod config;
mod discovery;
mod error;
mod server;
mod session;
mod sink;
mod status;
mod transport;

pub use config::*;
pub use discovery::*;
pub use error::*;
pub use server::*;
pub use session::*;
pub use sink::*;
pub use status::*;
pub use transport::*;
