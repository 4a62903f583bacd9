//! Explicitly constructed contexts for both ends of hostlog.
//!
//! [`DeviceLogger`] is what an app logs through: it keeps local rotated files and forwards every line
//! to the host over a [`hl_link::SyncSession`]. [`HostNode`] is the companion process: a
//! [`hl_link::SyncServer`] persisting what it receives. Both are configured from a [`NodeConfig`].

mod config;
mod device;
mod error;
mod host;

pub use config::*;
pub use device::*;
pub use error::*;
pub use host::*;
