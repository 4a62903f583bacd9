//! Wire format shared by the device and host sides of hostlog.
//!
//! A connection carries a sequence of frames. Each frame is a 4 byte little-endian length followed
//! by exactly one JSON encoded [`LogRecord`].

mod codec;
mod record;

pub use codec::*;
pub use record::*;
