//! Rotated log files.
//!
//! Log files are named `<file_name>_<index>.log`. The current index is never stored anywhere, it is
//! derived from the directory listing every time so it always matches what is on disk.

mod error;
mod indexer;
mod writer;

pub use error::*;
pub use indexer::*;
pub use writer::*;
