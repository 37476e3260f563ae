//! File system module
//!
//! Local-side building blocks of a sync run: destination path mapping,
//! pooled copy buffers, the buffered stream copier, and the local
//! filesystem seam.

mod buffer;
mod copier;
mod local;
mod mapper;

pub use buffer::*;
pub use copier::*;
pub use local::*;
pub use mapper::*;
