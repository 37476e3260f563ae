//! Progress reporting
//!
//! Terminal progress bars for long sync runs.

mod reporter;

pub use reporter::*;
