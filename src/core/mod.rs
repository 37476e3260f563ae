//! Core sync pipeline
//!
//! Remote tree enumeration, transfer scheduling and the run report.

mod engine;
mod report;
mod scheduler;
mod walker;

pub use engine::*;
pub use report::*;
pub use scheduler::*;
pub use walker::*;
