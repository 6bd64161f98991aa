//! Domain models for the lab result workflow.

mod exam;
mod parameter;
mod result;

pub use exam::*;
pub use parameter::*;
pub use result::*;
