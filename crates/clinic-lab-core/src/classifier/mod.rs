//! Reference range parsing and value classification.
//!
//! Pipeline: reference range text → [`ReferenceRange`] → [`classify`] → [`Alert`](crate::models::Alert)
//!
//! Everything here is pure. A non-numeric value or an unreadable range is not
//! an error; it simply yields `Alert::None` so incomplete entry never blocks a save.

mod alert;
mod range;

pub use alert::*;
pub use range::*;
