//! Analysis Layer
//!
//! Ranks the two captures against each other and renders the result.

pub mod comparison;
pub mod report;

pub use comparison::{ComparisonEngine, ComparisonReport};
pub use report::{render, ReportFormat};
