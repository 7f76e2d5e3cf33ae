//! Analysis modules.
//!
//! Pure functions that turn activity records into weekly reports,
//! insights and trends.

pub mod aggregator;
pub mod insights;
pub mod trend;

pub use aggregator::*;
pub use trend::determine_trend;
