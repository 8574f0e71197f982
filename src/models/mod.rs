//! Data models for the alerting pipeline

pub mod alert;
pub mod analysis;
pub mod monitor;

pub use alert::*;
pub use analysis::*;
pub use monitor::*;
