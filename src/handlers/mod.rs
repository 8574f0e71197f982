//! HTTP handlers for Dynamo Sentinel

mod health;
mod monitors;
mod ws;

pub use health::*;
pub use monitors::*;
pub use ws::*;
