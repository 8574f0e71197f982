//! Enhancement node pool
//!
//! A fixed set of enhancement nodes created at startup, with per-node health
//! flags maintained by a periodic probe sweep, lock-free round-robin selection,
//! and a deterministic local fallback when no node can serve a request.

pub mod client;
pub mod registry;

pub use client::{fallback_enhancement, EnhancementClient};
pub use registry::{run_health_check_task, EnhancementNode, NodeRegistry};
