//! Tower middleware module
//!
//! Layers applied around the router in `main`.
pub mod timeout;

pub use timeout::{TimeoutLayer, TimeoutService};
