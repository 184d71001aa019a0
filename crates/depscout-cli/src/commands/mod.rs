//! Command implementations.
//!
//! - [`analyze`] - discover and reconcile a target's dependencies

pub mod analyze;

pub use analyze::execute as analyze_execute;
