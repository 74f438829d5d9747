//! Shared test utilities for the gldas-climatology workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Builders for NetCDF-4 and DAP2 DODS buffers
//! - Synthetic multi-year series generators
//! - Sample OPeNDAP ASCII payloads and locations
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, NcBuilder, DodsBuilder};
//! ```

pub mod buffers;
pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use buffers::*;
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(38.95, 38.949999, 1e-4); // passes
/// assert_approx_eq!(1.1, 1.0, 0.001);        // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
