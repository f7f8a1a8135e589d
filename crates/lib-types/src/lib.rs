//! # lib-types
//!
//! Core type definitions shared across the Crunch workspace:
//! - Physical units with compile-time safety
//! - Decoded simulation plots, variables and sample matrices
//! - Frequency-response figures of merit

pub mod units;
pub mod plot;
pub mod metrics;

pub use units::*;
pub use plot::*;
pub use metrics::*;

/// Re-export num_complex for convenience
pub use num_complex::Complex64;
