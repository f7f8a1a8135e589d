//! # lib-dsp
//!
//! Numerical analysis over decoded simulation results.
//!
//! - **Interpolation**: piecewise-linear lookup and nearest-sample readout
//! - **Frequency response**: DC gain, unity-gain frequency, phase margin,
//!   3 dB bandwidth and gain-bandwidth product from an AC sweep
//! - **Operating point**: per-device parameter tables with gm/id, V* and ro
//! - **Expressions**: a closed arithmetic evaluator for user formulas

pub mod error;
pub mod interpolation;
pub mod frequency_response;
pub mod expression;
pub mod op_point;

pub use error::{DspError, DspResult, ExprError};
pub use interpolation::{interpolate, interpolate_many, nearest_index, nearest_value};
pub use frequency_response::{analyze_frequency_response, FrequencyResponseAnalyzer};
pub use expression::{parse_expression, Expr};
pub use op_point::{
    extract_operating_points, parse_device_column, DeviceOperatingPoint, OperatingPointExtractor,
};
