//! Small-signal figures of merit extracted from an AC sweep.

use crate::units::{Decibels, Degrees, Hertz};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar figures of merit that may be undefined for a given sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    DcGain,
    UnityGainFrequency,
    PhaseMargin,
    Bandwidth3Db,
    GainBandwidthProduct,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DcGain => "dc_gain",
            Self::UnityGainFrequency => "unity_gain_freq",
            Self::PhaseMargin => "phase_margin_at_ugf",
            Self::Bandwidth3Db => "bandwidth_3db",
            Self::GainBandwidthProduct => "gain_bandwidth_product",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a metric could not be computed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricDiagnostic {
    pub metric: Metric,
    pub reason: String,
}

/// Frequency-response metrics for one output quantity.
///
/// Per-sample vectors have one entry per sweep point, in sweep order.
/// Scalar fields are `None` when the input could not support them; the
/// matching entry in `diagnostics` says why.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyResponseMetrics {
    /// |vout|.
    pub magnitude: Vec<f64>,

    /// 20·log10(|vout|).
    pub gain_db: Vec<f64>,

    /// Phase in degrees shifted by +180 (phase margin convention).
    pub phase_margin_deg: Vec<f64>,

    /// Unshifted phase in radians.
    pub phase_rad: Vec<f64>,

    /// Magnitude at the reference (low) frequency.
    pub dc_gain: Option<f64>,
    pub dc_gain_db: Option<Decibels>,

    /// Frequency where |vout| crosses 1.0.
    pub unity_gain_freq: Option<Hertz>,

    /// Phase margin at the sample nearest the unity-gain frequency.
    pub phase_margin_at_ugf: Option<Degrees>,

    /// Span of the frequencies whose gain stays within 3 dB of `dc_gain_db`.
    pub bandwidth_3db: Option<Hertz>,

    /// `dc_gain × bandwidth_3db`.
    pub gain_bandwidth_product: Option<Hertz>,

    pub diagnostics: Vec<MetricDiagnostic>,
}

impl FrequencyResponseMetrics {
    /// Number of sweep points the vectors cover.
    #[inline]
    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// Whether every scalar metric was computed.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostic for a metric, if it was left undefined.
    pub fn diagnostic(&self, metric: Metric) -> Option<&MetricDiagnostic> {
        self.diagnostics.iter().find(|d| d.metric == metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_lookup() {
        let metrics = FrequencyResponseMetrics {
            diagnostics: vec![MetricDiagnostic {
                metric: Metric::Bandwidth3Db,
                reason: "no samples within 3 dB".to_string(),
            }],
            ..Default::default()
        };

        assert!(!metrics.is_complete());
        assert!(metrics.diagnostic(Metric::Bandwidth3Db).is_some());
        assert!(metrics.diagnostic(Metric::DcGain).is_none());
        assert_eq!(Metric::PhaseMargin.to_string(), "phase_margin_at_ugf");
    }
}
