//! Small-signal figures of merit from an AC sweep.
//!
//! Given the sweep frequencies and the complex output quantity at each point,
//! [`FrequencyResponseAnalyzer`] derives:
//!
//! - magnitude, gain in dB and phase for every point
//! - DC gain, read at the sample nearest a low reference frequency
//! - unity-gain frequency, interpolated where |vout| crosses 1.0
//! - phase margin at the sample nearest the unity-gain frequency
//! - 3 dB bandwidth and gain-bandwidth product
//!
//! The analyzer holds no state between calls and can be shared freely
//! across threads.
//!
//! # Known limitations
//!
//! The unity-gain crossing is found by interpolating frequency as a function
//! of magnitude over the reversed sweep. When the magnitude is not monotonic
//! the first bracketing segment in that order wins, which need not be the
//! lowest crossing. When the magnitude never reaches 1.0 the result clamps to
//! one end of the sweep; this is logged but the value is kept.

use crate::error::{DspError, DspResult};
use crate::interpolation::{interpolate, nearest_index};
use lib_types::metrics::{FrequencyResponseMetrics, Metric, MetricDiagnostic};
use lib_types::units::{Decibels, Degrees, Hertz};
use num_complex::Complex64;

/// Default frequency at which the gain is treated as its DC value.
pub const DEFAULT_REFERENCE_FREQUENCY: Hertz = Hertz(10.0);

/// Magnitude that defines the unity-gain crossing (0 dB).
pub const UNITY_GAIN: f64 = 1.0;

/// Gain drop that bounds the bandwidth.
pub const BANDWIDTH_DROP_DB: f64 = 3.0;

/// Frequency-response metrics extractor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyResponseAnalyzer {
    reference_frequency: Hertz,
}

impl Default for FrequencyResponseAnalyzer {
    fn default() -> Self {
        Self {
            reference_frequency: DEFAULT_REFERENCE_FREQUENCY,
        }
    }
}

impl FrequencyResponseAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the DC gain nearest `reference` instead of the default 10 Hz.
    pub fn with_reference_frequency(reference: Hertz) -> Self {
        Self {
            reference_frequency: reference,
        }
    }

    pub fn reference_frequency(&self) -> Hertz {
        self.reference_frequency
    }

    /// Compute the metrics for one output quantity.
    ///
    /// `frequency` need not be sorted. Degenerate sweeps (empty, a single
    /// point, NaN at the reference) still produce a record: the affected
    /// scalars are `None` and listed in `diagnostics`. Only a length mismatch
    /// between the two inputs is an error.
    pub fn analyze(
        &self,
        frequency: &[f64],
        vout: &[Complex64],
    ) -> DspResult<FrequencyResponseMetrics> {
        if frequency.len() != vout.len() {
            return Err(DspError::LengthMismatch {
                expected: frequency.len(),
                actual: vout.len(),
            });
        }

        let magnitude: Vec<f64> = vout.iter().map(|v| v.norm()).collect();
        let gain_db: Vec<f64> = magnitude
            .iter()
            .map(|&m| Decibels::from_magnitude(m).0)
            .collect();
        let phase_rad: Vec<f64> = vout.iter().map(|v| v.arg()).collect();
        let phase_margin_deg: Vec<f64> = phase_rad
            .iter()
            .map(|&p| (Degrees::from_radians(p) + 180.0).0)
            .collect();

        let mut metrics = FrequencyResponseMetrics {
            magnitude,
            gain_db,
            phase_margin_deg,
            phase_rad,
            ..Default::default()
        };

        self.dc_gain(frequency, &mut metrics);
        unity_gain(frequency, &mut metrics)?;
        bandwidth(frequency, &mut metrics);

        metrics.gain_bandwidth_product = match (metrics.dc_gain, metrics.bandwidth_3db) {
            (Some(a0), Some(bw)) => Some(bw * a0),
            _ => {
                undefined(
                    &mut metrics,
                    Metric::GainBandwidthProduct,
                    "requires both DC gain and 3 dB bandwidth",
                );
                None
            }
        };

        Ok(metrics)
    }

    fn dc_gain(&self, frequency: &[f64], metrics: &mut FrequencyResponseMetrics) {
        let Some(idx) = nearest_index(frequency, self.reference_frequency.0) else {
            undefined(metrics, Metric::DcGain, "the sweep has no points");
            return;
        };

        let a0 = metrics.magnitude[idx];
        if a0.is_nan() {
            let reason = format!("magnitude at {} Hz is NaN", frequency[idx]);
            undefined(metrics, Metric::DcGain, reason);
            return;
        }

        tracing::debug!(
            "Reference point {} Hz (index {}): A0 = {}",
            frequency[idx],
            idx,
            a0
        );
        metrics.dc_gain = Some(a0);
        metrics.dc_gain_db = Some(Decibels(metrics.gain_db[idx]));
    }
}

/// Analyze with the default reference frequency.
pub fn analyze_frequency_response(
    frequency: &[f64],
    vout: &[Complex64],
) -> DspResult<FrequencyResponseMetrics> {
    FrequencyResponseAnalyzer::default().analyze(frequency, vout)
}

fn unity_gain(frequency: &[f64], metrics: &mut FrequencyResponseMetrics) -> DspResult<()> {
    if frequency.len() < 2 {
        let reason = format!("interpolation needs at least 2 points, got {}", frequency.len());
        undefined(metrics, Metric::UnityGainFrequency, reason);
        undefined(metrics, Metric::PhaseMargin, "unity-gain frequency is undefined");
        return Ok(());
    }

    // Frequency as a function of magnitude, walked from the top of the sweep.
    let magnitude_rev: Vec<f64> = metrics.magnitude.iter().rev().copied().collect();
    let frequency_rev: Vec<f64> = frequency.iter().rev().copied().collect();
    let ugf = interpolate(&magnitude_rev, &frequency_rev, UNITY_GAIN)?;

    if !ugf.is_finite() {
        undefined(metrics, Metric::UnityGainFrequency, "interpolated crossing is not finite");
        undefined(metrics, Metric::PhaseMargin, "unity-gain frequency is undefined");
        return Ok(());
    }

    if !crosses_unity(&metrics.magnitude) {
        tracing::warn!(
            "Magnitude never crosses {}; unity-gain frequency clamped to {} Hz",
            UNITY_GAIN,
            ugf
        );
    }
    metrics.unity_gain_freq = Some(Hertz(ugf));

    // `ugf` is finite, so at least one frequency is comparable to it unless
    // every frequency is NaN.
    match nearest_index(frequency, ugf) {
        Some(idx) => {
            metrics.phase_margin_at_ugf = Some(Degrees(metrics.phase_margin_deg[idx]));
        }
        None => undefined(metrics, Metric::PhaseMargin, "no comparable frequency near the crossing"),
    }
    Ok(())
}

fn bandwidth(frequency: &[f64], metrics: &mut FrequencyResponseMetrics) {
    let Some(reference_db) = metrics.dc_gain_db else {
        undefined(metrics, Metric::Bandwidth3Db, "DC gain is undefined");
        return;
    };
    let threshold = reference_db.0 - BANDWIDTH_DROP_DB;

    // Span over the qualifying samples in sweep order, not a -3 dB crossing.
    let mut qualifying = frequency
        .iter()
        .zip(&metrics.gain_db)
        .filter(|(_, &g)| g >= threshold)
        .map(|(&f, _)| f);

    match qualifying.next() {
        Some(first) => {
            let last = qualifying.last().unwrap_or(first);
            metrics.bandwidth_3db = Some(Hertz(last).distance(Hertz(first)));
        }
        // Unreachable while the reference sample itself qualifies; a NaN
        // reference is what actually leaves the bandwidth undefined, above.
        None => {
            let reason = format!("no samples within {} dB of the DC gain", BANDWIDTH_DROP_DB);
            undefined(metrics, Metric::Bandwidth3Db, reason);
        }
    }
}

/// Whether the magnitude has samples on both sides of unity.
fn crosses_unity(magnitude: &[f64]) -> bool {
    magnitude.iter().any(|&m| m >= UNITY_GAIN) && magnitude.iter().any(|&m| m <= UNITY_GAIN)
}

fn undefined(metrics: &mut FrequencyResponseMetrics, metric: Metric, reason: impl Into<String>) {
    let reason = reason.into();
    tracing::warn!("{} could not be computed: {}", metric, reason);
    metrics.diagnostics.push(MetricDiagnostic { metric, reason });
}
