//! Physical units with type safety.
//!
//! These newtypes keep frequencies, gains and angles from being mixed up
//! when figures of merit are passed between crates.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    /// Absolute distance between two frequencies.
    #[inline]
    pub fn distance(&self, other: Hertz) -> Hertz {
        Hertz((self.0 - other.0).abs())
    }
}

impl Mul<f64> for Hertz {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

/// Voltage gain in decibels (20·log10 of a magnitude ratio).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Decibels(pub f64);

impl Decibels {
    /// Convert a linear magnitude ratio to dB.
    ///
    /// A zero magnitude maps to negative infinity.
    #[inline]
    pub fn from_magnitude(magnitude: f64) -> Self {
        Self(20.0 * magnitude.log10())
    }
}

/// Angle in degrees.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Degrees(pub f64);

impl Degrees {
    #[inline]
    pub fn from_radians(radians: f64) -> Self {
        Self(radians.to_degrees())
    }
}

impl Add<f64> for Degrees {
    type Output = Self;
    fn add(self, rhs: f64) -> Self {
        Self(self.0 + rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decibels_from_magnitude() {
        let db = Decibels::from_magnitude(100.0);
        assert!((db.0 - 40.0).abs() < 1e-12);
        assert!((Decibels::from_magnitude(0.1).0 + 20.0).abs() < 1e-12);

        assert_eq!(Decibels::from_magnitude(0.0).0, f64::NEG_INFINITY);
    }

    #[test]
    fn test_frequency_arithmetic() {
        assert!((Hertz(10.0).distance(Hertz(4.0)).0 - 6.0).abs() < 1e-12);
        assert!((Hertz(4.0).distance(Hertz(10.0)).0 - 6.0).abs() < 1e-12);
        assert_eq!(Hertz(250.0) * 4.0, Hertz(1000.0));
    }

    #[test]
    fn test_degrees_radians() {
        let d = Degrees::from_radians(std::f64::consts::PI);
        assert!((d.0 - 180.0).abs() < 1e-12);
        assert!(((d + 180.0).0 - 360.0).abs() < 1e-12);
    }
}
