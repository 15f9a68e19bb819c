//! Golden-vs-unit repeatability comparison.
//!
//! The unit under test passes a channel when, at every AOA, its coefficient
//! minus the golden coefficient stays inside a band of half-width
//! `origin_bound + slope * |AOA|`. Values on the boundary pass.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::config::ToleranceConfig;
use super::reduction::{Channel, ReducedProfile};

/// Errors that can occur while comparing two profiles.
#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error(
        "{channel}: angle sets differ (golden only: {golden_only:?}, uut only: {uut_only:?})"
    )]
    ProfileMismatch {
        channel: Channel,
        golden_only: Vec<i32>,
        uut_only: Vec<i32>,
    },

    #[error("{channel}: no coefficient at {angle} deg AOA")]
    MissingCoefficient { channel: Channel, angle: i32 },
}

/// Result type for comparison operations.
pub type Result<T> = std::result::Result<T, ComparisonError>;

/// Tolerance band that widens linearly with |AOA|.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceBand {
    pub origin_bound: f64,
    pub slope_per_degree: f64,
}

impl ToleranceBand {
    pub const DEFAULT_SLOPE: f64 = 0.0005;

    pub fn new(origin_bound: f64) -> Self {
        Self::with_slope(origin_bound, Self::DEFAULT_SLOPE)
    }

    pub fn with_slope(origin_bound: f64, slope_per_degree: f64) -> Self {
        Self {
            origin_bound,
            slope_per_degree,
        }
    }

    /// The band configured for `channel`.
    pub fn for_channel(channel: Channel, config: &ToleranceConfig) -> Self {
        let origin_bound = match channel {
            Channel::TotalPressure => config.total_pressure_bound,
            Channel::StaticPressure1 | Channel::StaticPressure2 => config.static_pressure_bound,
        };
        Self::with_slope(origin_bound, config.slope_per_degree)
    }

    pub fn upper(&self, angle: i32) -> f64 {
        let a = f64::from(angle);
        if angle >= 0 {
            self.origin_bound + self.slope_per_degree * a
        } else {
            self.origin_bound - self.slope_per_degree * a
        }
    }

    pub fn lower(&self, angle: i32) -> f64 {
        let a = f64::from(angle);
        if angle >= 0 {
            -self.origin_bound - self.slope_per_degree * a
        } else {
            -self.origin_bound + self.slope_per_degree * a
        }
    }

    /// Fails only on strict excursions.
    #[inline]
    pub fn accepts(&self, angle: i32, difference: f64) -> bool {
        !(difference > self.upper(angle) || difference < self.lower(angle))
    }
}

/// Run-level or per-angle outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    /// Single-letter flag used in report rows.
    pub fn flag(self) -> &'static str {
        match self {
            Verdict::Pass => "P",
            Verdict::Fail => "F",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonPoint {
    pub angle: i32,
    /// uut minus golden coefficient.
    pub difference: f64,
    pub upper: f64,
    pub lower: f64,
    pub verdict: Verdict,
}

/// Per-channel comparison, ordered by ascending angle.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub channel: Channel,
    pub band: ToleranceBand,
    pub points: Vec<ComparisonPoint>,
}

impl ComparisonResult {
    /// `Fail` if any angle fails.
    pub fn verdict(&self) -> Verdict {
        if self.points.iter().any(|p| p.verdict == Verdict::Fail) {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }

    /// Angles outside the band.
    pub fn failures(&self) -> Vec<i32> {
        self.points
            .iter()
            .filter(|p| p.verdict == Verdict::Fail)
            .map(|p| p.angle)
            .collect()
    }
}

/// Compare one coefficient channel of `uut` against `golden`.
///
/// The drift baseline is never compared.
///
/// # Errors
///
/// [`ComparisonError::ProfileMismatch`] when the two profiles were not
/// measured at the same set of angles.
pub fn compare(
    golden: &ReducedProfile,
    uut: &ReducedProfile,
    channel: Channel,
    band: ToleranceBand,
) -> Result<ComparisonResult> {
    let golden_angles: BTreeSet<i32> = golden.angles().into_iter().collect();
    let uut_angles: BTreeSet<i32> = uut.angles().into_iter().collect();

    if golden_angles != uut_angles {
        return Err(ComparisonError::ProfileMismatch {
            channel,
            golden_only: golden_angles.difference(&uut_angles).copied().collect(),
            uut_only: uut_angles.difference(&golden_angles).copied().collect(),
        });
    }

    let mut points = Vec::with_capacity(golden_angles.len());
    for angle in golden_angles {
        let coefficient = |profile: &ReducedProfile| {
            profile
                .coefficient(angle, channel)
                .ok_or(ComparisonError::MissingCoefficient { channel, angle })
        };
        let difference = coefficient(uut)? - coefficient(golden)?;

        let verdict = if band.accepts(angle, difference) {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        points.push(ComparisonPoint {
            angle,
            difference,
            upper: band.upper(angle),
            lower: band.lower(angle),
            verdict,
        });
    }

    let result = ComparisonResult {
        channel,
        band,
        points,
    };
    log::debug!(
        "{}: {} angles compared, failures at {:?}",
        channel,
        result.points.len(),
        result.failures()
    );

    Ok(result)
}
