//! Pressure reduction: per-angle averaging, drift correction, and
//! pressure coefficients.
//!
//! Each steady AOA is logged for several seconds, so a raw table holds many
//! rows per angle. Rows are averaged per [`NormalizedAngle`], the unit under
//! test is zeroed against the tunnel reference using the `Drift Data`
//! baseline, and three coefficients are formed over the impact pressure
//! `q_c = P_ref_total - P_ref_static`.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::core::angle::{AngleFormatError, AngleParser, NormalizedAngle, DRIFT_DATA};
use crate::core::loaders::RawTable;
use crate::core::schema::{ColumnMapping, Field, SchemaError};

/// Errors that can occur while reducing a raw table.
#[derive(Debug, Error)]
pub enum ReductionError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("line {line}: {source}")]
    Angle {
        line: usize,
        #[source]
        source: AngleFormatError,
    },

    #[error("line {line}: no value for {field}")]
    MissingValue { line: usize, field: Field },

    #[error("line {line}: cannot parse {field} value '{value}'")]
    InvalidValue {
        line: usize,
        field: Field,
        value: String,
    },

    #[error("no '{marker}' rows found, drift correction needs a baseline", marker = DRIFT_DATA)]
    MissingBaseline,

    #[error("impact pressure is zero at {angle} deg AOA")]
    ZeroImpactPressure { angle: i32 },
}

/// Result type for reduction operations.
pub type Result<T> = std::result::Result<T, ReductionError>;

/// A pressure-coefficient series compared between probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    TotalPressure,
    StaticPressure1,
    StaticPressure2,
}

impl Channel {
    pub const ALL: [Channel; 3] = [
        Channel::TotalPressure,
        Channel::StaticPressure1,
        Channel::StaticPressure2,
    ];

    /// Column name of the coefficient.
    pub fn column_name(self) -> &'static str {
        match self {
            Channel::TotalPressure => "cp_total_pressure",
            Channel::StaticPressure1 => "cp_static_pressure1",
            Channel::StaticPressure2 => "cp_static_pressure2",
        }
    }

    /// Plot title.
    pub fn title(self) -> &'static str {
        match self {
            Channel::TotalPressure => "Total Pressure",
            Channel::StaticPressure1 => "Static Pressure 1",
            Channel::StaticPressure2 => "Static Pressure 2",
        }
    }

    /// Short tag used in artifact file names.
    pub fn tag(self) -> &'static str {
        match self {
            Channel::TotalPressure => "total",
            Channel::StaticPressure1 => "static1",
            Channel::StaticPressure2 => "static2",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// The five pressures carried per angle group.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pressures {
    pub tunnel_ref_total: f64,
    pub tunnel_ref_static: f64,
    pub uut_total: f64,
    pub uut_static1: f64,
    pub uut_static2: f64,
}

impl Pressures {
    fn accumulate(&mut self, other: &Pressures) {
        self.tunnel_ref_total += other.tunnel_ref_total;
        self.tunnel_ref_static += other.tunnel_ref_static;
        self.uut_total += other.uut_total;
        self.uut_static1 += other.uut_static1;
        self.uut_static2 += other.uut_static2;
    }

    fn divided_by(&self, n: f64) -> Pressures {
        Pressures {
            tunnel_ref_total: self.tunnel_ref_total / n,
            tunnel_ref_static: self.tunnel_ref_static / n,
            uut_total: self.uut_total / n,
            uut_static1: self.uut_static1 / n,
            uut_static2: self.uut_static2 / n,
        }
    }

    /// Impact pressure `q_c`.
    #[inline]
    pub fn impact_pressure(&self) -> f64 {
        self.tunnel_ref_total - self.tunnel_ref_static
    }
}

/// Additive zero offsets taken from the drift baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftOffsets {
    pub total: f64,
    pub static1: f64,
    pub static2: f64,
}

impl DriftOffsets {
    pub fn from_baseline(baseline: &Pressures) -> Self {
        Self {
            total: baseline.tunnel_ref_total - baseline.uut_total,
            static1: baseline.tunnel_ref_static - baseline.uut_static1,
            static2: baseline.tunnel_ref_static - baseline.uut_static2,
        }
    }

    /// Shift the unit-under-test pressures; reference pressures are untouched.
    pub fn apply(&self, raw: &Pressures) -> Pressures {
        Pressures {
            uut_total: raw.uut_total + self.total,
            uut_static1: raw.uut_static1 + self.static1,
            uut_static2: raw.uut_static2 + self.static2,
            ..*raw
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureCoefficients {
    pub total: f64,
    pub static1: f64,
    pub static2: f64,
}

impl PressureCoefficients {
    /// Coefficients of corrected pressures, all over the same `q_c`.
    pub fn from_corrected(p: &Pressures, impact_pressure: f64) -> Self {
        Self {
            total: (p.tunnel_ref_total - p.uut_total) / impact_pressure,
            static1: (p.tunnel_ref_static - p.uut_static1) / impact_pressure,
            static2: (p.tunnel_ref_static - p.uut_static2) / impact_pressure,
        }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::TotalPressure => self.total,
            Channel::StaticPressure1 => self.static1,
            Channel::StaticPressure2 => self.static2,
        }
    }
}

/// Reduced values for one angle group.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleRecord {
    /// Raw rows averaged into this record.
    pub samples: usize,
    /// Drift-corrected mean pressures.
    pub pressures: Pressures,
    pub impact_pressure: f64,
    /// `None` for the drift baseline, whose `q_c` is not a usable divisor.
    pub coefficients: Option<PressureCoefficients>,
}

/// Drift-corrected coefficient profile of one probe, keyed by angle.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedProfile {
    records: BTreeMap<NormalizedAngle, AngleRecord>,
    offsets: DriftOffsets,
}

impl ReducedProfile {
    pub fn get(&self, angle: NormalizedAngle) -> Option<&AngleRecord> {
        self.records.get(&angle)
    }

    /// The drift baseline record; `reduce` never yields a profile without one.
    pub fn baseline(&self) -> Option<&AngleRecord> {
        self.records.get(&NormalizedAngle::Drift)
    }

    pub fn offsets(&self) -> &DriftOffsets {
        &self.offsets
    }

    /// All records in angle order, baseline first.
    pub fn iter(&self) -> impl Iterator<Item = (NormalizedAngle, &AngleRecord)> {
        self.records.iter().map(|(&a, r)| (a, r))
    }

    /// Degrees of every non-baseline group, ascending.
    pub fn angles(&self) -> Vec<i32> {
        self.records.keys().filter_map(|a| a.degrees()).collect()
    }

    pub fn coefficient(&self, degrees: i32, channel: Channel) -> Option<f64> {
        self.records
            .get(&NormalizedAngle::Degrees(degrees))
            .and_then(|r| r.coefficients)
            .map(|c| c.get(channel))
    }

    /// Number of angle groups, baseline included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Default)]
struct GroupAccumulator {
    sum: Pressures,
    count: usize,
}

impl GroupAccumulator {
    fn add(&mut self, reading: &Pressures) {
        self.sum.accumulate(reading);
        self.count += 1;
    }

    fn mean(&self) -> Pressures {
        self.sum.divided_by(self.count as f64)
    }
}

/// Reduce a raw table into a [`ReducedProfile`].
///
/// # Errors
///
/// Fails on the first unparseable angle label or pressure cell, when no
/// `Drift Data` group exists, and when a non-baseline group has zero
/// impact pressure.
pub fn reduce(
    table: &RawTable,
    mapping: &ColumnMapping,
    parser: &dyn AngleParser,
) -> Result<ReducedProfile> {
    mapping.validate_width(table.width())?;

    let angle_col = mapping.column_of(Field::Angle);
    let mut groups: BTreeMap<NormalizedAngle, GroupAccumulator> = BTreeMap::new();

    for (idx, row) in table.rows().iter().enumerate() {
        let line = table.line_of(idx);
        let label = cell(row, angle_col, Field::Angle, line)?;
        let angle = parser
            .normalize(label)
            .map_err(|source| ReductionError::Angle { line, source })?;

        let reading = Pressures {
            tunnel_ref_total: pressure(row, mapping, Field::TunnelRefTotalPressure, line)?,
            tunnel_ref_static: pressure(row, mapping, Field::TunnelRefStaticPressure, line)?,
            uut_total: pressure(row, mapping, Field::UutTotalPressure, line)?,
            uut_static1: pressure(row, mapping, Field::UutStaticPressure1, line)?,
            uut_static2: pressure(row, mapping, Field::UutStaticPressure2, line)?,
        };
        groups.entry(angle).or_default().add(&reading);
    }

    let baseline = groups
        .get(&NormalizedAngle::Drift)
        .ok_or(ReductionError::MissingBaseline)?
        .mean();
    let offsets = DriftOffsets::from_baseline(&baseline);
    log::debug!(
        "Drift offsets: total={:.6}, static1={:.6}, static2={:.6}",
        offsets.total,
        offsets.static1,
        offsets.static2
    );

    let mut records = BTreeMap::new();
    for (angle, group) in &groups {
        let pressures = offsets.apply(&group.mean());
        let impact_pressure = pressures.impact_pressure();

        let coefficients = match angle.degrees() {
            None => None,
            Some(degrees) => {
                if impact_pressure == 0.0 {
                    return Err(ReductionError::ZeroImpactPressure { angle: degrees });
                }
                Some(PressureCoefficients::from_corrected(&pressures, impact_pressure))
            }
        };

        records.insert(
            *angle,
            AngleRecord {
                samples: group.count,
                pressures,
                impact_pressure,
                coefficients,
            },
        );
    }

    log::info!(
        "Reduced {} rows into {} angle groups",
        table.len(),
        records.len()
    );

    Ok(ReducedProfile { records, offsets })
}

fn cell<'a>(row: &'a [String], column: usize, field: Field, line: usize) -> Result<&'a str> {
    match row.get(column).map(String::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ReductionError::MissingValue { line, field }),
    }
}

fn pressure(row: &[String], mapping: &ColumnMapping, field: Field, line: usize) -> Result<f64> {
    let text = cell(row, mapping.column_of(field), field, line)?;
    text.parse::<f64>()
        .map_err(|_| ReductionError::InvalidValue {
            line,
            field,
            value: text.to_string(),
        })
}
