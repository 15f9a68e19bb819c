//! Angle-of-attack label normalization.
//!
//! Tunnel logs record the run condition as free text, e.g.
//! `"Sweep 2 ATP  at -10 deg AOA"` or `"Drift Data 14:02"`. Labels are
//! reduced to a [`NormalizedAngle`] so rows can be grouped per angle.
//!
//! The default [`MarkerAngleParser`] only understands the layout above. Other
//! logging formats need their own [`AngleParser`] (or a [`RegexAngleParser`]).

use std::fmt;

use regex::Regex;
use thiserror::Error;

use crate::config::AngleConfig;

/// Text of the drift baseline sentinel.
pub const DRIFT_DATA: &str = "Drift Data";

/// Errors raised when a label does not match the expected layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AngleFormatError {
    #[error("angle label '{label}' is missing marker '{marker}'")]
    MissingMarker { label: String, marker: String },

    #[error("angle label '{label}' has non-integer AOA '{value}'")]
    NotAnInteger { label: String, value: String },

    #[error("angle label '{label}' does not match pattern '{pattern}'")]
    NoMatch { label: String, pattern: String },

    #[error("invalid angle pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Result type for angle parsing.
pub type Result<T> = std::result::Result<T, AngleFormatError>;

/// Grouping key for a row: the drift baseline or a whole-degree AOA.
///
/// Orders the baseline first, then degrees ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NormalizedAngle {
    Drift,
    Degrees(i32),
}

impl NormalizedAngle {
    #[inline]
    pub fn is_drift(self) -> bool {
        matches!(self, NormalizedAngle::Drift)
    }

    /// Degrees, `None` for the baseline.
    #[inline]
    pub fn degrees(self) -> Option<i32> {
        match self {
            NormalizedAngle::Drift => None,
            NormalizedAngle::Degrees(d) => Some(d),
        }
    }
}

impl fmt::Display for NormalizedAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedAngle::Drift => f.write_str(DRIFT_DATA),
            NormalizedAngle::Degrees(d) => write!(f, "{}", d),
        }
    }
}

/// Strategy turning a raw angle label into a [`NormalizedAngle`].
pub trait AngleParser {
    fn normalize(&self, label: &str) -> Result<NormalizedAngle>;
}

/// Parser for labels of the form `... <prefix> <N> <suffix> ...`.
#[derive(Debug, Clone)]
pub struct MarkerAngleParser {
    drift_marker: String,
    prefix: String,
    suffix: String,
}

impl MarkerAngleParser {
    pub fn new(
        drift_marker: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            drift_marker: drift_marker.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}

impl Default for MarkerAngleParser {
    fn default() -> Self {
        Self::new(DRIFT_DATA, "ATP  at", "deg AOA")
    }
}

impl AngleParser for MarkerAngleParser {
    fn normalize(&self, label: &str) -> Result<NormalizedAngle> {
        if label.contains(&self.drift_marker) {
            return Ok(NormalizedAngle::Drift);
        }

        let missing = |marker: &str| AngleFormatError::MissingMarker {
            label: label.to_string(),
            marker: marker.to_string(),
        };

        // Value sits after the last prefix and before the next suffix.
        let (_, after_prefix) = label
            .rsplit_once(self.prefix.as_str())
            .ok_or_else(|| missing(&self.prefix))?;
        let (interior, _) = after_prefix
            .split_once(self.suffix.as_str())
            .ok_or_else(|| missing(&self.suffix))?;

        let value = interior.trim();
        value
            .parse::<i32>()
            .map(NormalizedAngle::Degrees)
            .map_err(|_| AngleFormatError::NotAnInteger {
                label: label.to_string(),
                value: value.to_string(),
            })
    }
}

/// Parser driven by a regex with a capture group named `deg`.
#[derive(Debug, Clone)]
pub struct RegexAngleParser {
    drift_marker: String,
    pattern: Regex,
}

impl RegexAngleParser {
    pub fn new(drift_marker: impl Into<String>, pattern: &str) -> Result<Self> {
        let invalid = |message: String| AngleFormatError::InvalidPattern {
            pattern: pattern.to_string(),
            message,
        };
        let regex = Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;
        if !regex.capture_names().any(|name| name == Some("deg")) {
            return Err(invalid("missing capture group 'deg'".to_string()));
        }
        Ok(Self {
            drift_marker: drift_marker.into(),
            pattern: regex,
        })
    }
}

impl AngleParser for RegexAngleParser {
    fn normalize(&self, label: &str) -> Result<NormalizedAngle> {
        if label.contains(&self.drift_marker) {
            return Ok(NormalizedAngle::Drift);
        }

        let captures = self
            .pattern
            .captures(label)
            .ok_or_else(|| AngleFormatError::NoMatch {
                label: label.to_string(),
                pattern: self.pattern.as_str().to_string(),
            })?;
        let value = captures.name("deg").map_or("", |m| m.as_str()).trim();
        value
            .parse::<i32>()
            .map(NormalizedAngle::Degrees)
            .map_err(|_| AngleFormatError::NotAnInteger {
                label: label.to_string(),
                value: value.to_string(),
            })
    }
}

/// Build the parser selected by `config`.
pub fn parser_from_config(config: &AngleConfig) -> Result<Box<dyn AngleParser>> {
    match &config.pattern {
        Some(pattern) => Ok(Box::new(RegexAngleParser::new(
            config.drift_marker.clone(),
            pattern,
        )?)),
        None => Ok(Box::new(MarkerAngleParser::new(
            config.drift_marker.clone(),
            config.aoa_prefix.clone(),
            config.aoa_suffix.clone(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_label_anywhere() {
        let parser = MarkerAngleParser::default();
        assert_eq!(parser.normalize("Drift Data").unwrap(), NormalizedAngle::Drift);
        assert_eq!(
            parser.normalize("run 4 Drift Data (post) ATP  at 3 deg AOA").unwrap(),
            NormalizedAngle::Drift
        );
    }

    #[test]
    fn test_marker_label() {
        let parser = MarkerAngleParser::default();
        assert_eq!(
            parser.normalize("Sweep 2 ATP  at 10 deg AOA").unwrap(),
            NormalizedAngle::Degrees(10)
        );
        assert_eq!(
            parser.normalize("ATP  at -12deg AOA, gusting").unwrap(),
            NormalizedAngle::Degrees(-12)
        );
        assert_eq!(
            parser.normalize("ATP  at 1 ATP  at  0 deg AOA").unwrap(),
            NormalizedAngle::Degrees(0)
        );
    }

    #[test]
    fn test_single_space_prefix_is_not_accepted() {
        let parser = MarkerAngleParser::default();
        assert_eq!(
            parser.normalize("ATP at 5 deg AOA"),
            Err(AngleFormatError::MissingMarker {
                label: "ATP at 5 deg AOA".to_string(),
                marker: "ATP  at".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_suffix() {
        let parser = MarkerAngleParser::default();
        assert!(matches!(
            parser.normalize("ATP  at 5 degrees"),
            Err(AngleFormatError::MissingMarker { marker, .. }) if marker == "deg AOA"
        ));
    }

    #[test]
    fn test_non_integer_interior() {
        let parser = MarkerAngleParser::default();
        assert_eq!(
            parser.normalize("ATP  at 2.5 deg AOA"),
            Err(AngleFormatError::NotAnInteger {
                label: "ATP  at 2.5 deg AOA".to_string(),
                value: "2.5".to_string(),
            })
        );
    }

    #[test]
    fn test_angle_ordering_puts_drift_first() {
        let mut angles = vec![
            NormalizedAngle::Degrees(10),
            NormalizedAngle::Drift,
            NormalizedAngle::Degrees(-10),
            NormalizedAngle::Degrees(0),
        ];
        angles.sort();
        assert_eq!(
            angles,
            vec![
                NormalizedAngle::Drift,
                NormalizedAngle::Degrees(-10),
                NormalizedAngle::Degrees(0),
                NormalizedAngle::Degrees(10),
            ]
        );
        assert_eq!(NormalizedAngle::Drift.to_string(), "Drift Data");
    }

    #[test]
    fn test_regex_parser() {
        let parser = RegexAngleParser::new("ZERO", r"alpha=(?P<deg>[+-]?\d+)").unwrap();
        assert_eq!(
            parser.normalize("pt 7 alpha=-4 beta=0").unwrap(),
            NormalizedAngle::Degrees(-4)
        );
        assert_eq!(parser.normalize("ZERO run").unwrap(), NormalizedAngle::Drift);
        assert!(matches!(
            parser.normalize("alpha unknown"),
            Err(AngleFormatError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_regex_parser_requires_deg_group() {
        assert!(matches!(
            RegexAngleParser::new(DRIFT_DATA, r"alpha=(\d+)"),
            Err(AngleFormatError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_parser_from_config() {
        let mut config = AngleConfig::default();
        let parser = parser_from_config(&config).unwrap();
        assert_eq!(
            parser.normalize("ATP  at 6 deg AOA").unwrap(),
            NormalizedAngle::Degrees(6)
        );

        config.pattern = Some(r"AOA=(?P<deg>-?\d+)".to_string());
        let parser = parser_from_config(&config).unwrap();
        assert_eq!(parser.normalize("AOA=-3").unwrap(), NormalizedAngle::Degrees(-3));
    }
}
