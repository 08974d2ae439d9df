//! Hover tooltip fields read from the accepted predictions.
//!
//! Pure reads of the prediction cache; nothing here fetches or mutates.

use std::collections::BTreeMap;
use std::fmt;

use risk_overlay_models::{PredictionDetail, PredictionMode, PredictionRecord};

/// Fields shown for a hovered region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFields {
    /// Risk score as a percentage (nominally 0-100).
    pub risk_percent: f64,
    /// Mode-specific fields.
    pub detail: DisplayDetail,
}

/// Mode-specific tooltip fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayDetail {
    /// Forecast mode.
    Forecast {
        /// Expected number of incidents for the week.
        mean_incidents: f64,
        /// Forecast interval `(lower, upper)` when the service reported one.
        interval: Option<(f64, f64)>,
    },
    /// Spike mode.
    Spike {
        /// Spike probability in `[0, 1]`.
        probability: f64,
    },
}

impl DisplayFields {
    /// All-zero fields for `mode`.
    #[must_use]
    pub const fn empty(mode: PredictionMode) -> Self {
        let detail = match mode {
            PredictionMode::Forecast => DisplayDetail::Forecast {
                mean_incidents: 0.0,
                interval: None,
            },
            PredictionMode::Spike => DisplayDetail::Spike { probability: 0.0 },
        };
        Self {
            risk_percent: 0.0,
            detail,
        }
    }

    /// Builds the fields for `record` in `mode`.
    ///
    /// A record produced under the other mode yields [`Self::empty`].
    #[must_use]
    pub fn from_record(record: &PredictionRecord, mode: PredictionMode) -> Self {
        let detail = match (record.detail, mode) {
            (
                PredictionDetail::Forecast {
                    mean_incidents,
                    lower,
                    upper,
                },
                PredictionMode::Forecast,
            ) => DisplayDetail::Forecast {
                mean_incidents,
                interval: lower.zip(upper),
            },
            (PredictionDetail::Spike { probability }, PredictionMode::Spike) => {
                DisplayDetail::Spike { probability }
            }
            _ => return Self::empty(mode),
        };
        Self {
            risk_percent: record.risk,
            detail,
        }
    }
}

impl fmt::Display for DisplayFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Risk: {:.1}%", self.risk_percent)?;
        match self.detail {
            DisplayDetail::Forecast {
                mean_incidents,
                interval: Some((lower, upper)),
            } => write!(
                f,
                "Expected incidents: {mean_incidents:.1} (range {lower:.1} to {upper:.1})"
            ),
            DisplayDetail::Forecast {
                mean_incidents,
                interval: None,
            } => write!(f, "Expected incidents: {mean_incidents:.1}"),
            DisplayDetail::Spike { probability } => {
                write!(f, "Spike probability: {:.1}%", probability * 100.0)
            }
        }
    }
}

/// A hovered region's name above its display fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tooltip<'a> {
    /// Region key shown as the tooltip title.
    pub region: &'a str,
    /// Fields rendered below the title.
    pub fields: DisplayFields,
}

impl fmt::Display for Tooltip<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.region)?;
        write!(f, "{}", self.fields)
    }
}

/// Looks up the display fields for `key` in the accepted predictions.
///
/// A region without a prediction yields [`DisplayFields::empty`].
#[must_use]
pub fn display_fields(
    cache: &BTreeMap<String, PredictionRecord>,
    key: &str,
    mode: PredictionMode,
) -> DisplayFields {
    cache.get(key).map_or_else(
        || DisplayFields::empty(mode),
        |record| DisplayFields::from_record(record, mode),
    )
}
