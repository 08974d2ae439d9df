#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query parameter, wire schema, and prediction record types for the risk
//! overlay.
//!
//! The wire types ([`ForecastResponse`], [`SpikeResponse`]) mirror the JSON
//! returned by the prediction service and keep every numeric field optional.
//! Conversion into a [`PredictionSet`] is where risk values are coerced, so
//! everything downstream of the fetcher works with plain finite numbers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which prediction the overlay is colored by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionMode {
    /// Weekly incident forecast (`/predict`).
    #[default]
    Forecast,
    /// Probability of an incident spike (`/spike`).
    Spike,
}

impl PredictionMode {
    /// Returns all modes in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Forecast, Self::Spike]
    }
}

/// Crime category filter accepted by the prediction service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CrimeType {
    /// Every incident.
    #[default]
    All,
    /// Crimes against persons.
    Violent,
    /// Crimes against property.
    Property,
}

impl CrimeType {
    /// Returns all crime types in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::All, Self::Violent, Self::Property]
    }
}

/// Time-of-day window filter accepted by the prediction service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeOfDay {
    /// The whole day.
    #[default]
    All,
    /// Daytime incidents only.
    Day,
    /// Nighttime incidents only.
    Night,
}

impl TimeOfDay {
    /// Returns all time-of-day windows in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::All, Self::Day, Self::Night]
    }
}

/// The full set of user-controlled parameters driving one synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayParams {
    /// Active display mode.
    pub mode: PredictionMode,
    /// Requested prediction date.
    pub date: NaiveDate,
    /// Crime category filter.
    pub crime_type: CrimeType,
    /// Time-of-day filter.
    pub time_of_day: TimeOfDay,
}

impl OverlayParams {
    /// Creates parameters for `date` with every filter set to `all`.
    #[must_use]
    pub fn new(mode: PredictionMode, date: NaiveDate) -> Self {
        Self {
            mode,
            date,
            crime_type: CrimeType::default(),
            time_of_day: TimeOfDay::default(),
        }
    }

    /// Returns the mode-independent query sent to the prediction service.
    #[must_use]
    pub const fn query(&self) -> PredictionQuery {
        PredictionQuery {
            date: self.date,
            crime_type: self.crime_type,
            time_of_day: self.time_of_day,
        }
    }
}

/// Query parameters shared by the forecast and spike endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionQuery {
    /// Requested date, sent as ISO `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Crime category filter.
    pub crime_type: CrimeType,
    /// Time-of-day filter.
    pub time_of_day: TimeOfDay,
}

impl PredictionQuery {
    /// Returns the URL query pairs for this request.
    #[must_use]
    pub fn to_query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("date", self.date.format("%Y-%m-%d").to_string()),
            ("crime_type", self.crime_type.to_string()),
            ("time_of_day", self.time_of_day.to_string()),
        ]
    }
}

/// `GET /predict` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    /// Week the forecast was computed for, as echoed by the service.
    #[serde(default)]
    pub date: Option<String>,
    /// Per-neighborhood forecasts.
    pub predictions: Vec<ForecastPrediction>,
}

/// A single neighborhood entry of a [`ForecastResponse`].
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastPrediction {
    /// Natural key of the neighborhood.
    #[serde(deserialize_with = "deserialize_region_id")]
    pub neighborhood_id: String,
    /// Risk score, nominally 0-100.
    #[serde(default)]
    pub risk: Option<f64>,
    /// Expected number of incidents for the week.
    #[serde(default)]
    pub mean_incidents: Option<f64>,
    /// Lower bound of the forecast interval.
    #[serde(default)]
    pub lower: Option<f64>,
    /// Upper bound of the forecast interval.
    #[serde(default)]
    pub upper: Option<f64>,
}

/// `GET /spike` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct SpikeResponse {
    /// Per-neighborhood spike probabilities.
    pub predictions: Vec<SpikePrediction>,
    /// Week actually served when the requested date was clamped.
    #[serde(default)]
    pub served_week: Option<String>,
    /// Week the client asked for, as echoed by the service.
    #[serde(default)]
    pub requested_week: Option<String>,
    /// Whether the spike models were loaded on the service side.
    #[serde(default = "default_available")]
    pub available: bool,
}

/// A single neighborhood entry of a [`SpikeResponse`].
#[derive(Debug, Clone, Deserialize)]
pub struct SpikePrediction {
    /// Natural key of the neighborhood.
    #[serde(deserialize_with = "deserialize_region_id")]
    pub neighborhood_id: String,
    /// Spike probability in `[0, 1]`.
    #[serde(default)]
    pub prob: Option<f64>,
    /// Risk score, nominally 0-100.
    #[serde(default)]
    pub risk: Option<f64>,
}

const fn default_available() -> bool {
    true
}

/// Region ids arrive as strings from most deployments but as plain numbers
/// from some.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRegionId {
    Text(String),
    Number(serde_json::Number),
}

fn deserialize_region_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawRegionId::deserialize(deserializer)? {
        RawRegionId::Text(s) => s,
        RawRegionId::Number(n) => n.to_string(),
    })
}

/// Coerces a raw risk value to the number written into feature state.
///
/// Missing, non-finite, and negative values become `0`. There is no upper
/// clamp: a value of `137` is passed through as-is.
#[must_use]
pub fn coerce_risk(risk: Option<f64>) -> f64 {
    finite_or_zero(risk).max(0.0)
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Mode-specific fields of a [`PredictionRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PredictionDetail {
    /// Forecast fields.
    Forecast {
        /// Expected number of incidents.
        mean_incidents: f64,
        /// Lower bound of the forecast interval, if reported.
        lower: Option<f64>,
        /// Upper bound of the forecast interval, if reported.
        upper: Option<f64>,
    },
    /// Spike fields.
    Spike {
        /// Spike probability in `[0, 1]`.
        probability: f64,
    },
}

impl PredictionDetail {
    /// Returns the mode this detail belongs to.
    #[must_use]
    pub const fn mode(&self) -> PredictionMode {
        match self {
            Self::Forecast { .. } => PredictionMode::Forecast,
            Self::Spike { .. } => PredictionMode::Spike,
        }
    }
}

/// A normalized prediction for a single region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Natural key of the region.
    pub region_key: String,
    /// Coerced risk score (see [`coerce_risk`]).
    pub risk: f64,
    /// Mode-specific fields.
    pub detail: PredictionDetail,
}

impl From<ForecastPrediction> for PredictionRecord {
    fn from(p: ForecastPrediction) -> Self {
        Self {
            region_key: p.neighborhood_id,
            risk: coerce_risk(p.risk),
            detail: PredictionDetail::Forecast {
                mean_incidents: finite_or_zero(p.mean_incidents),
                lower: p.lower.filter(|v| v.is_finite()),
                upper: p.upper.filter(|v| v.is_finite()),
            },
        }
    }
}

impl From<SpikePrediction> for PredictionRecord {
    fn from(p: SpikePrediction) -> Self {
        Self {
            region_key: p.neighborhood_id,
            risk: coerce_risk(p.risk),
            detail: PredictionDetail::Spike {
                probability: finite_or_zero(p.prob),
            },
        }
    }
}

/// Everything one successful fetch produced, keyed by region.
///
/// When a response lists the same region more than once, the last entry
/// wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionSet {
    /// Region key -> prediction.
    pub records: BTreeMap<String, PredictionRecord>,
    /// Week actually served by a spike query, if the service clamped it.
    pub served_week: Option<String>,
}

impl PredictionSet {
    /// Number of regions with a prediction.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no region has a prediction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn from_records(
        records: impl IntoIterator<Item = PredictionRecord>,
        served_week: Option<String>,
    ) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.region_key.clone(), r))
                .collect(),
            served_week,
        }
    }
}

impl From<ForecastResponse> for PredictionSet {
    fn from(resp: ForecastResponse) -> Self {
        Self::from_records(
            resp.predictions.into_iter().map(PredictionRecord::from),
            None,
        )
    }
}

impl From<SpikeResponse> for PredictionSet {
    fn from(resp: SpikeResponse) -> Self {
        Self::from_records(
            resp.predictions.into_iter().map(PredictionRecord::from),
            resp.served_week,
        )
    }
}
