//! `reqwest` client for the prediction API.

use async_trait::async_trait;
use geojson::Feature;
use risk_overlay_models::{ForecastResponse, PredictionQuery, SpikeResponse};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{ConfigError, FetchError, PredictionClientConfig, PredictionService};

/// Maximum length of the response body preview kept in status errors.
const BODY_PREVIEW_LEN: usize = 500;

/// `GET /health` response body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    /// Service status, `"ok"` when healthy.
    pub status: String,
}

/// Prediction API client.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPredictionClient {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Http`] if the underlying HTTP client cannot
    /// be built.
    pub fn new(config: &PredictionClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the full URL for an API path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fetches the neighborhood boundary collection.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails or the body is not a
    /// `GeoJSON` `FeatureCollection`.
    pub async fn fetch_regions(&self) -> Result<Vec<Feature>, FetchError> {
        let body = self.get_text("neighborhoods", &[]).await?;
        let features = risk_overlay_region::parse_feature_collection(&body)?;
        log::info!("Fetched {} neighborhood features", features.len());
        Ok(features)
    }

    /// Checks that the service is up.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails or the body is malformed.
    pub async fn health(&self) -> Result<HealthStatus, FetchError> {
        self.get_json("health", &[]).await
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let url = self.endpoint(path);
        log::debug!("GET {url} {query:?}");

        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        check_status(status, body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let body = self.get_text(path, query).await?;
        parse_body(path, &body)
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn fetch_forecast(
        &self,
        query: &PredictionQuery,
    ) -> Result<ForecastResponse, FetchError> {
        self.get_json("predict", &query.to_query_pairs()).await
    }

    async fn fetch_spike(&self, query: &PredictionQuery) -> Result<SpikeResponse, FetchError> {
        let resp: SpikeResponse = self.get_json("spike", &query.to_query_pairs()).await?;
        if !resp.available {
            log::warn!("Spike models are unavailable on the prediction service");
        }
        Ok(resp)
    }
}

fn check_status(status: reqwest::StatusCode, body: String) -> Result<String, FetchError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(FetchError::Status {
            status: status.as_u16(),
            body: preview(&body),
        })
    }
}

fn parse_body<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Malformed {
        message: format!("Failed to parse /{path} response: {e}"),
    })
}

fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_LEN {
        let head: String = body.chars().take(BODY_PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_endpoint_paths() {
        let client = HttpPredictionClient::with_client(reqwest::Client::new(), "http://host/api/");
        assert_eq!(client.endpoint("predict"), "http://host/api/predict");
        assert_eq!(client.endpoint("/spike"), "http://host/api/spike");
    }

    #[test]
    fn non_success_status_is_fetch_error() {
        let err = check_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"detail":"Use ISO date like 2025-08-12"}"#.to_string(),
        )
        .unwrap_err();
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("ISO date"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn success_status_passes_body_through() {
        let body = check_status(reqwest::StatusCode::OK, "{}".to_string()).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn missing_predictions_is_malformed() {
        let err = parse_body::<SpikeResponse>("spike", r#"{"served_week": "2024-W09"}"#)
            .unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
        assert!(err.to_string().contains("/spike"));
    }

    #[test]
    fn parses_forecast_body() {
        let resp = parse_body::<ForecastResponse>(
            "predict",
            r#"{"predictions": [{"neighborhood_id": "Mission", "risk": 40, "mean_incidents": 3.5}]}"#,
        )
        .unwrap();
        assert_eq!(resp.predictions.len(), 1);
        assert_eq!(resp.predictions[0].neighborhood_id, "Mission");
    }

    #[test]
    fn truncates_long_body_preview() {
        let long = "x".repeat(BODY_PREVIEW_LEN + 10);
        let p = preview(&long);
        assert_eq!(p.len(), BODY_PREVIEW_LEN + 3);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn query_pairs_cover_every_parameter() {
        let query = PredictionQuery {
            date: chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            crime_type: risk_overlay_models::CrimeType::Property,
            time_of_day: risk_overlay_models::TimeOfDay::Day,
        };
        let names: Vec<&str> = query.to_query_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, ["date", "crime_type", "time_of_day"]);
    }
}
