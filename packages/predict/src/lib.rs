#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Prediction service client for the risk overlay.
//!
//! Defines the [`PredictionService`] trait the synchronizer fetches through,
//! and [`client::HttpPredictionClient`], its `reqwest` implementation against
//! the prediction API (`/predict`, `/spike`, `/neighborhoods`, `/health`).
//! Requests are never retried here; a failed call surfaces as a
//! [`FetchError`] and the caller decides what to do with it.

pub mod client;
pub mod config;

use std::sync::Arc;

use async_trait::async_trait;
use risk_overlay_models::{ForecastResponse, PredictionQuery, SpikeResponse};
use thiserror::Error;

pub use client::HttpPredictionClient;
pub use config::{ConfigError, PredictionClientConfig};

/// Errors from prediction service calls.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Prediction service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Preview of the response body.
        body: String,
    },

    /// The response body did not match the expected schema.
    #[error("Malformed response: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },

    /// The region collection could not be loaded.
    #[error("Region collection error: {0}")]
    Regions(#[from] risk_overlay_region::RegionError),
}

/// A source of per-region predictions.
///
/// Both queries pass their parameters through to the service unmodified.
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Fetches the weekly incident forecast.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, non-success status, or
    /// a malformed payload.
    async fn fetch_forecast(&self, query: &PredictionQuery)
    -> Result<ForecastResponse, FetchError>;

    /// Fetches spike probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, non-success status, or
    /// a malformed payload.
    async fn fetch_spike(&self, query: &PredictionQuery) -> Result<SpikeResponse, FetchError>;
}

#[async_trait]
impl<T: PredictionService + ?Sized> PredictionService for Arc<T> {
    async fn fetch_forecast(
        &self,
        query: &PredictionQuery,
    ) -> Result<ForecastResponse, FetchError> {
        (**self).fetch_forecast(query).await
    }

    async fn fetch_spike(&self, query: &PredictionQuery) -> Result<SpikeResponse, FetchError> {
        (**self).fetch_spike(query).await
    }
}
