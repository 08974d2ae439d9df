//! Region loading and terminal reporting shared by the one-shot commands
//! and the interactive menu.

use std::path::Path;

use risk_overlay_models::PredictionMode;
use risk_overlay_predict::{
    ConfigError, FetchError, HttpPredictionClient, PredictionClientConfig,
};
use risk_overlay_region::{RegionIndex, RegionKeyFields};
use risk_overlay_sync::{DisplayDetail, InMemoryFeatureState, RiskSynchronizer, SyncOutcome};

/// Loads the client config from `path` if given, otherwise from the
/// environment.
///
/// # Errors
///
/// Returns [`ConfigError`] if the config is missing or invalid.
pub fn load_config(path: Option<&Path>) -> Result<PredictionClientConfig, ConfigError> {
    path.map_or_else(PredictionClientConfig::from_env, PredictionClientConfig::from_file)
}

/// Fetches the neighborhood collection and builds a synchronizer over it.
///
/// # Errors
///
/// Returns [`FetchError`] if the collection cannot be fetched or parsed.
pub async fn load_synchronizer(
    client: &HttpPredictionClient,
    fields: &RegionKeyFields,
) -> Result<RiskSynchronizer, FetchError> {
    let features = client.fetch_regions().await?;
    let regions = RegionIndex::build_with(&features, fields);
    Ok(RiskSynchronizer::new(
        Box::new(client.clone()),
        regions,
        InMemoryFeatureState::new(),
    ))
}

/// Prints a one-line summary of a synchronization attempt.
pub fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Applied {
            epoch,
            regions_with_data,
            served_week,
        } => {
            println!("Epoch {epoch}: applied predictions to {regions_with_data} regions");
            if let Some(week) = served_week {
                println!("Served week: {week}");
            }
        }
        SyncOutcome::Failed { epoch, message } => {
            println!("Epoch {epoch}: failed to load predictions: {message}");
        }
        SyncOutcome::Superseded { epoch } => {
            println!("Epoch {epoch}: superseded by a newer request");
        }
    }
}

/// Prints every region's rendered risk and tooltip fields.
pub fn print_overlay(sync: &RiskSynchronizer, mode: PredictionMode) {
    let regions = sync.region_index();

    println!("{:<6} {:<32} {:>8}  DETAIL", "SLOT", "REGION", "RISK");
    println!("{}", "-".repeat(80));
    for slot in 0..regions.len() {
        let key = regions.key_for_slot(slot).unwrap_or_default();
        let risk = sync.with_store(|store| store.risk(slot));
        let fields = sync.display_fields(key, mode);
        println!(
            "{slot:<6} {key:<32} {risk:>8.1}  {}",
            detail_text(&fields.detail)
        );
    }

    for dup in regions.duplicate_keys() {
        println!(
            "warning: slot {} shares key '{}' with slot {} and is never colored",
            dup.shadowed_slot, dup.key, dup.winning_slot
        );
    }
}

fn detail_text(detail: &DisplayDetail) -> String {
    match detail {
        DisplayDetail::Forecast {
            mean_incidents,
            interval: Some((lower, upper)),
        } => format!("{mean_incidents:.1} incidents ({lower:.1} to {upper:.1})"),
        DisplayDetail::Forecast {
            mean_incidents,
            interval: None,
        } => format!("{mean_incidents:.1} incidents"),
        DisplayDetail::Spike { probability } => {
            format!("{:.1}% spike probability", probability * 100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_forecast_detail() {
        let detail = DisplayDetail::Forecast {
            mean_incidents: 12.5,
            interval: Some((8.0, 17.14)),
        };
        assert_eq!(detail_text(&detail), "12.5 incidents (8.0 to 17.1)");
    }

    #[test]
    fn formats_spike_detail() {
        let detail = DisplayDetail::Spike { probability: 0.25 };
        assert_eq!(detail_text(&detail), "25.0% spike probability");
    }
}
