#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the neighborhood risk overlay.

mod interactive;
mod overlay;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use risk_overlay_models::{CrimeType, OverlayParams, PredictionMode, TimeOfDay};
use risk_overlay_predict::HttpPredictionClient;
use risk_overlay_region::RegionKeyFields;
use risk_overlay_sync::SyncOutcome;

#[derive(Parser)]
#[command(name = "risk_overlay", about = "Neighborhood risk overlay synchronizer")]
struct Cli {
    /// TOML config file with an `[api]` table (defaults to `RISK_OVERLAY_API_URL`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Feature property holding the neighborhood name
    #[arg(long, global = true, default_value = "name")]
    name_property: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch predictions once and print the rendered overlay
    Sync {
        /// Prediction mode (`forecast` or `spike`)
        #[arg(long, default_value = "forecast")]
        mode: PredictionMode,
        /// Target date as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Crime category (`all`, `violent`, `property`)
        #[arg(long, default_value = "all")]
        crime_type: CrimeType,
        /// Time of day (`all`, `day`, `night`)
        #[arg(long, default_value = "all")]
        time_of_day: TimeOfDay,
        /// Print the tooltip fields for this neighborhood
        #[arg(long)]
        inspect: Option<String>,
    },
    /// List the neighborhood collection and the slot assigned to each region
    Regions {
        /// Write the collection with slot ids assigned to this path
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Check that the prediction service is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let config = overlay::load_config(cli.config.as_deref())?;
    let fields = RegionKeyFields {
        name: cli.name_property,
    };

    let Some(command) = cli.command else {
        return interactive::run(&config, &fields).await;
    };

    let client = HttpPredictionClient::new(&config)?;

    match command {
        Commands::Sync {
            mode,
            date,
            crime_type,
            time_of_day,
            inspect,
        } => {
            let sync = overlay::load_synchronizer(&client, &fields).await?;
            let params = OverlayParams {
                mode,
                date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                crime_type,
                time_of_day,
            };

            let outcome = sync.synchronize(params).await;
            overlay::print_outcome(&outcome);
            if let SyncOutcome::Failed { message, .. } = outcome {
                return Err(message.into());
            }
            overlay::print_overlay(&sync, mode);

            if let Some(key) = inspect {
                println!("\n{}", sync.tooltip(&key, mode));
            }
        }
        Commands::Regions { export } => {
            let mut features = client.fetch_regions().await?;
            let regions = risk_overlay_region::RegionIndex::build_with(&features, &fields);

            println!("{:<6} REGION", "SLOT");
            for slot in 0..regions.len() {
                println!("{slot:<6} {}", regions.key_for_slot(slot).unwrap_or_default());
            }
            for dup in regions.duplicate_keys() {
                log::warn!(
                    "Duplicate region key '{}' at slot {} (shadowed by slot {})",
                    dup.key,
                    dup.shadowed_slot,
                    dup.winning_slot
                );
            }

            if let Some(path) = export {
                regions.assign_feature_ids(&mut features);
                let collection = geojson::FeatureCollection {
                    bbox: None,
                    features,
                    foreign_members: None,
                };
                std::fs::write(&path, serde_json::to_string_pretty(&collection)?)?;
                log::info!("Wrote {} regions to {}", regions.len(), path.display());
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            println!("{}: {}", client.endpoint("health"), health.status);
        }
    }

    Ok(())
}
