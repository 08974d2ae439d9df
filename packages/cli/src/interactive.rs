//! Interactive menu for the overlay CLI.
//!
//! Loads the neighborhood collection once, then lets the user change the
//! overlay parameters repeatedly against the same synchronizer, the way a
//! map view re-synchronizes when its controls change.

use std::fmt::Display;

use chrono::NaiveDate;
use dialoguer::{Confirm, Input, Select};
use risk_overlay_models::{CrimeType, OverlayParams, PredictionMode, TimeOfDay};
use risk_overlay_predict::{HttpPredictionClient, PredictionClientConfig};
use risk_overlay_region::RegionKeyFields;

use crate::overlay;

/// Runs the interactive overlay menu.
///
/// # Errors
///
/// Returns an error if the region collection cannot be loaded or user
/// input fails.
pub async fn run(
    config: &PredictionClientConfig,
    fields: &RegionKeyFields,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpPredictionClient::new(config)?;
    let sync = overlay::load_synchronizer(&client, fields).await?;
    println!(
        "Loaded {} neighborhoods from {}",
        sync.region_index().len(),
        client.endpoint("neighborhoods")
    );

    let mut date = chrono::Local::now().date_naive();

    loop {
        let mode = select("Display mode", PredictionMode::all())?;

        date = loop {
            let date_str: String = Input::new()
                .with_prompt("Date (YYYY-MM-DD)")
                .default(date.to_string())
                .interact_text()?;
            match parse_date(&date_str) {
                Ok(parsed) => break parsed,
                Err(message) => println!("{message}"),
            }
        };

        let crime_type = select("Crime type", CrimeType::all())?;
        let time_of_day = select("Time of day", TimeOfDay::all())?;

        let params = OverlayParams {
            mode,
            date,
            crime_type,
            time_of_day,
        };
        let outcome = sync.synchronize(params).await;
        overlay::print_outcome(&outcome);
        overlay::print_overlay(&sync, mode);

        let key: String = Input::new()
            .with_prompt("Inspect a neighborhood (leave empty to skip)")
            .allow_empty(true)
            .interact_text()?;
        let key = key.trim();
        if !key.is_empty() {
            println!("\n{}\n", sync.tooltip(key, mode));
        }

        let again = Confirm::new()
            .with_prompt("Change parameters?")
            .default(true)
            .interact()?;
        if !again {
            break;
        }
    }

    Ok(())
}

fn select<T: Copy + Display>(prompt: &str, options: &[T]) -> Result<T, dialoguer::Error> {
    let labels: Vec<String> = options.iter().map(ToString::to_string).collect();
    let index = Select::new()
        .with_prompt(prompt)
        .items(labels.as_slice())
        .default(0)
        .interact()?;
    Ok(options[index])
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {e}", input.trim()))
}
