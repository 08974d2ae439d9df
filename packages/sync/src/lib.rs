#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk state synchronization for the neighborhood choropleth.
//!
//! Every parameter change (mode, date, crime type, time of day) starts a new
//! synchronization attempt tagged with an epoch from the
//! [`sequencer::RequestSequencer`]. When the prediction fetch resolves, the
//! [`synchronizer::RiskSynchronizer`] applies it only if its epoch is still
//! the last one issued: every slot is reset to a zero risk baseline, then
//! the new per-region values are written into the renderer's
//! [`store::FeatureStateStore`]. Superseded results are dropped without
//! touching any state. Hover tooltips read the accepted predictions through
//! [`presentation`] and never fetch.

pub mod presentation;
pub mod sequencer;
pub mod store;
pub mod synchronizer;

pub use presentation::{DisplayDetail, DisplayFields, Tooltip};
pub use sequencer::{Epoch, RequestSequencer};
pub use store::{FeatureState, FeatureStateStore, InMemoryFeatureState};
pub use synchronizer::{OverlayViewState, RiskSynchronizer, SyncOutcome, SyncPhase};
