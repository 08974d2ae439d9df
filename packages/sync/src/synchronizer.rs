//! The risk state synchronizer.
//!
//! One [`RiskSynchronizer`] exists per loaded map view. It owns the region
//! index, the epoch sequencer, the accepted prediction cache, and the
//! feature-state store, and it is the only thing that writes to them.
//!
//! All shared state lives behind a single `Mutex` that is never held across
//! the fetch `.await`. Epochs are issued while holding it, and the
//! still-current check plus the whole reset-then-apply pass run inside one
//! critical section, so a newer attempt can never interleave with an
//! older one's writes.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use risk_overlay_models::{OverlayParams, PredictionMode, PredictionRecord, PredictionSet};
use risk_overlay_predict::PredictionService;
use risk_overlay_region::RegionIndex;

use crate::presentation::{self, DisplayFields, Tooltip};
use crate::sequencer::{Epoch, RequestSequencer};
use crate::store::{FeatureState, FeatureStateStore, InMemoryFeatureState};

/// Where the synchronizer is in its request lifecycle.
///
/// Applying a response is synchronous once the fetch resolves, so it never
/// shows up as a phase of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No request in flight.
    #[default]
    Idle,
    /// Waiting on the fetch for `epoch`.
    Fetching {
        /// The epoch being fetched.
        epoch: Epoch,
    },
}

/// Observable overlay state for the surrounding UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayViewState {
    /// Lifecycle phase of the current epoch.
    pub phase: SyncPhase,
    /// Whether the current epoch is still loading.
    pub loading: bool,
    /// Error message of the current epoch's failed fetch.
    pub error: Option<String>,
    /// Week served by the last accepted spike response.
    pub served_week: Option<String>,
    /// Epoch of the last accepted response.
    pub accepted_epoch: Option<Epoch>,
    /// Parameters of the last accepted response.
    pub accepted_params: Option<OverlayParams>,
}

/// The result of one [`RiskSynchronizer::synchronize`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The response was current and is now rendered.
    Applied {
        /// Epoch of the attempt.
        epoch: Epoch,
        /// Number of regions that received a prediction.
        regions_with_data: usize,
        /// Week served by a spike response, if any.
        served_week: Option<String>,
    },
    /// The fetch failed while current; previous state was kept.
    Failed {
        /// Epoch of the attempt.
        epoch: Epoch,
        /// Error message shown to the user.
        message: String,
    },
    /// A newer attempt was issued before this one resolved; its result was
    /// dropped.
    Superseded {
        /// Epoch of the attempt.
        epoch: Epoch,
    },
}

struct OverlayState<F> {
    store: F,
    cache: BTreeMap<String, PredictionRecord>,
    view: OverlayViewState,
}

/// Keeps the choropleth's per-region risk in step with the latest
/// parameters.
pub struct RiskSynchronizer<F: FeatureStateStore = InMemoryFeatureState> {
    service: Box<dyn PredictionService>,
    regions: RegionIndex,
    sequencer: RequestSequencer,
    state: Mutex<OverlayState<F>>,
}

impl<F: FeatureStateStore> RiskSynchronizer<F> {
    /// Creates a synchronizer for a loaded region collection.
    ///
    /// Nothing is written to `store` until the first response is accepted.
    #[must_use]
    pub fn new(service: Box<dyn PredictionService>, regions: RegionIndex, store: F) -> Self {
        Self {
            service,
            regions,
            sequencer: RequestSequencer::new(),
            state: Mutex::new(OverlayState {
                store,
                cache: BTreeMap::new(),
                view: OverlayViewState::default(),
            }),
        }
    }

    /// Runs one synchronization attempt for `params`.
    ///
    /// Never returns an error: fetch failures of the current epoch are
    /// recorded in the view state, and results of superseded epochs are
    /// dropped without side effects.
    pub async fn synchronize(&self, params: OverlayParams) -> SyncOutcome {
        let epoch = self.begin();
        log::debug!(
            "Epoch {epoch}: fetching {} for {} (crime_type={}, time_of_day={})",
            params.mode,
            params.date,
            params.crime_type,
            params.time_of_day,
        );

        let query = params.query();
        let result = match params.mode {
            PredictionMode::Forecast => self
                .service
                .fetch_forecast(&query)
                .await
                .map(PredictionSet::from),
            PredictionMode::Spike => self
                .service
                .fetch_spike(&query)
                .await
                .map(PredictionSet::from),
        };

        let mut state = self.lock();
        if !self.sequencer.is_current(epoch) {
            log::debug!(
                "Epoch {epoch}: discarding result superseded by epoch {}",
                self.sequencer.current()
            );
            return SyncOutcome::Superseded { epoch };
        }

        state.view.loading = false;
        state.view.phase = SyncPhase::Idle;

        match result {
            Ok(set) => {
                let served_week = match params.mode {
                    PredictionMode::Spike => set.served_week.clone(),
                    PredictionMode::Forecast => None,
                };
                let regions_with_data = paint(&mut state.store, &self.regions, &set.records);
                state.cache = set.records;
                state.view.served_week.clone_from(&served_week);
                state.view.accepted_epoch = Some(epoch);
                state.view.accepted_params = Some(params);

                log::info!(
                    "Epoch {epoch}: applied {} predictions to {regions_with_data}/{} regions",
                    state.cache.len(),
                    self.regions.len(),
                );

                SyncOutcome::Applied {
                    epoch,
                    regions_with_data,
                    served_week,
                }
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("Epoch {epoch}: prediction fetch failed: {message}");
                state.view.error = Some(message.clone());
                SyncOutcome::Failed { epoch, message }
            }
        }
    }

    /// Rewrites every slot from the accepted predictions.
    ///
    /// Used when the renderer loses its feature state (e.g. on a style
    /// reload). Running it any number of times yields the same values.
    pub fn reapply(&self) -> usize {
        let mut state = self.lock();
        let OverlayState { store, cache, .. } = &mut *state;
        paint(store, &self.regions, cache)
    }

    /// Snapshot of the observable view state.
    #[must_use]
    pub fn view_state(&self) -> OverlayViewState {
        self.lock().view.clone()
    }

    /// Current rendered risk of the region with `key`.
    #[must_use]
    pub fn risk_for(&self, key: &str) -> Option<f64> {
        let slot = self.regions.slot(key)?;
        self.lock().store.state(slot).map(|s| s.risk)
    }

    /// Accepted prediction for the region with `key`.
    #[must_use]
    pub fn prediction_for(&self, key: &str) -> Option<PredictionRecord> {
        self.lock().cache.get(key).cloned()
    }

    /// Number of regions in the accepted prediction cache.
    #[must_use]
    pub fn cached_predictions(&self) -> usize {
        self.lock().cache.len()
    }

    /// Tooltip fields for the region with `key` in `mode`.
    #[must_use]
    pub fn display_fields(&self, key: &str, mode: PredictionMode) -> DisplayFields {
        presentation::display_fields(&self.lock().cache, key, mode)
    }

    /// Titled tooltip for the region with `key` in `mode`.
    #[must_use]
    pub fn tooltip<'a>(&self, key: &'a str, mode: PredictionMode) -> Tooltip<'a> {
        Tooltip {
            region: key,
            fields: self.display_fields(key, mode),
        }
    }

    /// The region index this synchronizer renders into.
    #[must_use]
    pub const fn region_index(&self) -> &RegionIndex {
        &self.regions
    }

    /// The last issued epoch.
    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        self.sequencer.current()
    }

    /// Runs `f` with read access to the feature-state store.
    pub fn with_store<R>(&self, f: impl FnOnce(&F) -> R) -> R {
        f(&self.lock().store)
    }

    /// Tears the synchronizer down, handing back the store.
    #[must_use]
    pub fn into_store(self) -> F {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .store
    }

    /// Issues a new epoch and resets the per-attempt view state.
    fn begin(&self) -> Epoch {
        let mut state = self.lock();
        let epoch = self.sequencer.next_epoch();
        state.view.phase = SyncPhase::Fetching { epoch };
        state.view.loading = true;
        state.view.error = None;
        state.view.served_week = None;
        epoch
    }

    fn lock(&self) -> MutexGuard<'_, OverlayState<F>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets every slot to the baseline, then writes the risk of every region
/// that has a prediction. Returns the number of regions written.
///
/// Regions without a prediction, and slots shadowed by a duplicate key,
/// stay at the baseline.
fn paint<F: FeatureStateStore>(
    store: &mut F,
    regions: &RegionIndex,
    records: &BTreeMap<String, PredictionRecord>,
) -> usize {
    for slot in 0..regions.len() {
        store.set_state(slot, FeatureState::BASELINE);
    }

    let mut written = 0;
    for (key, slot) in regions.entries() {
        if let Some(record) = records.get(key) {
            store.set_state(slot, FeatureState { risk: record.risk });
            written += 1;
        }
    }

    let unmatched = records.len() - written;
    if unmatched > 0 {
        log::debug!("{unmatched} predictions have no matching region");
    }

    written
}
