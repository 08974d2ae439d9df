//! Per-feature visual state written by the synchronizer.
//!
//! [`FeatureStateStore`] stands in for the map renderer's feature-state
//! primitive (`setFeatureState` / `getFeatureState` keyed by feature id).
//! Each call is assumed atomic on its own; the synchronizer provides the
//! atomicity of a whole reset-then-apply pass.

use std::collections::BTreeMap;

use risk_overlay_region::Slot;

/// Visual state of one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureState {
    /// Risk value the choropleth colors by.
    pub risk: f64,
}

impl FeatureState {
    /// The neutral state every slot is reset to before applying a response.
    pub const BASELINE: Self = Self { risk: 0.0 };
}

/// Renderer feature-state storage addressed by slot.
pub trait FeatureStateStore: Send {
    /// Writes the state of `slot`.
    fn set_state(&mut self, slot: Slot, state: FeatureState);

    /// Reads the state of `slot`, if it was ever written.
    fn state(&self, slot: Slot) -> Option<FeatureState>;
}

/// Headless feature-state store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeatureState {
    states: BTreeMap<Slot, FeatureState>,
    writes: u64,
}

impl InMemoryFeatureState {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Risk of `slot`, or `0` if the slot was never written.
    #[must_use]
    pub fn risk(&self, slot: Slot) -> f64 {
        self.states.get(&slot).map_or(0.0, |s| s.risk)
    }

    /// Total number of `set_state` calls received.
    #[must_use]
    pub const fn writes(&self) -> u64 {
        self.writes
    }

    /// Every written slot and its state, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, FeatureState)> + '_ {
        self.states.iter().map(|(slot, state)| (*slot, *state))
    }
}

impl FeatureStateStore for InMemoryFeatureState {
    fn set_state(&mut self, slot: Slot, state: FeatureState) {
        self.writes += 1;
        self.states.insert(slot, state);
    }

    fn state(&self, slot: Slot) -> Option<FeatureState> {
        self.states.get(&slot).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_slot_reads_as_none() {
        let store = InMemoryFeatureState::new();
        assert_eq!(store.state(3), None);
        assert!((store.risk(3) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn counts_writes_and_keeps_latest() {
        let mut store = InMemoryFeatureState::new();
        store.set_state(0, FeatureState { risk: 80.0 });
        store.set_state(0, FeatureState::BASELINE);
        assert_eq!(store.writes(), 2);
        assert_eq!(store.state(0), Some(FeatureState::BASELINE));
        assert_eq!(store.iter().count(), 1);
    }
}
