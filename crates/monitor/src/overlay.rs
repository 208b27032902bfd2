//! Derived overlay state: what every visible line should look like now.
//!
//! `OverlayState` is a pure function of the catalog, the latest probability
//! snapshot and the group visibility flags. It is recomputed whenever one of
//! them changes and compared against the previous value, so an unchanged
//! derivation never triggers change detection downstream.

use std::collections::{BTreeMap, BTreeSet};

use bevy::prelude::*;

use crate::blink::BlinkPhase;
use crate::lines::{LineCatalog, LineColor, LineGroup, LineKey, TransmissionLine};
use crate::probability::{Probability, ProbabilitySnapshot, ProbabilityStore};

// ---------------------------------------------------------------------------
// Per-line attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveColor {
    Steady(LineColor),
    /// Switches between the two colors on every blink phase change.
    Alternating { base: LineColor, alert: LineColor },
}

impl EffectiveColor {
    pub fn at(self, phase: BlinkPhase) -> LineColor {
        match (self, phase) {
            (EffectiveColor::Steady(color), _) => color,
            (EffectiveColor::Alternating { base, .. }, BlinkPhase::Base) => base,
            (EffectiveColor::Alternating { alert, .. }, BlinkPhase::Alert) => alert,
        }
    }

    pub fn base(self) -> LineColor {
        match self {
            EffectiveColor::Steady(color) => color,
            EffectiveColor::Alternating { base, .. } => base,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineOverlay {
    pub effective_color: EffectiveColor,
    pub is_blinking: bool,
    pub marker_label: String,
    pub probability: Probability,
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Groups the user has switched off. Every group starts visible.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupVisibility {
    hidden: BTreeSet<LineGroup>,
}

impl GroupVisibility {
    pub fn is_visible(&self, group: LineGroup) -> bool {
        !self.hidden.contains(&group)
    }

    /// Returns `true` when the flag actually changed.
    pub fn set_group_visibility(&mut self, group: LineGroup, visible: bool) -> bool {
        if visible {
            self.hidden.remove(&group)
        } else {
            self.hidden.insert(group)
        }
    }
}

/// Request from the UI to show or hide a whole group.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetGroupVisibility {
    pub group: LineGroup,
    pub visible: bool,
}

/// Overlay entry for one line, or `None` when its group is hidden.
pub fn compute_overlay(
    line: &TransmissionLine,
    snapshot: &ProbabilitySnapshot,
    visibility: &GroupVisibility,
) -> Option<LineOverlay> {
    if !visibility.is_visible(line.group()) {
        return None;
    }
    let probability = snapshot.probability(line.group(), line.slot());
    let is_blinking = probability.is_blinking();
    let effective_color = if is_blinking {
        EffectiveColor::Alternating {
            base: line.base_color,
            alert: line.base_color.alert_partner(),
        }
    } else {
        EffectiveColor::Steady(line.base_color)
    };
    Some(LineOverlay {
        effective_color,
        is_blinking,
        marker_label: probability.percent_label(),
        probability,
    })
}

// ---------------------------------------------------------------------------
// Whole-view state and reconciliation
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct OverlayState {
    entries: BTreeMap<LineKey, LineOverlay>,
}

/// One step needed to bring a rendered view from one state to another.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayChange {
    Added(LineKey, LineOverlay),
    Updated(LineKey, LineOverlay),
    Removed(LineKey),
}

impl OverlayState {
    pub fn derive(
        catalog: &LineCatalog,
        snapshot: &ProbabilitySnapshot,
        visibility: &GroupVisibility,
    ) -> Self {
        let entries = catalog
            .lines()
            .iter()
            .filter_map(|line| {
                compute_overlay(line, snapshot, visibility).map(|o| (line.key.clone(), o))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &LineKey) -> Option<&LineOverlay> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LineKey, &LineOverlay)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the entries for which `keep` returns `true`.
    pub fn filtered(&self, mut keep: impl FnMut(&LineKey, &LineOverlay) -> bool) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|&(key, overlay)| keep(key, overlay))
            .map(|(key, overlay)| (key.clone(), overlay.clone()))
            .collect();
        Self { entries }
    }

    pub fn any_blinking(&self) -> bool {
        self.entries.values().any(|o| o.is_blinking)
    }

    /// Changes that turn `self` into `desired`, in key order.
    pub fn diff(&self, desired: &OverlayState) -> Vec<OverlayChange> {
        let mut changes = Vec::new();
        for (key, overlay) in &desired.entries {
            match self.entries.get(key) {
                None => changes.push(OverlayChange::Added(key.clone(), overlay.clone())),
                Some(current) if current != overlay => {
                    changes.push(OverlayChange::Updated(key.clone(), overlay.clone()));
                }
                Some(_) => {}
            }
        }
        for key in self.entries.keys() {
            if !desired.entries.contains_key(key) {
                changes.push(OverlayChange::Removed(key.clone()));
            }
        }
        changes
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

pub fn apply_visibility_requests(
    mut requests: EventReader<SetGroupVisibility>,
    mut visibility: ResMut<GroupVisibility>,
) {
    for request in requests.read() {
        if visibility.is_visible(request.group) == request.visible {
            continue;
        }
        visibility.set_group_visibility(request.group, request.visible);
        info!(
            "Group {} is now {}",
            request.group.key(),
            if request.visible { "visible" } else { "hidden" }
        );
    }
}

/// Re-derive `OverlayState` when probabilities, visibility or the catalog change.
pub fn refresh_overlay_state(
    catalog: Res<LineCatalog>,
    store: Res<ProbabilityStore>,
    visibility: Res<GroupVisibility>,
    mut overlay: ResMut<OverlayState>,
) {
    if !(catalog.is_changed() || store.is_changed() || visibility.is_changed()) {
        return;
    }
    let desired = OverlayState::derive(&catalog, store.snapshot(), &visibility);
    overlay.set_if_neq(desired);
}
