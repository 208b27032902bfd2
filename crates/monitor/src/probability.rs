//! Failure-probability snapshots and the wire format that feeds them.
//!
//! Canonical response shape:
//!
//! ```json
//! { "body": { "110kV": [0.12, 0.8], "220kV": [0.05] } }
//! ```
//!
//! Each array holds one value per catalog slot of that group. The flat
//! `{ "body": [..] }` layout is rejected as malformed.

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde_json::Value;

use crate::config::BLINK_THRESHOLD;
use crate::error::FetchError;
use crate::lines::LineGroup;

// ---------------------------------------------------------------------------
// Probability
// ---------------------------------------------------------------------------

/// A failure probability in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Probability(f64);

impl Probability {
    pub const ZERO: Probability = Probability(0.0);

    /// Values outside [0, 1] or non-finite values are treated as 0.
    pub fn new(value: f64) -> Self {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Probability(value)
        } else {
            Probability::ZERO
        }
    }

    /// Anything that is not a JSON number (null, string, ...) reads as 0.
    pub fn from_json(value: &Value) -> Self {
        value.as_f64().map(Probability::new).unwrap_or_default()
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_blinking(self) -> bool {
        self.0 > BLINK_THRESHOLD
    }

    /// Marker text, e.g. `"75%"`.
    pub fn percent_label(self) -> String {
        format!("{:.0}%", self.0 * 100.0)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Latest known probabilities, one array per group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilitySnapshot {
    groups: BTreeMap<LineGroup, Vec<Probability>>,
}

impl ProbabilitySnapshot {
    /// Probability for a slot; missing groups or short arrays read as 0.
    pub fn probability(&self, group: LineGroup, slot: usize) -> Probability {
        self.groups
            .get(&group)
            .and_then(|values| values.get(slot))
            .copied()
            .unwrap_or_default()
    }

    pub fn group(&self, group: LineGroup) -> Option<&[Probability]> {
        self.groups.get(&group).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Parsed response: the groups it carried plus the keys that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotUpdate {
    pub groups: BTreeMap<LineGroup, Vec<Probability>>,
    /// Known groups whose value was not an array. Their lines keep the
    /// previous snapshot's values.
    pub malformed: Vec<LineGroup>,
    /// Keys that name no known group. Dropped.
    pub ignored: Vec<String>,
}

/// Parse one probability response.
///
/// A structurally invalid body fails the whole response; individual unknown
/// or malformed groups are only reported in `ignored` / `malformed`.
pub fn parse_snapshot(raw: &str) -> Result<SnapshotUpdate, FetchError> {
    let value: Value = serde_json::from_str(raw)?;
    let body = value
        .get("body")
        .ok_or_else(|| FetchError::Parse("missing `body` field".to_string()))?;
    let Value::Object(entries) = body else {
        return Err(FetchError::Parse(
            "`body` must be an object keyed by line group".to_string(),
        ));
    };

    let mut update = SnapshotUpdate::default();
    for (key, entry) in entries {
        let Some(group) = LineGroup::from_key(key) else {
            update.ignored.push(key.clone());
            continue;
        };
        let Value::Array(items) = entry else {
            update.malformed.push(group);
            continue;
        };
        update
            .groups
            .insert(group, items.iter().map(Probability::from_json).collect());
    }
    Ok(update)
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Owner of the current snapshot.
///
/// Each applied response replaces the snapshot as a whole: a group the
/// response leaves out reads as 0 until it is reported again. `generation`
/// increases on every applied response, even one that carried no recognized
/// group, so observers can tell polls apart.
#[derive(Resource, Debug, Default)]
pub struct ProbabilityStore {
    snapshot: ProbabilitySnapshot,
    generation: u64,
}

/// Summary of one applied response, used for logging and stats.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedSnapshot {
    pub generation: u64,
    pub groups_updated: usize,
    /// Malformed groups whose previous values were carried over.
    pub carried: Vec<LineGroup>,
    pub ignored: Vec<String>,
}

impl ProbabilityStore {
    pub fn snapshot(&self) -> &ProbabilitySnapshot {
        &self.snapshot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the snapshot with the groups in `update`. Malformed groups
    /// keep their previous array; absent groups are dropped.
    pub fn apply(&mut self, update: SnapshotUpdate) -> AppliedSnapshot {
        let groups_updated = update.groups.len();
        let mut groups = update.groups;
        let mut carried = Vec::new();
        for group in update.malformed {
            if let Some(previous) = self.snapshot.groups.remove(&group) {
                groups.insert(group, previous);
                carried.push(group);
            }
        }
        self.snapshot = ProbabilitySnapshot { groups };
        self.generation += 1;
        AppliedSnapshot {
            generation: self.generation,
            groups_updated,
            carried,
            ignored: update.ignored,
        }
    }
}

/// Parse `raw` and apply it. On error the store is left untouched.
pub fn on_snapshot_received(
    raw: &str,
    store: &mut ProbabilityStore,
) -> Result<AppliedSnapshot, FetchError> {
    let update = parse_snapshot(raw)?;
    Ok(store.apply(update))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_threshold_is_strict() {
        assert!(!Probability::new(0.7).is_blinking());
        assert!(Probability::new(0.7001).is_blinking());
        assert!(Probability::new(1.0).is_blinking());
        assert!(!Probability::new(0.0).is_blinking());
    }

    #[test]
    fn out_of_range_values_become_zero() {
        for raw in [-0.1, 1.01, 7.0, f64::NAN, f64::INFINITY] {
            assert_eq!(Probability::new(raw), Probability::ZERO, "raw={raw}");
        }
    }

    #[test]
    fn non_numbers_become_zero() {
        assert_eq!(Probability::from_json(&Value::Null), Probability::ZERO);
        assert_eq!(
            Probability::from_json(&Value::String("0.9".into())),
            Probability::ZERO
        );
    }

    #[test]
    fn percent_label_rounds() {
        assert_eq!(Probability::new(0.75).percent_label(), "75%");
        assert_eq!(Probability::new(0.0).percent_label(), "0%");
        assert_eq!(Probability::new(1.0).percent_label(), "100%");
        assert_eq!(Probability::new(0.123).percent_label(), "12%");
    }

    #[test]
    fn parse_keyed_body() {
        let update = parse_snapshot(r#"{"body": {"110kV": [0.2, 0.9], "220kV": [0.5]}}"#).unwrap();
        assert_eq!(update.groups.len(), 2);
        assert_eq!(
            update.groups[&LineGroup::Kv110],
            vec![Probability::new(0.2), Probability::new(0.9)]
        );
        assert!(update.ignored.is_empty());
    }

    #[test]
    fn unknown_and_malformed_groups_are_kept_apart() {
        let update =
            parse_snapshot(r#"{"body": {"13kV": [0.9], "220kV": "oops", "66kV": [0.1]}}"#).unwrap();
        assert_eq!(update.groups.len(), 1);
        assert!(update.groups.contains_key(&LineGroup::Kv66));
        assert_eq!(update.ignored, vec!["13kV".to_string()]);
        assert_eq!(update.malformed, vec![LineGroup::Kv220]);
    }

    #[test]
    fn flat_body_is_rejected() {
        let err = parse_snapshot(r#"{"body": [0.1, 0.2]}"#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn missing_body_is_rejected() {
        assert!(parse_snapshot(r#"{"110kV": [0.1]}"#).is_err());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(parse_snapshot("{\"body\": {").is_err());
    }

    #[test]
    fn missing_slot_reads_zero() {
        let mut store = ProbabilityStore::default();
        on_snapshot_received(r#"{"body": {"110kV": [0.4]}}"#, &mut store).unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.probability(LineGroup::Kv110, 0), Probability::new(0.4));
        assert_eq!(snap.probability(LineGroup::Kv110, 3), Probability::ZERO);
        assert_eq!(snap.probability(LineGroup::Kv500, 0), Probability::ZERO);
    }

    #[test]
    fn absent_groups_read_zero() {
        let mut store = ProbabilityStore::default();
        on_snapshot_received(r#"{"body": {"110kV": [0.4], "220kV": [0.8]}}"#, &mut store)
            .unwrap();
        on_snapshot_received(r#"{"body": {"110kV": [0.1]}}"#, &mut store).unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.probability(LineGroup::Kv110, 0), Probability::new(0.1));
        assert_eq!(snap.probability(LineGroup::Kv220, 0), Probability::ZERO);
        assert!(snap.group(LineGroup::Kv220).is_none());
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn malformed_group_keeps_prior_values() {
        let mut store = ProbabilityStore::default();
        on_snapshot_received(r#"{"body": {"110kV": [0.4], "220kV": [0.8]}}"#, &mut store)
            .unwrap();
        let applied =
            on_snapshot_received(r#"{"body": {"110kV": [0.1], "220kV": null}}"#, &mut store)
                .unwrap();
        assert_eq!(applied.carried, vec![LineGroup::Kv220]);
        let snap = store.snapshot();
        assert_eq!(snap.probability(LineGroup::Kv110, 0), Probability::new(0.1));
        assert_eq!(snap.probability(LineGroup::Kv220, 0), Probability::new(0.8));
    }

    #[test]
    fn malformed_group_without_prior_values_reads_zero() {
        let mut store = ProbabilityStore::default();
        let applied =
            on_snapshot_received(r#"{"body": {"220kV": {"LT08": 0.9}}}"#, &mut store).unwrap();
        assert!(applied.carried.is_empty());
        assert_eq!(store.snapshot().probability(LineGroup::Kv220, 0), Probability::ZERO);
    }

    #[test]
    fn present_group_is_replaced_wholesale() {
        let mut store = ProbabilityStore::default();
        on_snapshot_received(r#"{"body": {"110kV": [0.4, 0.5]}}"#, &mut store).unwrap();
        on_snapshot_received(r#"{"body": {"110kV": [0.9]}}"#, &mut store).unwrap();
        assert_eq!(
            store.snapshot().group(LineGroup::Kv110),
            Some(&[Probability::new(0.9)][..])
        );
        // Slot 1 disappeared from the new array and reads as 0.
        assert_eq!(
            store.snapshot().probability(LineGroup::Kv110, 1),
            Probability::ZERO
        );
    }

    #[test]
    fn failed_parse_leaves_store_untouched() {
        let mut store = ProbabilityStore::default();
        on_snapshot_received(r#"{"body": {"110kV": [0.4]}}"#, &mut store).unwrap();
        let before = store.snapshot().clone();
        assert!(on_snapshot_received("garbage", &mut store).is_err());
        assert_eq!(store.snapshot(), &before);
        assert_eq!(store.generation(), 1);
    }
}
