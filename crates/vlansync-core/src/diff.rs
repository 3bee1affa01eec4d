// ── Diff engine ──
//
// Pure functions: device-reported records × stored records → typed
// operations. Output is ordered by `model::id_order` so repeated runs
// over the same inputs produce identical operation lists.

use std::collections::{HashMap, HashSet};

use crate::model::{DiffOperation, Scope, VlanRecord, id_order};

/// Index records by id, keeping the first record seen for each id.
fn index(records: &[VlanRecord]) -> HashMap<&str, &VlanRecord> {
    let mut map = HashMap::with_capacity(records.len());
    for record in records {
        map.entry(record.id.as_str()).or_insert(record);
    }
    map
}

/// Operations that turn `stored` into `reported` for one device.
///
/// - id only reported → `Add`
/// - id only stored → `Remove`
/// - id in both with different name or description → `Update`
///
/// A reported record without a description keeps the stored one, so
/// descriptions set by operators survive reconciliation.
pub fn diff(device: &str, reported: &[VlanRecord], stored: &[VlanRecord]) -> Vec<DiffOperation> {
    let reported_by_id = index(reported);
    let stored_by_id = index(stored);

    let mut ids: Vec<&str> = reported_by_id
        .keys()
        .chain(stored_by_id.keys())
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    ids.sort_by(|a, b| id_order(a, b));

    let scope = Scope::device(device);
    ids.into_iter()
        .filter_map(|id| match (reported_by_id.get(id), stored_by_id.get(id)) {
            (Some(new), None) => Some(DiffOperation::add(scope.clone(), (*new).clone())),
            (None, Some(old)) => Some(DiffOperation::remove(scope.clone(), (*old).clone())),
            (Some(new), Some(old)) => {
                let new = new.observed_over(old);
                (!new.same_content(old))
                    .then(|| DiffOperation::update(scope.clone(), (*old).clone(), new))
            }
            _ => None,
        })
        .collect()
}

/// Catalog `Add`s for reported VLANs the catalog has never seen.
///
/// The catalog only grows from reconciliation: an existing entry keeps the
/// name it was first recorded with, and nothing is ever removed here.
pub fn catalog_additions(reported: &[VlanRecord], catalog: &[VlanRecord]) -> Vec<DiffOperation> {
    let known: HashSet<&str> = catalog.iter().map(|r| r.id.as_str()).collect();
    let mut additions: Vec<&VlanRecord> = index(reported)
        .into_values()
        .filter(|r| !known.contains(r.id.as_str()))
        .collect();
    additions.sort_by(|a, b| id_order(&a.id, &b.id));

    additions
        .into_iter()
        .map(|r| DiffOperation::add(Scope::Catalog, r.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Change;

    fn rec(id: &str, name: &str) -> VlanRecord {
        VlanRecord::new(id, name)
    }

    #[test]
    fn new_vlan_on_device_is_added() {
        let ops = diff(
            "sw1",
            &[rec("1", "default"), rec("110", "vlan")],
            &[rec("1", "default")],
        );
        assert_eq!(
            ops,
            vec![DiffOperation::add(Scope::device("sw1"), rec("110", "vlan"))]
        );
    }

    #[test]
    fn missing_vlan_is_removed_and_renamed_is_updated() {
        let ops = diff(
            "sw1",
            &[rec("1", "default"), rec("20", "voice-new")],
            &[rec("1", "default"), rec("20", "voice"), rec("30", "gone")],
        );
        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[0].change,
            Change::Update {
                old: rec("20", "voice"),
                new: rec("20", "voice-new"),
            }
        );
        assert_eq!(ops[1].change, Change::Remove(rec("30", "gone")));
    }

    #[test]
    fn reported_description_difference_is_an_update() {
        let stored = rec("40", "lab").with_description("bench network");
        let reported = rec("40", "lab").with_description("lab uplinks");
        let ops = diff("sw1", &[reported.clone()], &[stored.clone()]);
        assert_eq!(
            ops,
            vec![DiffOperation::update(Scope::device("sw1"), stored, reported)]
        );
    }

    #[test]
    fn stored_description_survives_when_not_reported() {
        let stored = rec("40", "lab").with_description("bench network");
        assert!(diff("sw1", &[rec("40", "lab")], &[stored.clone()]).is_empty());

        let ops = diff("sw1", &[rec("40", "lab-2")], &[stored.clone()]);
        assert_eq!(
            ops[0].change,
            Change::Update {
                old: stored,
                new: rec("40", "lab-2").with_description("bench network"),
            }
        );
    }

    #[test]
    fn identical_sets_produce_nothing() {
        let set = vec![rec("1", "default"), rec("2", "two")];
        assert!(diff("sw1", &set, &set).is_empty());
        assert!(diff("sw1", &[], &[]).is_empty());
    }

    #[test]
    fn output_is_ordered_numerically() {
        let ops = diff(
            "sw1",
            &[rec("100", "a"), rec("9", "b"), rec("20", "c")],
            &[rec("3", "x")],
        );
        let ids: Vec<_> = ops.iter().map(DiffOperation::id).collect();
        assert_eq!(ids, vec!["3", "9", "20", "100"]);
    }

    #[test]
    fn catalog_only_gains_unknown_ids() {
        let ops = catalog_additions(
            &[rec("1", "default"), rec("110", "users"), rec("20", "voice")],
            &[rec("1", "default"), rec("20", "telephony")],
        );
        assert_eq!(
            ops,
            vec![DiffOperation::add(Scope::Catalog, rec("110", "users"))]
        );
    }

    #[test]
    fn catalog_additions_ignore_duplicate_reports() {
        let ops = catalog_additions(&[rec("5", "first"), rec("5", "second")], &[]);
        assert_eq!(ops, vec![DiffOperation::add(Scope::Catalog, rec("5", "first"))]);
    }
}
