// ── Canonical VLAN model ──
//
// Records as the parser emits them and the store persists them, plus the
// typed mutations the diff engine produces.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Description stamped on every VLAN learned from a device. Operators
/// replace it through the store. On a reported record it means the device
/// did not report a description.
pub const DEFAULT_DESCRIPTION: &str = "change_me";

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_owned()
}

/// One VLAN. Identity is `id`, the numeric tag kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VlanRecord {
    pub id: String,
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
}

impl VlanRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: default_description(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// True when name and description match; ids are not compared.
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name && self.description == other.description
    }

    /// Whether this record carries a description other than the default.
    pub fn has_description(&self) -> bool {
        self.description != DEFAULT_DESCRIPTION
    }

    /// This record as reported by a device, laid over what is stored for
    /// the same id. A description the device did not report keeps the
    /// stored one.
    pub fn observed_over(&self, stored: &Self) -> Self {
        if self.has_description() {
            self.clone()
        } else {
            self.clone().with_description(stored.description.clone())
        }
    }
}

/// A VLAN as stored for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceVlanRecord {
    pub device: String,
    #[serde(flatten)]
    pub vlan: VlanRecord,
}

/// Which table a record or operation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Device(String),
    Catalog,
}

impl Scope {
    pub fn device(name: impl Into<String>) -> Self {
        Self::Device(name.into())
    }

    pub fn device_name(&self) -> Option<&str> {
        match self {
            Self::Device(name) => Some(name),
            Self::Catalog => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(name) => write!(f, "device:{name}"),
            Self::Catalog => f.write_str("catalog"),
        }
    }
}

// ── Diff operations ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    Add(VlanRecord),
    Update { old: VlanRecord, new: VlanRecord },
    Remove(VlanRecord),
}

/// One typed mutation against a single scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOperation {
    pub scope: Scope,
    #[serde(flatten)]
    pub change: Change,
}

impl DiffOperation {
    pub fn add(scope: Scope, record: VlanRecord) -> Self {
        Self {
            scope,
            change: Change::Add(record),
        }
    }

    pub fn update(scope: Scope, old: VlanRecord, new: VlanRecord) -> Self {
        Self {
            scope,
            change: Change::Update { old, new },
        }
    }

    pub fn remove(scope: Scope, record: VlanRecord) -> Self {
        Self {
            scope,
            change: Change::Remove(record),
        }
    }

    /// The VLAN id this operation targets.
    pub fn id(&self) -> &str {
        match &self.change {
            Change::Add(r) | Change::Remove(r) | Change::Update { new: r, .. } => &r.id,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self.change {
            Change::Add(_) => "add",
            Change::Update { .. } => "update",
            Change::Remove(_) => "remove",
        }
    }
}

impl fmt::Display for DiffOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            Change::Add(r) => write!(f, "{}: add vlan {} ({})", self.scope, r.id, r.name),
            Change::Update { old, new } => write!(
                f,
                "{}: update vlan {} ({} -> {})",
                self.scope, new.id, old.name, new.name
            ),
            Change::Remove(r) => write!(f, "{}: remove vlan {} ({})", self.scope, r.id, r.name),
        }
    }
}

// ── Id ordering ──────────────────────────────────────────────────────

/// Numeric-aware VLAN id ordering.
///
/// Ids that parse as integers sort numerically (`"2" < "10"`), ties broken
/// textually so `"010"` and `"10"` stay distinct. Anything else sorts after
/// all numeric ids, lexicographically.
pub fn id_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sort records in place by [`id_order`].
pub fn sort_by_id(records: &mut [VlanRecord]) {
    records.sort_by(|a, b| id_order(&a.id, &b.id));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn new_record_gets_default_description() {
        let r = VlanRecord::new("110", "users");
        assert_eq!(r.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn missing_description_deserializes_to_default() {
        let r: VlanRecord = serde_json::from_str(r#"{"id":"20","name":"voice"}"#).unwrap();
        assert_eq!(r, VlanRecord::new("20", "voice"));
    }

    #[test]
    fn unreported_description_keeps_the_stored_one() {
        let stored = VlanRecord::new("110", "voice").with_description("VoIP handsets");

        let reported = VlanRecord::new("110", "voice");
        assert!(!reported.has_description());
        assert_eq!(reported.observed_over(&stored), stored);

        let renamed = VlanRecord::new("110", "phones");
        assert_eq!(
            renamed.observed_over(&stored),
            VlanRecord::new("110", "phones").with_description("VoIP handsets")
        );

        let described = VlanRecord::new("110", "voice").with_description("floor 2");
        assert_eq!(described.observed_over(&stored), described);
    }

    #[test]
    fn ids_order_numerically_then_text() {
        let mut ids = vec!["10", "2", "abc", "1", "010", "100", "Z"];
        ids.sort_by(|a, b| id_order(a, b));
        assert_eq!(ids, vec!["1", "2", "010", "10", "100", "Z", "abc"]);
    }

    #[test]
    fn operation_serializes_with_tag() {
        let op = DiffOperation::add(Scope::device("sw1"), VlanRecord::new("110", "users"));
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "add");
        assert_eq!(json["id"], "110");
        assert_eq!(json["scope"]["device"], "sw1");
    }

    #[test]
    fn display_names_scope_and_vlan() {
        let op = DiffOperation::update(
            Scope::Catalog,
            VlanRecord::new("30", "old"),
            VlanRecord::new("30", "new"),
        );
        assert_eq!(op.to_string(), "catalog: update vlan 30 (old -> new)");
        assert_eq!(op.id(), "30");
        assert_eq!(op.verb(), "update");
    }

    #[test]
    fn device_vlan_record_flattens() {
        let rec = DeviceVlanRecord {
            device: "sw1".into(),
            vlan: VlanRecord::new("1", "default"),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["device"], "sw1");
        assert_eq!(json["id"], "1");
        assert_eq!(json["description"], DEFAULT_DESCRIPTION);
    }
}
