// ── VLAN store ──
//
// Repository over two tables: the global catalog and per-device VLANs.
// Constraint outcomes (duplicate insert, missing row) are typed results;
// `StoreError` is reserved for the engine itself failing.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::Serialize;

use crate::error::StoreError;
use crate::model::{Change, DeviceVlanRecord, DiffOperation, Scope, VlanRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// What happened when one [`DiffOperation`] was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Insert(InsertOutcome),
    Update(UpdateOutcome),
    Remove(RemoveOutcome),
}

impl ApplyOutcome {
    /// The operation hit a uniqueness or existence constraint and changed
    /// nothing.
    pub fn is_conflict(self) -> bool {
        matches!(
            self,
            Self::Insert(InsertOutcome::AlreadyExists)
                | Self::Update(UpdateOutcome::NotFound)
                | Self::Remove(RemoveOutcome::NotFound)
        )
    }
}

/// Storage engine for VLAN records.
///
/// Implementors provide the scope-generic primitives; the catalog and
/// per-device helpers are derived from them. Every primitive is atomic for
/// a single record.
pub trait VlanStore: Send + Sync {
    /// Insert if absent. An existing id is left untouched.
    fn insert(&self, scope: &Scope, record: &VlanRecord) -> Result<InsertOutcome, StoreError>;

    /// Replace name and description of an existing id. Never inserts.
    fn update(
        &self,
        scope: &Scope,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<UpdateOutcome, StoreError>;

    fn remove(&self, scope: &Scope, id: &str) -> Result<RemoveOutcome, StoreError>;

    fn get(&self, scope: &Scope, id: &str) -> Result<Option<VlanRecord>, StoreError>;

    /// All records in the scope, in insertion order.
    fn list(&self, scope: &Scope) -> Result<Vec<VlanRecord>, StoreError>;

    /// Devices holding at least one VLAN, ordered by each device's oldest
    /// stored VLAN.
    fn list_devices(&self) -> Result<Vec<String>, StoreError>;

    // ── Catalog ──────────────────────────────────────────────────────

    fn upsert_catalog(&self, record: &VlanRecord) -> Result<InsertOutcome, StoreError> {
        self.insert(&Scope::Catalog, record)
    }

    fn update_catalog(
        &self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        self.update(&Scope::Catalog, id, name, description)
    }

    fn remove_catalog(&self, id: &str) -> Result<RemoveOutcome, StoreError> {
        self.remove(&Scope::Catalog, id)
    }

    fn get_catalog(&self, id: &str) -> Result<Option<VlanRecord>, StoreError> {
        self.get(&Scope::Catalog, id)
    }

    fn list_catalog(&self) -> Result<Vec<VlanRecord>, StoreError> {
        self.list(&Scope::Catalog)
    }

    // ── Per device ───────────────────────────────────────────────────

    fn upsert_for_device(
        &self,
        device: &str,
        record: &VlanRecord,
    ) -> Result<InsertOutcome, StoreError> {
        self.insert(&Scope::device(device), record)
    }

    fn update_for_device(
        &self,
        device: &str,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        self.update(&Scope::device(device), id, name, description)
    }

    fn remove_for_device(&self, device: &str, id: &str) -> Result<RemoveOutcome, StoreError> {
        self.remove(&Scope::device(device), id)
    }

    fn get_for_device(&self, device: &str, id: &str) -> Result<Option<VlanRecord>, StoreError> {
        self.get(&Scope::device(device), id)
    }

    fn list_for_device(&self, device: &str) -> Result<Vec<DeviceVlanRecord>, StoreError> {
        Ok(self
            .list(&Scope::device(device))?
            .into_iter()
            .map(|vlan| DeviceVlanRecord {
                device: device.to_owned(),
                vlan,
            })
            .collect())
    }

    // ── Diff application ─────────────────────────────────────────────

    /// Dispatch one operation to the matching primitive.
    fn apply(&self, op: &DiffOperation) -> Result<ApplyOutcome, StoreError> {
        match &op.change {
            Change::Add(record) => self.insert(&op.scope, record).map(ApplyOutcome::Insert),
            Change::Update { new, .. } => self
                .update(&op.scope, &new.id, &new.name, &new.description)
                .map(ApplyOutcome::Update),
            Change::Remove(record) => self.remove(&op.scope, &record.id).map(ApplyOutcome::Remove),
        }
    }
}
