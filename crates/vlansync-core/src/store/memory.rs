// ── In-memory store engine ──
//
// Sharded concurrent maps, one per scope. Insertion order is recovered
// from a store-wide sequence stamped when a row is created, so devices
// order by their oldest surviving row the way SQLite orders by rowid.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{InsertOutcome, RemoveOutcome, UpdateOutcome, VlanStore};
use crate::error::StoreError;
use crate::model::{Scope, VlanRecord};

struct Row {
    seq: u64,
    record: VlanRecord,
}

/// One table: VLAN id → row.
struct RecordTable {
    rows: DashMap<String, Row>,
}

impl RecordTable {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    fn insert(&self, record: &VlanRecord, next_seq: &AtomicU64) -> InsertOutcome {
        match self.rows.entry(record.id.clone()) {
            Entry::Occupied(_) => InsertOutcome::AlreadyExists,
            Entry::Vacant(slot) => {
                let seq = next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Row {
                    seq,
                    record: record.clone(),
                });
                InsertOutcome::Created
            }
        }
    }

    fn update(&self, id: &str, name: &str, description: &str) -> UpdateOutcome {
        match self.rows.get_mut(id) {
            Some(mut row) => {
                name.clone_into(&mut row.record.name);
                description.clone_into(&mut row.record.description);
                UpdateOutcome::Updated
            }
            None => UpdateOutcome::NotFound,
        }
    }

    fn remove(&self, id: &str) -> RemoveOutcome {
        if self.rows.remove(id).is_some() {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        }
    }

    fn get(&self, id: &str) -> Option<VlanRecord> {
        self.rows.get(id).map(|row| row.record.clone())
    }

    fn list(&self) -> Vec<VlanRecord> {
        let mut rows: Vec<(u64, VlanRecord)> = self
            .rows
            .iter()
            .map(|r| (r.seq, r.record.clone()))
            .collect();
        rows.sort_unstable_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, record)| record).collect()
    }

    /// Sequence of the oldest row still present.
    fn first_seq(&self) -> Option<u64> {
        self.rows.iter().map(|r| r.seq).min()
    }
}

/// Process-local [`VlanStore`]. Contents are lost when it is dropped.
pub struct MemoryStore {
    catalog: RecordTable,
    devices: DashMap<String, Arc<RecordTable>>,
    /// Row sequence shared by every table.
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            catalog: RecordTable::new(),
            devices: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Existing table for a device. The map guard is released before
    /// returning so callers never hold a shard lock while working.
    fn device_table(&self, device: &str) -> Option<Arc<RecordTable>> {
        self.devices.get(device).map(|entry| Arc::clone(entry.value()))
    }

    fn device_table_or_create(&self, device: &str) -> Arc<RecordTable> {
        let entry = self
            .devices
            .entry(device.to_owned())
            .or_insert_with(|| Arc::new(RecordTable::new()));
        Arc::clone(entry.value())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VlanStore for MemoryStore {
    fn insert(&self, scope: &Scope, record: &VlanRecord) -> Result<InsertOutcome, StoreError> {
        Ok(match scope {
            Scope::Catalog => self.catalog.insert(record, &self.next_seq),
            Scope::Device(device) => self
                .device_table_or_create(device)
                .insert(record, &self.next_seq),
        })
    }

    fn update(
        &self,
        scope: &Scope,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        Ok(match scope {
            Scope::Catalog => self.catalog.update(id, name, description),
            Scope::Device(device) => self
                .device_table(device)
                .map_or(UpdateOutcome::NotFound, |t| t.update(id, name, description)),
        })
    }

    fn remove(&self, scope: &Scope, id: &str) -> Result<RemoveOutcome, StoreError> {
        Ok(match scope {
            Scope::Catalog => self.catalog.remove(id),
            Scope::Device(device) => self
                .device_table(device)
                .map_or(RemoveOutcome::NotFound, |t| t.remove(id)),
        })
    }

    fn get(&self, scope: &Scope, id: &str) -> Result<Option<VlanRecord>, StoreError> {
        Ok(match scope {
            Scope::Catalog => self.catalog.get(id),
            Scope::Device(device) => self.device_table(device).and_then(|t| t.get(id)),
        })
    }

    fn list(&self, scope: &Scope) -> Result<Vec<VlanRecord>, StoreError> {
        Ok(match scope {
            Scope::Catalog => self.catalog.list(),
            Scope::Device(device) => self
                .device_table(device)
                .map(|t| t.list())
                .unwrap_or_default(),
        })
    }

    fn list_devices(&self) -> Result<Vec<String>, StoreError> {
        let mut devices: Vec<(u64, String)> = self
            .devices
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .first_seq()
                    .map(|seq| (seq, entry.key().clone()))
            })
            .collect();
        devices.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(devices.into_iter().map(|(_, name)| name).collect())
    }
}
