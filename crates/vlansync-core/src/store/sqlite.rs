// ── SQLite store engine ──
//
// Two tables, `vlans` (catalog) and `vlans_per_device`. One connection
// behind a mutex; SQLite itself provides writer isolation across
// processes. Insertion order is `rowid` order.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{InsertOutcome, RemoveOutcome, UpdateOutcome, VlanStore};
use crate::error::StoreError;
use crate::model::{Scope, VlanRecord};

const SCHEMA: &str = r"
    PRAGMA journal_mode=WAL;
    PRAGMA synchronous=NORMAL;
    PRAGMA busy_timeout=5000;

    CREATE TABLE IF NOT EXISTS vlans (
      id TEXT PRIMARY KEY NOT NULL,
      name TEXT NOT NULL,
      description TEXT NOT NULL DEFAULT 'change_me'
    );

    CREATE TABLE IF NOT EXISTS vlans_per_device (
      device TEXT NOT NULL,
      id TEXT NOT NULL,
      name TEXT NOT NULL,
      description TEXT NOT NULL DEFAULT 'change_me',
      PRIMARY KEY (device, id)
    );
";

/// Persistent [`VlanStore`] backed by a SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent
    /// directories and running migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite store");
        Self::migrate(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::migrate(Connection::open_in_memory()?, None)
    }

    /// Database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl VlanStore for SqliteStore {
    fn insert(&self, scope: &Scope, record: &VlanRecord) -> Result<InsertOutcome, StoreError> {
        let conn = self.conn()?;
        let changed = match scope {
            Scope::Catalog => conn.execute(
                "INSERT INTO vlans (id, name, description) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO NOTHING",
                params![record.id, record.name, record.description],
            )?,
            Scope::Device(device) => conn.execute(
                "INSERT INTO vlans_per_device (device, id, name, description)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(device, id) DO NOTHING",
                params![device, record.id, record.name, record.description],
            )?,
        };
        Ok(if changed == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Created
        })
    }

    fn update(
        &self,
        scope: &Scope,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        let conn = self.conn()?;
        let changed = match scope {
            Scope::Catalog => conn.execute(
                "UPDATE vlans SET name = ?2, description = ?3 WHERE id = ?1",
                params![id, name, description],
            )?,
            Scope::Device(device) => conn.execute(
                "UPDATE vlans_per_device SET name = ?3, description = ?4
                 WHERE device = ?1 AND id = ?2",
                params![device, id, name, description],
            )?,
        };
        Ok(if changed == 0 {
            UpdateOutcome::NotFound
        } else {
            UpdateOutcome::Updated
        })
    }

    fn remove(&self, scope: &Scope, id: &str) -> Result<RemoveOutcome, StoreError> {
        let conn = self.conn()?;
        let changed = match scope {
            Scope::Catalog => conn.execute("DELETE FROM vlans WHERE id = ?1", params![id])?,
            Scope::Device(device) => conn.execute(
                "DELETE FROM vlans_per_device WHERE device = ?1 AND id = ?2",
                params![device, id],
            )?,
        };
        Ok(if changed == 0 {
            RemoveOutcome::NotFound
        } else {
            RemoveOutcome::Removed
        })
    }

    fn get(&self, scope: &Scope, id: &str) -> Result<Option<VlanRecord>, StoreError> {
        let conn = self.conn()?;
        let row = match scope {
            Scope::Catalog => conn
                .query_row(
                    "SELECT id, name, description FROM vlans WHERE id = ?1",
                    params![id],
                    row_to_record,
                )
                .optional()?,
            Scope::Device(device) => conn
                .query_row(
                    "SELECT id, name, description FROM vlans_per_device
                     WHERE device = ?1 AND id = ?2",
                    params![device, id],
                    row_to_record,
                )
                .optional()?,
        };
        Ok(row)
    }

    fn list(&self, scope: &Scope) -> Result<Vec<VlanRecord>, StoreError> {
        let conn = self.conn()?;
        let records = match scope {
            Scope::Catalog => {
                let mut stmt =
                    conn.prepare("SELECT id, name, description FROM vlans ORDER BY rowid")?;
                stmt.query_map([], row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            Scope::Device(device) => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, description FROM vlans_per_device
                     WHERE device = ?1 ORDER BY rowid",
                )?;
                stmt.query_map(params![device], row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(records)
    }

    fn list_devices(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT device FROM vlans_per_device GROUP BY device ORDER BY MIN(rowid)",
        )?;
        let devices = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(devices)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<VlanRecord> {
    Ok(VlanRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DEFAULT_DESCRIPTION;

    #[test]
    fn open_creates_parent_directories_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state/vlan_sync.sqlite");

        {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
            store
                .upsert_for_device("sw1", &VlanRecord::new("110", "users"))
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let rows = reopened.list_for_device("sw1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vlan, VlanRecord::new("110", "users"));
    }

    #[test]
    fn same_vlan_on_two_devices_is_two_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let vlan = VlanRecord::new("1", "default");
        assert_eq!(
            store.upsert_for_device("sw1", &vlan).unwrap(),
            InsertOutcome::Created
        );
        assert_eq!(
            store.upsert_for_device("sw2", &vlan).unwrap(),
            InsertOutcome::Created
        );
        assert_eq!(store.list_devices().unwrap(), vec!["sw1", "sw2"]);
    }

    #[test]
    fn column_default_matches_model_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute("INSERT INTO vlans (id, name) VALUES ('5', 'raw')", [])
            .unwrap();
        let rec = store.get_catalog("5").unwrap().unwrap();
        assert_eq!(rec.description, DEFAULT_DESCRIPTION);
    }
}
