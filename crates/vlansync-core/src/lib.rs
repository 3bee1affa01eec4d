// vlansync-core: VLAN reconciliation engine (parse, diff, store, worker pool).

pub mod diff;
pub mod error;
pub mod model;
pub mod parser;
pub mod reconciler;
pub mod report;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use diff::{catalog_additions, diff};
pub use error::StoreError;
pub use model::{
    Change, DEFAULT_DESCRIPTION, DeviceVlanRecord, DiffOperation, Scope, VlanRecord, id_order,
    sort_by_id,
};
pub use parser::{Grammar, OutputParser, ParseOutput, TabularSummary};
pub use reconciler::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_WORKERS, Reconciler, ReconcilerConfig,
};
pub use report::{DeviceOutcome, DeviceReport, OutcomeKind, ReconcileSummary};
pub use store::{
    ApplyOutcome, InsertOutcome, MemoryStore, RemoveOutcome, SqliteStore, UpdateOutcome,
    VlanStore,
};
