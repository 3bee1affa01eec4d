// ── Reconciliation reports ──
//
// Per-device outcomes and the batch summary handed back to callers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use strum::{Display, EnumIter, IntoEnumIterator};
use uuid::Uuid;
use vlansync_transport::{DeviceDescriptor, TransportError};

use crate::model::DiffOperation;

/// How one device's reconciliation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// Device and store already agreed.
    Synced,
    /// `applied` device-scope operations committed.
    Updated { applied: usize },
    TransportFailed { error: TransportError },
    /// Nothing parsed, so the store was left alone.
    ParseEmpty { unsupported: bool },
    /// The engine failed part-way; earlier commits remain.
    StoreFailed { reason: String },
    /// Never started because the batch was cancelled.
    Cancelled,
    /// The worker handling the device went away without reporting.
    Aborted { reason: String },
}

/// Field-less mirror of [`DeviceOutcome`] for counting and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Synced,
    Updated,
    TransportFailed,
    ParseEmpty,
    StoreFailed,
    Cancelled,
    Aborted,
}

impl DeviceOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Synced => OutcomeKind::Synced,
            Self::Updated { .. } => OutcomeKind::Updated,
            Self::TransportFailed { .. } => OutcomeKind::TransportFailed,
            Self::ParseEmpty { .. } => OutcomeKind::ParseEmpty,
            Self::StoreFailed { .. } => OutcomeKind::StoreFailed,
            Self::Cancelled => OutcomeKind::Cancelled,
            Self::Aborted { .. } => OutcomeKind::Aborted,
        }
    }

    /// Transport, store and worker failures. Parse mismatches and
    /// cancellation are not failures.
    pub fn is_failure(&self) -> bool {
        self.kind().is_failure()
    }

    /// One-line human description.
    pub fn detail(&self) -> String {
        match self {
            Self::Synced => "in sync".into(),
            Self::Updated { applied } => format!("{applied} change(s) applied"),
            Self::TransportFailed { error } => error.to_string(),
            Self::ParseEmpty { unsupported: true } => "no grammar for command/device type".into(),
            Self::ParseEmpty { unsupported: false } => "no VLAN rows in output".into(),
            Self::StoreFailed { reason } | Self::Aborted { reason } => reason.clone(),
            Self::Cancelled => "not started".into(),
        }
    }
}

impl OutcomeKind {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::TransportFailed | Self::StoreFailed | Self::Aborted
        )
    }
}

/// Result for one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub device: String,
    pub host: String,
    pub outcome: DeviceOutcome,
    /// Device-scope operations computed by the diff, in apply order.
    pub operations: Vec<DiffOperation>,
    /// Catalog entries created from this device's VLANs.
    pub catalog_added: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl DeviceReport {
    pub fn new(device: &DeviceDescriptor, outcome: DeviceOutcome) -> Self {
        Self {
            device: device.name.clone(),
            host: device.host.clone(),
            outcome,
            operations: Vec::new(),
            catalog_added: 0,
            elapsed: Duration::ZERO,
        }
    }
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

/// Result of one reconciliation batch. Reports follow inventory order.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileSummary {
    pub run_id: Uuid,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reports: Vec<DeviceReport>,
}

impl ReconcileSummary {
    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.kind() == kind)
            .count()
    }

    /// Count per outcome kind, every kind present, in declaration order.
    pub fn counts(&self) -> Vec<(OutcomeKind, usize)> {
        OutcomeKind::iter().map(|k| (k, self.count(k))).collect()
    }

    pub fn failures(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_failure())
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(|r| r.outcome.is_failure())
    }

    /// Device-scope operations committed across the batch.
    pub fn total_applied(&self) -> usize {
        self.reports
            .iter()
            .map(|r| match r.outcome {
                DeviceOutcome::Updated { applied } => applied,
                _ => 0,
            })
            .sum()
    }

    pub fn total_catalog_added(&self) -> usize {
        self.reports.iter().map(|r| r.catalog_added).sum()
    }

    pub fn report_for(&self, device: &str) -> Option<&DeviceReport> {
        self.reports.iter().find(|r| r.device == device)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn summary(outcomes: Vec<DeviceOutcome>) -> ReconcileSummary {
        let now = Utc::now();
        ReconcileSummary {
            run_id: Uuid::new_v4(),
            command: "show vlan".into(),
            started_at: now,
            finished_at: now,
            reports: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| {
                    let device =
                        DeviceDescriptor::new(format!("sw{i}"), format!("10.0.0.{i}"), "cisco_ios");
                    DeviceReport::new(&device, outcome)
                })
                .collect(),
        }
    }

    #[test]
    fn failures_exclude_parse_empty_and_cancelled() {
        let s = summary(vec![
            DeviceOutcome::Synced,
            DeviceOutcome::ParseEmpty { unsupported: true },
            DeviceOutcome::Cancelled,
        ]);
        assert!(!s.has_failures());

        let s = summary(vec![
            DeviceOutcome::Synced,
            DeviceOutcome::StoreFailed {
                reason: "disk full".into(),
            },
        ]);
        assert!(s.has_failures());
        assert_eq!(s.failures(), 1);
    }

    #[test]
    fn counts_cover_every_kind() {
        let s = summary(vec![
            DeviceOutcome::Updated { applied: 2 },
            DeviceOutcome::Updated { applied: 3 },
            DeviceOutcome::Synced,
        ]);
        let counts = s.counts();
        assert_eq!(counts.len(), 7);
        assert!(counts.contains(&(OutcomeKind::Updated, 2)));
        assert!(counts.contains(&(OutcomeKind::Aborted, 0)));
        assert_eq!(s.total_applied(), 5);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = DeviceOutcome::TransportFailed {
            error: TransportError::Timeout {
                host: "10.0.0.1".into(),
                timeout_secs: 30,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "transport_failed");
        assert_eq!(json["error"]["kind"], "timeout");
        assert_eq!(OutcomeKind::TransportFailed.to_string(), "transport_failed");
    }
}
