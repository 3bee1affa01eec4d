// ── Reconciler ──
//
// Fans a device inventory out over a fixed worker pool, runs the
// transport → parse → diff → apply pipeline per device and fans the
// results back in as one `ReconcileSummary`. A failing device never
// affects its siblings.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use uuid::Uuid;
use vlansync_transport::{DeviceDescriptor, DeviceTransport, TransportError};

use crate::diff::{catalog_additions, diff};
use crate::error::StoreError;
use crate::model::{DiffOperation, Scope, VlanRecord};
use crate::parser::OutputParser;
use crate::report::{DeviceOutcome, DeviceReport, OutcomeKind, ReconcileSummary};
use crate::store::VlanStore;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Pool size. Clamped to at least one and at most the device count.
    pub workers: usize,
    /// Deadline for each transport call.
    pub command_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

type WorkQueue = Arc<Mutex<VecDeque<(usize, DeviceDescriptor)>>>;

/// Cheaply cloneable handle; clones share the store and transport.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<ReconcilerInner>,
}

struct ReconcilerInner {
    store: Arc<dyn VlanStore>,
    transport: Arc<dyn DeviceTransport>,
    parser: OutputParser,
    config: ReconcilerConfig,
}

/// What the store step committed for one device.
struct Applied {
    operations: Vec<DiffOperation>,
    applied: usize,
    catalog_added: usize,
}

impl Reconciler {
    /// Reconciler using the built-in grammar set.
    pub fn new(
        store: Arc<dyn VlanStore>,
        transport: Arc<dyn DeviceTransport>,
        config: ReconcilerConfig,
    ) -> Self {
        Self::with_parser(store, transport, OutputParser::default(), config)
    }

    pub fn with_parser(
        store: Arc<dyn VlanStore>,
        transport: Arc<dyn DeviceTransport>,
        parser: OutputParser,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ReconcilerInner {
                store,
                transport,
                parser,
                config,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn VlanStore> {
        &self.inner.store
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.inner.config
    }

    /// Reconcile every device once.
    ///
    /// Workers check `cancel` before taking the next device; devices that
    /// were never started are reported as [`DeviceOutcome::Cancelled`].
    /// In-flight devices finish their pipeline.
    pub async fn reconcile(
        &self,
        devices: &[DeviceDescriptor],
        command: &str,
        cancel: &CancellationToken,
    ) -> ReconcileSummary {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", %run_id);
        self.run(run_id, devices, command, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: Uuid,
        devices: &[DeviceDescriptor],
        command: &str,
        cancel: &CancellationToken,
    ) -> ReconcileSummary {
        let started_at = Utc::now();
        let workers = self.inner.config.workers.max(1).min(devices.len());
        info!(devices = devices.len(), workers, command, "starting reconciliation");

        let queue: WorkQueue = Arc::new(Mutex::new(
            devices.iter().cloned().enumerate().collect(),
        ));
        let command: Arc<str> = Arc::from(command);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let this = self.clone();
            let queue = Arc::clone(&queue);
            let command = Arc::clone(&command);
            let cancel = cancel.clone();
            let tx = tx.clone();
            pool.spawn(
                async move { this.worker_loop(worker, queue, command, cancel, tx).await }
                    .instrument(Span::current()),
            );
        }
        drop(tx);

        let mut slots: Vec<Option<DeviceReport>> = devices.iter().map(|_| None).collect();
        while let Some((index, report)) = rx.recv().await {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(report);
            }
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "reconcile worker terminated abnormally");
            }
        }

        let cancelled = cancel.is_cancelled();
        let reports: Vec<DeviceReport> = devices
            .iter()
            .zip(slots)
            .map(|(device, slot)| {
                slot.unwrap_or_else(|| {
                    let outcome = if cancelled {
                        DeviceOutcome::Cancelled
                    } else {
                        DeviceOutcome::Aborted {
                            reason: "worker exited before reporting".into(),
                        }
                    };
                    DeviceReport::new(device, outcome)
                })
            })
            .collect();

        let summary = ReconcileSummary {
            run_id,
            command: command.to_string(),
            started_at,
            finished_at: Utc::now(),
            reports,
        };
        info!(
            synced = summary.count(OutcomeKind::Synced),
            updated = summary.count(OutcomeKind::Updated),
            failed = summary.failures(),
            parse_empty = summary.count(OutcomeKind::ParseEmpty),
            cancelled = summary.count(OutcomeKind::Cancelled),
            applied = summary.total_applied(),
            "reconciliation finished"
        );
        summary
    }

    async fn worker_loop(
        self,
        worker: usize,
        queue: WorkQueue,
        command: Arc<str>,
        cancel: CancellationToken,
        tx: mpsc::UnboundedSender<(usize, DeviceReport)>,
    ) {
        loop {
            if cancel.is_cancelled() {
                debug!(worker, "cancellation requested, worker stopping");
                break;
            }
            let next = queue.lock().await.pop_front();
            let Some((index, device)) = next else {
                break;
            };

            let span = info_span!("device", device = %device.name, host = %device.host);
            let report = self.reconcile_device(&device, &command).instrument(span).await;
            if tx.send((index, report)).is_err() {
                break;
            }
        }
    }

    async fn reconcile_device(&self, device: &DeviceDescriptor, command: &str) -> DeviceReport {
        let started = Instant::now();
        let finish = |mut report: DeviceReport| {
            report.elapsed = started.elapsed();
            report
        };

        let raw = match self.fetch(device, command).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(kind = error.kind(), %error, "transport failed");
                return finish(DeviceReport::new(
                    device,
                    DeviceOutcome::TransportFailed { error },
                ));
            }
        };

        let parsed = self
            .inner
            .parser
            .parse(&raw, command, &device.device_type);
        let unsupported = parsed.is_unsupported();
        let records = parsed.into_records();
        if records.is_empty() {
            if unsupported {
                info!(device_type = %device.device_type, command, "no grammar for command and device type, skipping");
            } else {
                info!("no VLAN rows in device output, stored state left untouched");
            }
            return finish(DeviceReport::new(
                device,
                DeviceOutcome::ParseEmpty { unsupported },
            ));
        }
        debug!(records = records.len(), "parsed device output");

        let store = Arc::clone(&self.inner.store);
        let name = device.name.clone();
        let span = Span::current();
        let joined = tokio::task::spawn_blocking(move || {
            span.in_scope(|| apply_records(store.as_ref(), &name, &records))
        })
        .await;

        let result = joined.unwrap_or_else(|e| Err(StoreError::Task(e.to_string())));
        match result {
            Ok(applied) => {
                let outcome = if applied.operations.is_empty() {
                    DeviceOutcome::Synced
                } else {
                    DeviceOutcome::Updated {
                        applied: applied.applied,
                    }
                };
                info!(
                    operations = applied.operations.len(),
                    applied = applied.applied,
                    catalog_added = applied.catalog_added,
                    "device reconciled"
                );
                let mut report = DeviceReport::new(device, outcome);
                report.operations = applied.operations;
                report.catalog_added = applied.catalog_added;
                finish(report)
            }
            Err(e) => {
                warn!(error = %e, "store failed, device left partially applied");
                finish(DeviceReport::new(
                    device,
                    DeviceOutcome::StoreFailed {
                        reason: e.to_string(),
                    },
                ))
            }
        }
    }

    /// Run the transport under the configured deadline.
    async fn fetch(&self, device: &DeviceDescriptor, command: &str) -> Result<String, TransportError> {
        let timeout = self.inner.config.command_timeout;
        match tokio::time::timeout(timeout, self.inner.transport.execute(device, command, timeout))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                host: device.host.clone(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

/// Diff `reported` against the device's stored VLANs, apply the result,
/// then add unseen VLANs to the catalog. Runs on the blocking pool.
fn apply_records(
    store: &dyn VlanStore,
    device: &str,
    reported: &[VlanRecord],
) -> Result<Applied, StoreError> {
    let stored = store.list(&Scope::device(device))?;
    let operations = diff(device, reported, &stored);

    let mut applied = 0;
    for op in &operations {
        let outcome = store.apply(op)?;
        if outcome.is_conflict() {
            debug!(%op, ?outcome, "store conflict, row left as is");
        } else {
            applied += 1;
            debug!(%op, "committed");
        }
    }

    let catalog = store.list_catalog()?;
    let mut catalog_added = 0;
    for op in catalog_additions(reported, &catalog) {
        let outcome = store.apply(&op)?;
        if outcome.is_conflict() {
            debug!(%op, ?outcome, "catalog already has vlan");
        } else {
            catalog_added += 1;
            debug!(%op, "committed");
        }
    }

    Ok(Applied {
        operations,
        applied,
        catalog_added,
    })
}
