//! `vlansync sync`: run reconciliation passes and report per device.

use std::fmt::Write as _;

use tabled::Tabled;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vlansync_config::{Config, CredentialDefaults};
use vlansync_core::{DeviceReport, ReconcileSummary, Reconciler};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::config::{build_transport, open_store};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Changes")]
    changes: String,
    #[tabled(rename = "Catalog +")]
    catalog: String,
    #[tabled(rename = "Elapsed")]
    elapsed: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&DeviceReport> for ReportRow {
    fn from(r: &DeviceReport) -> Self {
        Self {
            device: r.device.clone(),
            host: r.host.clone(),
            status: r.outcome.kind().to_string(),
            changes: r.operations.len().to_string(),
            catalog: r.catalog_added.to_string(),
            elapsed: format!("{}ms", r.elapsed.as_millis()),
            detail: r.outcome.detail(),
        }
    }
}

fn render_summary(summary: &ReconcileSummary, color: bool) -> String {
    let rows: Vec<ReportRow> = summary.reports.iter().map(ReportRow::from).collect();
    let mut out = output::render_table(&rows);

    let counts: Vec<String> = summary
        .counts()
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(kind, n)| output::paint_count(kind, n, color))
        .collect();
    let _ = write!(
        out,
        "\nrun {} at {}: {}; {} change(s), {} catalog addition(s)",
        summary.run_id,
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        if counts.is_empty() {
            "no devices".to_owned()
        } else {
            counts.join(", ")
        },
        summary.total_applied(),
        summary.total_catalog_added(),
    );
    out
}

// ── Overrides ───────────────────────────────────────────────────────

fn apply_overrides(config: &mut Config, args: SyncArgs) -> Result<(), CliError> {
    if let Some(path) = args.inventory {
        config.override_inventory(&path)?;
    }
    if let Some(workers) = args.workers {
        config.poller.workers = workers;
    }
    if let Some(command) = args.command {
        config.poller.command = command;
    }
    if let Some(timeout) = args.timeout {
        config.poller.command_timeout_secs = timeout;
    }
    if let Some(interval) = args.polling_interval {
        config.poller.polling_interval_secs = interval.as_secs();
    }
    config.validate()?;
    Ok(())
}

/// Cancel `token` on the first Ctrl-C. In-flight devices still finish.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; finishing in-flight devices");
            token.cancel();
        }
    });
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SyncArgs, mut config: Config, global: &GlobalOpts) -> Result<(), CliError> {
    apply_overrides(&mut config, args)?;

    let devices = config.load_inventory(&CredentialDefaults::from_env())?;
    if devices.is_empty() {
        return Err(CliError::NoDevices);
    }

    let store = open_store(&config)?;
    let transport = build_transport(&config)?;
    let reconciler = Reconciler::new(store, transport, config.reconciler_config());

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let interval = config.polling_interval();
    let command = config.poller.command.clone();
    let color = output::should_color(&global.color);

    loop {
        let summary = reconciler.reconcile(&devices, &command, &cancel).await;
        let out = output::render_single(
            &global.output,
            &summary,
            |s| render_summary(s, color),
            |s| {
                s.reports
                    .iter()
                    .map(|r| format!("{}\t{}", r.device, r.outcome.kind()))
                    .collect::<Vec<_>>()
                    .join("\n")
            },
        );
        output::print_output(&out, global.quiet);

        let failure = CliError::from_summary(&summary);
        let Some(every) = interval else {
            return failure.map_or(Ok(()), Err);
        };
        if let Some(err) = failure {
            warn!(error = %err, "pass finished with failures");
        }
        if cancel.is_cancelled() {
            return Ok(());
        }

        info!(next_in = %humantime::format_duration(every), "waiting for next pass");
        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            () = tokio::time::sleep(every) => {}
        }
    }
}
