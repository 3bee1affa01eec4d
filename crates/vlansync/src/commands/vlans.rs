//! `vlansync vlans`: read and edit stored VLAN records.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;
use vlansync_config::Config;
use vlansync_core::{DeviceVlanRecord, RemoveOutcome, UpdateOutcome, VlanRecord, VlanStore};

use crate::cli::{GlobalOpts, VlansArgs, VlansCommand};
use crate::config::open_store;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct VlanRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&VlanRecord> for VlanRow {
    fn from(v: &VlanRecord) -> Self {
        Self {
            id: v.id.clone(),
            name: v.name.clone(),
            description: v.description.clone(),
        }
    }
}

#[derive(Serialize)]
struct StoredDevice {
    device: String,
    vlans: usize,
}

#[derive(Tabled)]
struct StoredDeviceRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "VLANs")]
    vlans: usize,
}

// ── Helpers ─────────────────────────────────────────────────────────

fn not_found(id: &str, device: Option<&str>) -> CliError {
    match device {
        Some(device) => CliError::NotFound {
            resource_type: format!("VLAN on device {device}"),
            identifier: id.into(),
            list_command: format!("vlans device {device}"),
        },
        None => CliError::NotFound {
            resource_type: "catalog VLAN".into(),
            identifier: id.into(),
            list_command: "vlans list".into(),
        },
    }
}

fn notify(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}

fn list_device(
    store: &Arc<dyn VlanStore>,
    name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let rows = store.list_for_device(name)?;
    if rows.is_empty() {
        return Err(CliError::NotFound {
            resource_type: "device".into(),
            identifier: name.into(),
            list_command: "vlans devices".into(),
        });
    }
    let out = output::render_list(
        &global.output,
        &rows,
        |r: &DeviceVlanRecord| VlanRow::from(&r.vlan),
        |r| r.vlan.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn list_devices(store: &Arc<dyn VlanStore>, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = store
        .list_devices()?
        .into_iter()
        .map(|device| -> Result<StoredDevice, CliError> {
            let vlans = store.list_for_device(&device)?.len();
            Ok(StoredDevice { device, vlans })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let out = output::render_list(
        &global.output,
        &devices,
        |d| StoredDeviceRow {
            device: d.device.clone(),
            vlans: d.vlans,
        },
        |d| d.device.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn set_description(
    store: &Arc<dyn VlanStore>,
    id: &str,
    description: &str,
    device: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let current = match device {
        Some(device) => store.get_for_device(device, id)?,
        None => store.get_catalog(id)?,
    }
    .ok_or_else(|| not_found(id, device))?;

    if current.description == description {
        notify(global, &format!("VLAN {id} already has that description"));
        return Ok(());
    }
    let outcome = match device {
        Some(device) => store.update_for_device(device, id, &current.name, description)?,
        None => store.update_catalog(id, &current.name, description)?,
    };
    match outcome {
        UpdateOutcome::Updated => {
            notify(global, &format!("VLAN {id} description updated"));
            Ok(())
        }
        UpdateOutcome::NotFound => Err(not_found(id, device)),
    }
}

fn remove(
    store: &Arc<dyn VlanStore>,
    id: &str,
    device: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let action = match device {
        Some(device) => format!("remove VLAN {id} from device {device}"),
        None => format!("remove VLAN {id} from the catalog"),
    };
    if !super::confirm(&action, global)? {
        return Ok(());
    }
    let outcome = match device {
        Some(device) => store.remove_for_device(device, id)?,
        None => store.remove_catalog(id)?,
    };
    match outcome {
        RemoveOutcome::Removed => {
            notify(global, &format!("VLAN {id} removed"));
            Ok(())
        }
        RemoveOutcome::NotFound => Err(not_found(id, device)),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: VlansArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let store = open_store(config)?;

    match args.command {
        VlansCommand::List => {
            let catalog = store.list_catalog()?;
            let out = output::render_list(
                &global.output,
                &catalog,
                |v| VlanRow::from(v),
                |v| v.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
        VlansCommand::Device { name } => list_device(&store, &name, global),
        VlansCommand::Devices => list_devices(&store, global),
        VlansCommand::SetDescription {
            id,
            description,
            device,
        } => set_description(&store, &id, &description, device.as_deref(), global),
        VlansCommand::Remove { id, device } => remove(&store, &id, device.as_deref(), global),
    }
}
