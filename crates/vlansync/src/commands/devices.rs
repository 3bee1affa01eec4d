//! `vlansync devices`: show the resolved inventory.

use tabled::Tabled;
use vlansync_config::{Config, CredentialDefaults};
use vlansync_transport::DeviceDescriptor;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Auth")]
    auth: &'static str,
}

impl From<&DeviceDescriptor> for DeviceRow {
    fn from(d: &DeviceDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            host: d.host.clone(),
            port: d.port,
            device_type: d.device_type.clone(),
            username: d.credentials.username.clone().unwrap_or_default(),
            auth: if d.credentials.password.is_some() {
                "password"
            } else {
                "key"
            },
        }
    }
}

pub fn handle(args: DevicesArgs, mut config: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { inventory } => {
            if let Some(path) = inventory {
                config.override_inventory(&path)?;
            }
            config.validate()?;

            let devices = config.load_inventory(&CredentialDefaults::from_env())?;
            let out = output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::from(d),
                |d| d.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
