//! Command dispatch: bridges CLI args to the reconciler, the store and the
//! inventory, then hands results to output formatting.

pub mod config_cmd;
pub mod devices;
pub mod sync;
pub mod vlans;

use std::io::IsTerminal;

use vlansync_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs the loaded configuration.
pub async fn dispatch(cmd: Command, config: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Sync(args) => sync::handle(args, config, global).await,
        Command::Vlans(args) => vlans::handle(args, &config, global),
        Command::Devices(args) => devices::handle(args, config, global),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Ask before `action`, auto-approving if `--yes` was passed. Without a
/// terminal to ask on, the action is refused.
pub fn confirm(action: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NotConfirmed {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(format!("Really {action}?"))
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
