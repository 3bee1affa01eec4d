//! Config subcommand handlers.

use std::path::PathBuf;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::{config, output};

/// Where `config init` writes when no `--path` is given.
const DEFAULT_INIT_PATH: &str = "vlansync.yml";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| output::render_yaml(c),
                |c| {
                    c.source_path
                        .as_ref()
                        .map_or_else(|| "(defaults)".to_owned(), |p| p.display().to_string())
                },
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let path = global
                .config
                .clone()
                .or_else(vlansync_config::discover_config_path);
            let out = match path {
                Some(p) => p.display().to_string(),
                None => format!(
                    "{} (not present; defaults and environment apply)",
                    vlansync_config::config_path().display()
                ),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { path, force } => {
            let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_INIT_PATH));
            vlansync_config::init_config(&path, force)?;
            if !global.quiet {
                eprintln!("Configuration written to {}", path.display());
                eprintln!("Edit inventory_sources, then run: vlansync sync");
            }
            Ok(())
        }
    }
}
