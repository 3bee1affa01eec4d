mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

use clap::Parser;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "vlansync", &mut std::io::stdout());
            Ok(())
        }

        // Config commands report on the file rather than act on it, so a
        // broken config must not stop them.
        Command::Config(args) => {
            let _guard = logging::init(&cli.global, None)?;
            commands::config_cmd::handle(args, &cli.global)
        }

        cmd => {
            let cfg = config::load(&cli.global)?;
            let _guard = logging::init(&cli.global, Some(&cfg))?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, cfg, &cli.global).await
        }
    }
}
