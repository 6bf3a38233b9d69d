use anyhow::{Context, Result};
use clap::crate_version;
use env_logger::Builder;

use proved::command::{PROVED_COMMANDS, ProvedCommand};

pub fn main() -> Result<()> {
    let command = PROVED_COMMANDS.build_cli();
    let command = command.version(crate_version!());
    let cli_matches = command.get_matches();

    Builder::new()
        .filter_level(ProvedCommand::get_verbosity(&cli_matches)?)
        .parse_default_env()
        .init();

    log::info!("proved starting");

    PROVED_COMMANDS
        .execute(&cli_matches)
        .context("Executing proved")
}
