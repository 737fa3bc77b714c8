//! Meridian command line tool.

use clap::Parser;
use meridian_cli::{Cli, commands, init_logging};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(errors) = cli.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(catalog = %cli.catalog.display(), database = %cli.database, "Starting meridian");
    let output = commands::run(&cli)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
