use clap::Parser;
use dockhand::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::run(&cli)?;
    Ok(())
}
