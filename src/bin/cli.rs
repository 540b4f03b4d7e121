// src/bin/cli.rs
use receipt_harvest::cli;

fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    cli::run()
}
