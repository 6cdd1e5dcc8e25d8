//! Sqlity CLI: open a SQLite file and run one command, or serve JSON requests on stdin.

use anyhow::Result;
use clap::Parser;
use sqlity::engine::arg_parser::Cli;
use sqlity::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
