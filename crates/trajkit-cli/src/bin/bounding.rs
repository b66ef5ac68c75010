use std::io::{self, BufWriter, Write};

use clap::Parser;
use env_logger::Env;

use trajkit_cli::{bounding, log_filter, BoundingCli};
use trajkit_core::error::TrajResult;

fn main() -> Result<(), String> {
    if let Err(err) = run_cli() {
        return Err(err.to_string());
    }
    Ok(())
}

fn run_cli() -> TrajResult<()> {
    let cli = BoundingCli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(log_filter(cli.verbose))).init();
    let report = bounding(&cli.model, &cli.selection)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    report.write(&mut out)?;
    out.flush()?;
    Ok(())
}
