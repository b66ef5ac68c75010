use std::io::{self, BufWriter, Write};

use clap::Parser;
use env_logger::Env;

use trajkit_cli::{run, write_report, Cli};
use trajkit_core::error::TrajResult;

fn main() -> Result<(), String> {
    if let Err(err) = run_cli() {
        return Err(err.to_string());
    }
    Ok(())
}

fn run_cli() -> TrajResult<()> {
    let header = std::env::args().collect::<Vec<_>>().join(" ");
    let cli = Cli::parse();
    let cfg = cli.into_config()?;
    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_filter())).init();
    log::debug!("configuration: {}", cfg.summary());

    let matrix = run(&cfg)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_report(&mut out, &cfg, &format!("{header} [{}]", cfg.summary()), &matrix)?;
    out.flush()?;
    Ok(())
}
