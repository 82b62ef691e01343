//! Speed-test executable: cold-start translation latency until interrupted.

use anyhow::Result;
use clap::Parser;
use nmtbench_harness::cli::{run_cli, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli)
}
