mod abundance;
mod alignment;
mod cli;
mod config;
mod coverage;
mod error;
mod input;
mod output;
mod process;
mod resolve;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let cfg = cli::handle_cli().with_context(|| "Error processing command line arguments")?;
    process::process_alignments(&cfg)
}
