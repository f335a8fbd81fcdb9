// pirisk - main.rs
// Entry point: parse the command line and hand off to the dispatcher.

use clap::Parser;
use pirisk::cli::{dispatch, Cli};

fn main() -> anyhow::Result<()> {
    dispatch(Cli::parse())
}
