use airq_processor::cli::{run, Cli};
use airq_processor::error::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
