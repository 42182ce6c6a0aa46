//! reportdb CLI - Command-line interface for reportdb schemas.

use clap::Parser;

use reportdb_cli::cli::{Cli, Command};
use reportdb_cli::commands;
use reportdb_cli::error::CliResult;
use reportdb_cli::output;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::newline();
        output::diagnostic(e);
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Validate(args) => commands::validate::run(args).await,
        Command::Format(args) => commands::format::run(args).await,
        Command::Generate(args) => commands::generate::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
