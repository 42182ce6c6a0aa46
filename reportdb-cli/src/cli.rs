//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// reportdb CLI - schema tooling for the report database
#[derive(Parser, Debug)]
#[command(name = "reportdb")]
#[command(version)]
#[command(about = "reportdb CLI - schema tooling for the report database", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the schema file
    Validate(ValidateArgs),

    /// Format the schema file
    Format(FormatArgs),

    /// Generate Rust client code from the schema
    Generate(GenerateArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Validate Command
// =============================================================================

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to schema file
    #[arg(short, long, env = "REPORTDB_SCHEMA")]
    pub schema: Option<PathBuf>,
}

// =============================================================================
// Format Command
// =============================================================================

/// Arguments for the `format` command
#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Path to schema file
    #[arg(short, long, env = "REPORTDB_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Check formatting without writing changes
    #[arg(short, long)]
    pub check: bool,
}

// =============================================================================
// Generate Command
// =============================================================================

/// Arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path to schema file
    #[arg(short, long, env = "REPORTDB_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// File to write the generated code to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the generated code instead of writing it
    #[arg(long)]
    pub stdout: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_format_check() {
        let cli = Cli::try_parse_from(["reportdb", "format", "--schema", "db/schema.rdb", "--check"]).unwrap();
        match cli.command {
            Command::Format(args) => {
                assert!(args.check);
                assert_eq!(args.schema, Some(PathBuf::from("db/schema.rdb")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_generate_output() {
        let cli = Cli::try_parse_from(["reportdb", "generate", "-o", "out.rs"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Generate(GenerateArgs { output: Some(_), stdout: false, .. })
        ));
    }
}
