//! `reportdb generate` command - Generate the Rust client from the schema.

use std::path::PathBuf;
use std::time::Instant;

use reportdb_schema::{ReportDbConfig, Schema, validate_schema};

use crate::cli::GenerateArgs;
use crate::config;
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the generate command
pub async fn run(args: GenerateArgs) -> CliResult<()> {
    let start = Instant::now();
    let cwd = std::env::current_dir()?;
    let config = config::load(&cwd)?;
    let schema_path = config::schema_path(&cwd, args.schema.clone(), &config);

    if !schema_path.exists() {
        return Err(CliError::Config(format!(
            "Schema file not found: {}",
            schema_path.display()
        )));
    }

    let content = std::fs::read_to_string(&schema_path)?;
    let schema = validate_schema(&content)?;
    let source = render(&schema, &config)?;

    // Nothing else goes to stdout so the output can be redirected.
    if args.stdout {
        print!("{}", source);
        return Ok(());
    }

    output::header("Generate Client");
    let output_path = args
        .output
        .unwrap_or_else(|| cwd.join(PathBuf::from(&config.generator.output)));

    output::kv("Schema", &schema_path.display().to_string());
    output::kv("Output", &output_path.display().to_string());
    output::newline();

    output::step(1, 2, "Generating code...");
    output::step(2, 2, "Writing file...");
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, &source)?;

    output::newline();
    output::section("Models");
    for name in schema.models.keys() {
        output::list_item(name);
    }

    output::newline();
    success(&format!(
        "Generated client for {} models in {:.2}s",
        schema.models.len(),
        start.elapsed().as_secs_f64()
    ));

    Ok(())
}

/// Generate the client source, pretty-printed unless disabled in config.
fn render(schema: &Schema, config: &ReportDbConfig) -> CliResult<String> {
    let result = if config.generator.format {
        reportdb_codegen::generate_source(schema)
    } else {
        reportdb_codegen::generate(schema).map(|tokens| tokens.to_string())
    };
    result.map_err(|e| CliError::Codegen(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        model TezosWallet {
            id      String @id @default(uuid())
            address String @unique
        }
    "#;

    #[test]
    fn test_render_formatted() {
        let schema = validate_schema(SCHEMA).unwrap();
        let source = render(&schema, &ReportDbConfig::default()).unwrap();
        assert!(source.contains("pub mod tezos_wallet {"));
        assert!(source.lines().count() > 10);
    }

    #[test]
    fn test_render_unformatted() {
        let schema = validate_schema(SCHEMA).unwrap();
        let mut config = ReportDbConfig::default();
        config.generator.format = false;

        let source = render(&schema, &config).unwrap();
        let formatted = render(&schema, &ReportDbConfig::default()).unwrap();
        assert!(source.contains("pub mod tezos_wallet"));
        assert!(source.lines().count() < formatted.lines().count());
    }
}
