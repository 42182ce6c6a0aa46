//! `reportdb validate` command - Validate the schema file.

use reportdb_schema::{Schema, validate_schema};

use crate::cli::ValidateArgs;
use crate::config;
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the validate command
pub async fn run(args: ValidateArgs) -> CliResult<()> {
    output::header("Validate Schema");

    let cwd = std::env::current_dir()?;
    let config = config::load(&cwd)?;
    let schema_path = config::schema_path(&cwd, args.schema, &config);

    if !schema_path.exists() {
        return Err(CliError::Config(format!(
            "Schema file not found: {}",
            schema_path.display()
        )));
    }

    output::kv("Schema", &schema_path.display().to_string());
    output::newline();

    output::step(1, 2, "Parsing and validating schema...");
    let content = std::fs::read_to_string(&schema_path)?;
    let schema = validate_schema(&content)?;

    output::step(2, 2, "Checking datasource...");
    let warnings = check_datasource(&schema);

    output::newline();
    if warnings.is_empty() {
        success("Schema is valid!");
    } else {
        success("Schema is valid with warnings:");
        output::newline();
        for warning in &warnings {
            output::warn(warning);
        }
    }

    output::newline();
    let stats = schema.stats();
    output::section("Schema Summary");
    output::kv("Models", &stats.model_count.to_string());
    output::kv("Total Fields", &stats.field_count.to_string());
    output::kv("Relations", &stats.relation_count.to_string());

    Ok(())
}

/// Non-fatal datasource issues.
fn check_datasource(schema: &Schema) -> Vec<String> {
    let Some(datasource) = schema.datasource() else {
        return vec!["No datasource block; the client assumes PostgreSQL".to_string()];
    };

    let mut warnings = Vec::new();
    if datasource.url().is_none() {
        warnings.push(format!("Datasource '{}' has no url", datasource.name));
    }
    warnings
}
