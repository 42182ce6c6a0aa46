//! `reportdb format` command - Rewrite the schema file in canonical layout.

use reportdb_schema::{
    Attribute, AttributeValue, ConfigEntry, Documentation, Model, Schema, validate_schema,
};

use crate::cli::FormatArgs;
use crate::config;
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

const INDENT: &str = "  ";

/// Run the format command
pub async fn run(args: FormatArgs) -> CliResult<()> {
    output::header("Format Schema");

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

    output::step(1, 3, "Reading schema...");
    let content = std::fs::read_to_string(&schema_path)?;
    let schema = validate_schema(&content)?;

    output::step(2, 3, "Formatting...");
    let formatted = format_schema(&schema);
    let changed = formatted != content;

    if args.check {
        output::newline();
        if changed {
            output::error("Schema is not formatted correctly!");
            output::info("Run `reportdb format` to fix formatting.");
            return Err(CliError::Format(format!(
                "{} needs formatting",
                schema_path.display()
            )));
        }
        success("Schema is already formatted!");
        return Ok(());
    }

    output::step(3, 3, "Writing formatted schema...");
    output::newline();
    if changed {
        std::fs::write(&schema_path, &formatted)?;
        success("Schema formatted successfully!");
    } else {
        success("Schema is already formatted!");
    }

    Ok(())
}

/// Render a schema in canonical layout.
///
/// Blocks are written datasources first, then generators, then models, each
/// separated by one blank line. Plain `//` comments are not part of the AST
/// and do not survive formatting.
pub fn format_schema(schema: &Schema) -> String {
    let mut blocks = Vec::new();

    for datasource in &schema.datasources {
        blocks.push(format_config_block(
            "datasource",
            datasource.name.as_str(),
            &datasource.entries,
        ));
    }
    for generator in &schema.generators {
        blocks.push(format_config_block(
            "generator",
            generator.name.as_str(),
            &generator.entries,
        ));
    }
    for model in schema.models.values() {
        blocks.push(format_model(model));
    }

    blocks.join("\n")
}

fn format_config_block(keyword: &str, name: &str, entries: &[ConfigEntry]) -> String {
    let mut out = format!("{} {} {{\n", keyword, name);
    let width = entries.iter().map(|e| e.key.as_str().len()).max().unwrap_or(0);

    for entry in entries {
        out.push_str(&format!(
            "{}{:width$} = {}\n",
            INDENT,
            entry.key.as_str(),
            format_value(&entry.value),
            width = width
        ));
    }

    out.push_str("}\n");
    out
}

fn format_model(model: &Model) -> String {
    let mut out = String::new();
    push_docs(&mut out, "", model.documentation.as_ref());
    out.push_str(&format!("model {} {{\n", model.name()));

    let rows: Vec<(String, String, String)> = model
        .fields
        .values()
        .map(|field| {
            let ty = format!("{}{}", field.field_type, field.modifier.suffix());
            let attrs = field
                .attributes
                .iter()
                .map(|attr| format_attribute("@", attr))
                .collect::<Vec<_>>()
                .join(" ");
            (field.name().to_string(), ty, attrs)
        })
        .collect();

    let name_width = rows.iter().map(|(n, _, _)| n.len()).max().unwrap_or(0);
    let type_width = rows.iter().map(|(_, t, _)| t.len()).max().unwrap_or(0);

    for (field, (name, ty, attrs)) in model.fields.values().zip(&rows) {
        push_docs(&mut out, INDENT, field.documentation.as_ref());
        let line = if attrs.is_empty() {
            format!("{}{:nw$} {}", INDENT, name, ty, nw = name_width)
        } else {
            format!(
                "{}{:nw$} {:tw$} {}",
                INDENT,
                name,
                ty,
                attrs,
                nw = name_width,
                tw = type_width
            )
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if !model.attributes.is_empty() {
        if !model.fields.is_empty() {
            out.push('\n');
        }
        for attr in &model.attributes {
            out.push_str(&format!("{}{}\n", INDENT, format_attribute("@@", attr)));
        }
    }

    out.push_str("}\n");
    out
}

fn push_docs(out: &mut String, indent: &str, doc: Option<&Documentation>) {
    let Some(doc) = doc else { return };
    for line in doc.text.lines() {
        if line.is_empty() {
            out.push_str(&format!("{}///\n", indent));
        } else {
            out.push_str(&format!("{}/// {}\n", indent, line));
        }
    }
}

fn format_attribute(prefix: &str, attr: &Attribute) -> String {
    if attr.args.is_empty() {
        return format!("{}{}", prefix, attr.name());
    }

    let args: Vec<String> = attr
        .args
        .iter()
        .map(|arg| match &arg.name {
            Some(name) => format!("{}: {}", name, format_value(&arg.value)),
            None => format_value(&arg.value),
        })
        .collect();
    format!("{}{}({})", prefix, attr.name(), args.join(", "))
}

/// Render a value so that it parses back to the same value.
fn format_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::String(s) => format!("\"{}\"", escape(s)),
        AttributeValue::Float(v) if v.fract() == 0.0 => format!("{:.1}", v),
        AttributeValue::Function(name, args) => {
            let args: Vec<String> = args.iter().map(format_value).collect();
            format!("{}({})", name, args.join(", "))
        }
        AttributeValue::Array(values) => {
            let values: Vec<String> = values.iter().map(format_value).collect();
            format!("[{}]", values.join(", "))
        }
        other => other.to_string(),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
