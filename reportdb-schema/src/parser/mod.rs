//! Schema parser for `.rdb` files.

mod grammar;

use std::path::Path;

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use smol_str::SmolStr;
use tracing::debug;

use crate::ast::*;
use crate::error::{SchemaError, SchemaResult};

pub use grammar::{Rule, SchemaParser};

/// Parse a schema from a string.
pub fn parse_schema(input: &str) -> SchemaResult<Schema> {
    let mut pairs = SchemaParser::parse(Rule::schema, input).map_err(|e| {
        let (offset, len) = match e.location {
            pest::error::InputLocation::Pos(pos) => (pos, 0),
            pest::error::InputLocation::Span((start, end)) => (start, end - start),
        };
        SchemaError::syntax(input, offset, len, e.variant.message().to_string())
    })?;

    let ctx = Context { src: input };
    let schema_pair = ctx.expect(&mut pairs, "schema", Span::new(0, input.len()))?;

    let mut schema = Schema::new();
    let mut current_doc: Option<Documentation> = None;

    for pair in schema_pair.into_inner() {
        match pair.as_rule() {
            Rule::documentation => current_doc = Some(parse_documentation(pair)),
            Rule::model_def => {
                let mut model = ctx.parse_model(pair)?;
                if let Some(doc) = current_doc.take() {
                    model = model.with_documentation(doc);
                }
                schema.add_model(model);
            }
            Rule::datasource_def => {
                let (name, entries, span) = ctx.parse_block(pair)?;
                let mut ds = Datasource::new(name, span);
                ds.entries = entries;
                current_doc = None;
                schema.datasources.push(ds);
            }
            Rule::generator_def => {
                let (name, entries, span) = ctx.parse_block(pair)?;
                let mut generator = Generator::new(name, span);
                generator.entries = entries;
                current_doc = None;
                schema.generators.push(generator);
            }
            _ => {}
        }
    }

    debug!(models = schema.models.len(), "parsed schema");
    Ok(schema)
}

/// Parse a schema from a file.
pub fn parse_schema_file(path: impl AsRef<Path>) -> SchemaResult<Schema> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_schema(&content)
}

/// Parse state shared by the helpers: the source, for error reporting.
struct Context<'s> {
    src: &'s str,
}

impl<'s> Context<'s> {
    fn error(&self, span: Span, message: impl Into<String>) -> SchemaError {
        SchemaError::syntax(self.src, span.start, span.len(), message)
    }

    /// Take the next pair or report what was expected.
    fn expect<'i>(
        &self,
        pairs: &mut Pairs<'i, Rule>,
        what: &str,
        parent: Span,
    ) -> SchemaResult<Pair<'i, Rule>> {
        pairs
            .next()
            .ok_or_else(|| self.error(parent, format!("expected {}", what)))
    }

    fn ident(&self, pairs: &mut Pairs<'_, Rule>, parent: Span) -> SchemaResult<Ident> {
        let pair = self.expect(pairs, "identifier", parent)?;
        Ok(Ident::new(pair.as_str(), pair.as_span().into()))
    }

    fn parse_block(
        &self,
        pair: Pair<'_, Rule>,
    ) -> SchemaResult<(Ident, Vec<ConfigEntry>, Span)> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let name = self.ident(&mut inner, span)?;

        let mut entries = Vec::new();
        for entry in inner.filter(|p| p.as_rule() == Rule::config_entry) {
            let entry_span: Span = entry.as_span().into();
            let mut parts = entry.into_inner();
            let key = self.ident(&mut parts, entry_span)?;
            let value = self.parse_value(self.expect(&mut parts, "value", entry_span)?)?;
            entries.push(ConfigEntry {
                key,
                value,
                span: entry_span,
            });
        }

        Ok((name, entries, span))
    }

    fn parse_model(&self, pair: Pair<'_, Rule>) -> SchemaResult<Model> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let name = self.ident(&mut inner, span)?;
        let mut model = Model::new(name, span);

        for item in inner.filter(|p| p.as_rule() == Rule::model_body_item) {
            let mut doc = None;
            for part in item.into_inner() {
                match part.as_rule() {
                    Rule::documentation => doc = Some(parse_documentation(part)),
                    Rule::field_def => {
                        let mut field = self.parse_field(part)?;
                        if let Some(doc) = doc.take() {
                            field = field.with_documentation(doc);
                        }
                        model.add_field(field);
                    }
                    Rule::model_attribute => {
                        model.attributes.push(self.parse_attribute(part)?);
                    }
                    _ => {}
                }
            }
        }

        Ok(model)
    }

    fn parse_field(&self, pair: Pair<'_, Rule>) -> SchemaResult<Field> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let name = self.ident(&mut inner, span)?;

        let type_pair = self.expect(&mut inner, "field type", span)?;
        let type_span: Span = type_pair.as_span().into();
        let mut type_parts = type_pair.into_inner();
        let type_name = self.expect(&mut type_parts, "type name", type_span)?;
        let modifier = match type_parts.next().map(|p| p.as_rule()) {
            Some(Rule::list_marker) => TypeModifier::List,
            Some(Rule::optional_marker) => TypeModifier::Optional,
            _ => TypeModifier::Required,
        };

        let attributes = inner
            .filter(|p| p.as_rule() == Rule::field_attribute)
            .map(|p| self.parse_attribute(p))
            .collect::<SchemaResult<Vec<_>>>()?;

        Ok(Field::new(
            name,
            FieldType::from_name(type_name.as_str()),
            modifier,
            attributes,
            span,
        ))
    }

    /// Parse a `@field` or `@@model` attribute.
    fn parse_attribute(&self, pair: Pair<'_, Rule>) -> SchemaResult<Attribute> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let name = self.ident(&mut inner, span)?;

        let mut args = Vec::new();
        if let Some(arg_list) = inner.next() {
            for arg in arg_list.into_inner() {
                let arg_span: Span = arg.as_span().into();
                let mut parts = arg.into_inner();
                let first = self.expect(&mut parts, "attribute argument", arg_span)?;
                if first.as_rule() == Rule::arg_name {
                    let arg_name = Ident::new(first.as_str(), first.as_span().into());
                    let value = self.parse_value(self.expect(&mut parts, "value", arg_span)?)?;
                    args.push(AttributeArg::named(arg_name, value, arg_span));
                } else {
                    args.push(AttributeArg::positional(self.parse_value(first)?, arg_span));
                }
            }
        }

        Ok(Attribute::new(name, args, span))
    }

    fn parse_value(&self, pair: Pair<'_, Rule>) -> SchemaResult<AttributeValue> {
        let span: Span = pair.as_span().into();
        match pair.as_rule() {
            Rule::string_literal => Ok(AttributeValue::String(unescape(pair.as_str()))),
            Rule::number_literal => {
                let text = pair.as_str();
                if text.contains('.') {
                    text.parse()
                        .map(AttributeValue::Float)
                        .map_err(|_| self.error(span, "invalid float literal"))
                } else {
                    text.parse()
                        .map(AttributeValue::Int)
                        .map_err(|_| self.error(span, "integer literal out of range"))
                }
            }
            Rule::boolean_literal => Ok(AttributeValue::Boolean(pair.as_str() == "true")),
            Rule::identifier => Ok(AttributeValue::Ident(SmolStr::new(pair.as_str()))),
            Rule::field_ref_list => Ok(AttributeValue::FieldRefList(
                pair.into_inner().map(|p| SmolStr::new(p.as_str())).collect(),
            )),
            Rule::array_literal => Ok(AttributeValue::Array(
                pair.into_inner()
                    .map(|p| self.parse_value(p))
                    .collect::<SchemaResult<_>>()?,
            )),
            Rule::function_call => {
                let mut inner = pair.into_inner();
                let name = self.ident(&mut inner, span)?;
                let args = inner
                    .map(|p| self.parse_value(p))
                    .collect::<SchemaResult<_>>()?;
                Ok(AttributeValue::Function(name.name, args))
            }
            other => Err(self.error(span, format!("unexpected {:?}", other))),
        }
    }
}

fn parse_documentation(pair: Pair<'_, Rule>) -> Documentation {
    let span: Span = pair.as_span().into();
    let text = pair
        .into_inner()
        .map(|p| p.as_str().trim_start_matches("///").trim())
        .collect::<Vec<_>>()
        .join("\n");
    Documentation::new(text, span)
}

/// Strip the quotes from a string literal and resolve escapes.
fn unescape(literal: &str) -> String {
    let body = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
