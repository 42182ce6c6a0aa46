//! Schema validation and semantic analysis.
//!
//! This module validates parsed schemas for semantic correctness:
//! - No duplicate definitions
//! - Every model can identify a single record
//! - Type references and attributes are valid
//! - Relations are properly defined on both sides
//!
//! All problems are collected and reported together.

use tracing::debug;

use crate::ast::*;
use crate::error::{SchemaError, SchemaResult};

const FIELD_ATTRIBUTES: &[&str] = &["id", "unique", "default", "updatedAt", "map", "relation"];
const MODEL_ATTRIBUTES: &[&str] = &["id", "unique", "index", "map"];

/// Schema validator for semantic analysis.
#[derive(Debug)]
pub struct Validator {
    /// Collected validation errors.
    errors: Vec<SchemaError>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Validate a schema and return the validated schema or errors.
    pub fn validate(&mut self, mut schema: Schema) -> SchemaResult<Schema> {
        self.errors.clear();

        self.check_duplicates(&schema);
        self.check_datasources(&schema);

        for model in schema.models.values() {
            self.validate_model(model, &schema);
        }

        let relations = self.resolve_relations(&schema);
        schema.relations = relations;

        if self.errors.is_empty() {
            debug!(
                models = schema.models.len(),
                relations = schema.relations.len(),
                "schema validated"
            );
            Ok(schema)
        } else {
            Err(SchemaError::ValidationFailed {
                count: self.errors.len(),
                errors: std::mem::take(&mut self.errors),
            })
        }
    }

    /// Check for duplicate model and field names.
    fn check_duplicates(&mut self, schema: &Schema) {
        for name in &schema.duplicate_models {
            self.errors
                .push(SchemaError::duplicate("model", name.as_str()));
        }
        for model in schema.models.values() {
            for field in &model.duplicate_fields {
                self.errors.push(SchemaError::duplicate(
                    "field",
                    format!("{}.{}", model.name(), field),
                ));
            }
        }
    }

    /// Only PostgreSQL datasources are supported.
    fn check_datasources(&mut self, schema: &Schema) {
        for ds in &schema.datasources {
            match ds.provider_name() {
                None => self.errors.push(SchemaError::config(format!(
                    "datasource `{}` is missing `provider`",
                    ds.name
                ))),
                Some(name) if ds.provider().is_none() => {
                    self.errors.push(SchemaError::config(format!(
                        "datasource `{}` uses unsupported provider `{}`",
                        ds.name, name
                    )))
                }
                Some(_) => {}
            }
        }
    }

    /// Validate a model definition.
    fn validate_model(&mut self, model: &Model, schema: &Schema) {
        if model.unique_criteria().is_empty() {
            self.errors.push(SchemaError::MissingIdentifier {
                model: model.name().to_string(),
            });
        }

        for field in model.fields.values() {
            self.validate_field(field, model.name(), schema);
        }

        for attr in &model.attributes {
            self.validate_model_attribute(attr, model);
        }
    }

    /// Validate a field definition.
    fn validate_field(&mut self, field: &Field, model_name: &str, schema: &Schema) {
        let target = format!("{}.{}", model_name, field.name());

        match &field.field_type {
            FieldType::Model(name) => {
                if !schema.models.contains_key(name.as_str()) {
                    self.errors.push(SchemaError::unknown_type(
                        model_name,
                        field.name(),
                        name.as_str(),
                    ));
                }
            }
            FieldType::Scalar(_) => {
                if field.is_list() {
                    self.errors.push(SchemaError::invalid_field(
                        model_name,
                        field.name(),
                        "list types are only supported on relation fields",
                    ));
                }
            }
        }

        for attr in &field.attributes {
            let name = attr.name();
            if !FIELD_ATTRIBUTES.contains(&name) && !name.starts_with("db.") {
                self.errors.push(SchemaError::invalid_attribute(
                    name,
                    &target,
                    "unknown field attribute",
                ));
                continue;
            }
            if field.is_relation() && name != "relation" {
                self.errors.push(SchemaError::invalid_attribute(
                    name,
                    &target,
                    "cannot be applied to a relation field",
                ));
                continue;
            }
            self.validate_field_attribute(attr, field, &target);
        }
    }

    /// Validate a field attribute on a scalar field.
    fn validate_field_attribute(&mut self, attr: &Attribute, field: &Field, target: &str) {
        match attr.name() {
            "id" => {
                if field.is_optional() {
                    self.errors.push(SchemaError::invalid_attribute(
                        "id",
                        target,
                        "an identifier field cannot be optional",
                    ));
                }
            }
            "default" => match attr.first_arg() {
                Some(value) => self.validate_default_value(value, field, target),
                None => self.errors.push(SchemaError::invalid_attribute(
                    "default",
                    target,
                    "expects a value",
                )),
            },
            "updatedAt" => {
                if field.scalar_type() != Some(ScalarType::DateTime) {
                    self.errors.push(SchemaError::invalid_attribute(
                        "updatedAt",
                        target,
                        "can only be applied to DateTime fields",
                    ));
                }
            }
            "map" => {
                if attr.first_arg().and_then(AttributeValue::as_string).is_none() {
                    self.errors.push(SchemaError::invalid_attribute(
                        "map",
                        target,
                        "expects a column name string",
                    ));
                }
            }
            "relation" => {
                if !field.is_relation() {
                    self.errors.push(SchemaError::invalid_attribute(
                        "relation",
                        target,
                        "can only be applied to model reference fields",
                    ));
                }
            }
            _ => {}
        }
    }

    /// Validate a `@default` expression against the field type.
    fn validate_default_value(&mut self, value: &AttributeValue, field: &Field, target: &str) {
        let Some(scalar) = field.scalar_type() else {
            return;
        };

        let problem = match (DefaultValue::from_value(value), scalar) {
            (DefaultValue::Unknown(name), _) => Some(format!(
                "unknown default function `{}()`; expected autoincrement(), now() or uuid()",
                name
            )),
            (DefaultValue::Autoincrement, ScalarType::Int | ScalarType::BigInt) => None,
            (DefaultValue::Autoincrement, _) => {
                Some("autoincrement() can only be used on Int or BigInt fields".to_string())
            }
            (DefaultValue::Now, ScalarType::DateTime) => None,
            (DefaultValue::Now, _) => Some("now() can only be used on DateTime fields".to_string()),
            (DefaultValue::Uuid, ScalarType::String) => None,
            (DefaultValue::Uuid, _) => Some("uuid() can only be used on String fields".to_string()),
            (DefaultValue::Literal(literal), scalar) => {
                let matches = matches!(
                    (&literal, scalar),
                    (AttributeValue::Int(_), ScalarType::Int | ScalarType::BigInt | ScalarType::Float)
                        | (AttributeValue::Float(_), ScalarType::Float)
                        | (AttributeValue::String(_), ScalarType::String | ScalarType::Json)
                        | (AttributeValue::Boolean(_), ScalarType::Boolean)
                );
                (!matches).then(|| {
                    format!(
                        "default value `{}` does not match field type `{}`",
                        literal, scalar
                    )
                })
            }
        };

        if let Some(message) = problem {
            self.errors
                .push(SchemaError::invalid_attribute("default", target, message));
        }
    }

    /// Validate a model-level attribute.
    fn validate_model_attribute(&mut self, attr: &Attribute, model: &Model) {
        let name = attr.name();
        if !MODEL_ATTRIBUTES.contains(&name) {
            self.errors.push(SchemaError::invalid_attribute(
                format!("@{}", name),
                model.name(),
                "unknown model attribute",
            ));
            return;
        }

        if name == "map" {
            if attr.first_arg().and_then(AttributeValue::as_string).is_none() {
                self.errors.push(SchemaError::invalid_attribute(
                    "@map",
                    model.name(),
                    "expects a table name string",
                ));
            }
            return;
        }

        let Some(fields) = attr.field_list() else {
            self.errors.push(SchemaError::invalid_attribute(
                format!("@{}", name),
                model.name(),
                "expects a list of fields",
            ));
            return;
        };

        if fields.is_empty() {
            self.errors.push(SchemaError::invalid_attribute(
                format!("@{}", name),
                model.name(),
                "field list cannot be empty",
            ));
        }

        for field_name in fields {
            match model.get_field(field_name) {
                None => self.errors.push(SchemaError::invalid_model(
                    model.name(),
                    format!("@@{} references non-existent field `{}`", name, field_name),
                )),
                Some(field) if field.is_relation() => {
                    self.errors.push(SchemaError::invalid_model(
                        model.name(),
                        format!(
                            "@@{} references relation field `{}`; use its scalar foreign key",
                            name, field_name
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
    }

    /// Pair up relation fields and check the owning side's join columns.
    fn resolve_relations(&mut self, schema: &Schema) -> Vec<Relation> {
        let mut relations = Vec::new();

        for model in schema.models.values() {
            for field in model.relation_fields() {
                let FieldType::Model(target_name) = &field.field_type else {
                    continue;
                };
                let Some(target) = schema.get_model(target_name) else {
                    // reported as an unknown type
                    continue;
                };
                if let Some(relation) = self.resolve_field(model, field, target) {
                    relations.push(relation);
                }
            }
        }

        relations
    }

    fn resolve_field(&mut self, model: &Model, field: &Field, target: &Model) -> Option<Relation> {
        let attrs = field.extract_attributes().relation.unwrap_or_default();
        let relation_name = attrs.name.clone();

        let candidates: Vec<&Field> = target
            .relation_fields()
            .into_iter()
            .filter(|f| f.field_type.type_name() == model.name())
            .filter(|f| !(target.name() == model.name() && f.name() == field.name()))
            .filter(|f| {
                f.extract_attributes()
                    .relation
                    .and_then(|r| r.name)
                    == relation_name
            })
            .collect();

        let back = match candidates.as_slice() {
            [single] => *single,
            [] => {
                self.errors.push(SchemaError::invalid_relation(
                    model.name(),
                    field.name(),
                    format!(
                        "missing opposite relation field on model `{}`",
                        target.name()
                    ),
                ));
                return None;
            }
            _ => {
                self.errors.push(SchemaError::invalid_relation(
                    model.name(),
                    field.name(),
                    format!(
                        "ambiguous relation to `{}`; give both sides the same @relation(\"name\")",
                        target.name()
                    ),
                ));
                return None;
            }
        };
        let back_attrs = back.extract_attributes().relation.unwrap_or_default();

        if attrs.is_owning() {
            if field.is_list() {
                self.errors.push(SchemaError::invalid_relation(
                    model.name(),
                    field.name(),
                    "a list field cannot hold foreign keys",
                ));
                return None;
            }
            if back_attrs.is_owning() {
                self.errors.push(SchemaError::invalid_relation(
                    model.name(),
                    field.name(),
                    "only one side of a relation may declare `fields` and `references`",
                ));
                return None;
            }
            if !self.check_join(model, field, target, &attrs) {
                return None;
            }

            let relation_type = if model.is_unique_criterion(&attrs.fields) {
                RelationType::OneToOne
            } else {
                RelationType::ManyToOne
            };
            let mut relation = Relation::new(model.name(), field.name(), target.name(), relation_type)
                .with_join(attrs.fields.clone(), attrs.references.clone())
                .with_to_field(back.name())
                .owning()
                .optional(field.is_optional())
                .with_on_delete(attrs.on_delete)
                .with_on_update(attrs.on_update);
            if let Some(name) = &attrs.name {
                relation = relation.with_name(name.as_str());
            }
            return Some(relation);
        }

        if !back_attrs.is_owning() {
            // Report once per pair, on the side declared first.
            let first = field.is_list()
                || (!back.is_list() && (model.name(), field.name()) < (target.name(), back.name()));
            if first {
                self.errors.push(SchemaError::invalid_relation(
                    model.name(),
                    field.name(),
                    format!(
                        "neither side of the relation to `{}` declares `fields` and `references`",
                        target.name()
                    ),
                ));
            }
            return None;
        }

        // Join columns are validated on the owning side.
        if !valid_join_shape(&back_attrs) {
            return None;
        }

        let relation_type = if field.is_list() {
            RelationType::OneToMany
        } else {
            RelationType::OneToOne
        };
        let mut relation = Relation::new(model.name(), field.name(), target.name(), relation_type)
            .with_join(back_attrs.references.clone(), back_attrs.fields.clone())
            .with_to_field(back.name())
            .optional(field.is_optional() || field.is_list())
            .with_on_delete(back_attrs.on_delete)
            .with_on_update(back_attrs.on_update);
        if let Some(name) = &back_attrs.name {
            relation = relation.with_name(name.as_str());
        }
        Some(relation)
    }

    /// Check the owning side's `fields` and `references`.
    fn check_join(
        &mut self,
        model: &Model,
        field: &Field,
        target: &Model,
        attrs: &RelationAttribute,
    ) -> bool {
        let before = self.errors.len();
        let fail = |errors: &mut Vec<SchemaError>, message: String| {
            errors.push(SchemaError::invalid_relation(
                model.name(),
                field.name(),
                message,
            ));
        };

        if attrs.references.is_empty() {
            fail(&mut self.errors, "`fields` requires matching `references`".to_string());
        } else if attrs.fields.len() != attrs.references.len() {
            fail(
                &mut self.errors,
                format!(
                    "`fields` has {} entries but `references` has {}",
                    attrs.fields.len(),
                    attrs.references.len()
                ),
            );
        }

        for name in &attrs.fields {
            match model.get_field(name) {
                Some(f) if !f.is_relation() => {
                    if f.is_optional() != field.is_optional() {
                        fail(
                            &mut self.errors,
                            format!(
                                "foreign key `{}` must be {} like the relation field",
                                name,
                                if field.is_optional() { "optional" } else { "required" }
                            ),
                        );
                    }
                }
                Some(_) => fail(
                    &mut self.errors,
                    format!("foreign key `{}` must be a scalar field", name),
                ),
                None => fail(
                    &mut self.errors,
                    format!("foreign key field `{}` does not exist", name),
                ),
            }
        }

        let mut references_exist = true;
        for name in &attrs.references {
            match target.get_field(name) {
                Some(f) if !f.is_relation() => {}
                _ => {
                    references_exist = false;
                    fail(
                        &mut self.errors,
                        format!(
                            "referenced field `{}.{}` does not exist or is not a scalar",
                            target.name(),
                            name
                        ),
                    );
                }
            }
        }

        if references_exist
            && !attrs.references.is_empty()
            && !target.is_unique_criterion(&attrs.references)
        {
            fail(
                &mut self.errors,
                format!(
                    "references [{}] must be the id or a unique criterion of `{}`",
                    attrs.references.join(", "),
                    target.name()
                ),
            );
        }

        self.errors.len() == before
    }
}

fn valid_join_shape(attrs: &RelationAttribute) -> bool {
    !attrs.references.is_empty() && attrs.fields.len() == attrs.references.len()
}

/// Validate a schema string and return the validated schema.
pub fn validate_schema(input: &str) -> SchemaResult<Schema> {
    let schema = crate::parser::parse_schema(input)?;
    let mut validator = Validator::new();
    validator.validate(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use smol_str::SmolStr;

    fn errors_of(input: &str) -> Vec<String> {
        match validate_schema(input) {
            Ok(_) => vec![],
            Err(e) => e.flatten().iter().map(|e| e.to_string()).collect(),
        }
    }

    fn assert_error(input: &str, needle: &str) {
        let errors = errors_of(input);
        assert!(
            errors.iter().any(|e| e.contains(needle)),
            "expected an error containing {:?}, got {:?}",
            needle,
            errors
        );
    }

    const TWITTER: &str = r#"
        model TwitterUser {
            id                  String              @id @default(uuid())
            handle              String
            tweets              Tweet[]
            latestTweetsQueries LatestTweetsQuery[]
        }

        model LatestTweetsQuery {
            cursor        String
            twitterUserId String
            twitterUser   TwitterUser @relation(fields: [twitterUserId], references: [id])
            tweets        Tweet[]

            @@unique([cursor, twitterUserId])
        }

        model Tweet {
            id                      String            @id @default(uuid())
            tweetId                 String            @unique
            twitterUserId           String
            twitterUser             TwitterUser       @relation(fields: [twitterUserId], references: [id])
            latestTweetsQueryCursor String
            latestTweetsQuery       LatestTweetsQuery @relation(fields: [latestTweetsQueryCursor, twitterUserId], references: [cursor, twitterUserId])
            likeCount               Int               @default(0)
        }
    "#;

    // ==========================================================================
    // Valid schemas
    // ==========================================================================

    #[test]
    fn test_validate_resolves_both_sides() {
        let schema = validate_schema(TWITTER).unwrap();
        assert_eq!(schema.models.len(), 3);
        // Every relation field produces one record.
        assert_eq!(schema.relations.len(), 6);

        let owner = schema.relation_for_field("Tweet", "latestTweetsQuery").unwrap();
        assert!(owner.is_owner);
        assert!(owner.is_composite());
        assert_eq!(owner.relation_type, RelationType::ManyToOne);
        assert_eq!(owner.to_field.as_deref(), Some("tweets"));

        let back = schema.relation_for_field("LatestTweetsQuery", "tweets").unwrap();
        assert!(!back.is_owner);
        assert_eq!(back.relation_type, RelationType::OneToMany);
        assert_eq!(
            back.from_fields,
            vec![SmolStr::new("cursor"), SmolStr::new("twitterUserId")]
        );
        assert_eq!(
            back.to_fields,
            vec![
                SmolStr::new("latestTweetsQueryCursor"),
                SmolStr::new("twitterUserId")
            ]
        );
    }

    #[test]
    fn test_validate_one_to_one_from_unique_foreign_key() {
        let schema = validate_schema(
            r#"
            model User {
                id      String   @id
                profile Profile?
            }

            model Profile {
                id     String @id
                userId String @unique
                user   User   @relation(fields: [userId], references: [id])
            }
        "#,
        )
        .unwrap();

        assert_eq!(
            schema.relation_for_field("Profile", "user").unwrap().relation_type,
            RelationType::OneToOne
        );
        assert_eq!(
            schema.relation_for_field("User", "profile").unwrap().relation_type,
            RelationType::OneToOne
        );
    }

    #[test]
    fn test_validate_named_relations_disambiguate() {
        let schema = validate_schema(
            r#"
            model User {
                id      String    @id
                written Message[] @relation("author")
                read    Message[] @relation("reader")
            }

            model Message {
                id       String @id
                authorId String
                readerId String
                author   User   @relation("author", fields: [authorId], references: [id])
                reader   User   @relation("reader", fields: [readerId], references: [id])
            }
        "#,
        )
        .unwrap();

        let written = schema.relation_for_field("User", "written").unwrap();
        assert_eq!(written.to_field.as_deref(), Some("author"));
        assert_eq!(written.name.as_deref(), Some("author"));
    }

    #[test]
    fn test_validate_unique_only_identifier() {
        assert!(
            validate_schema(
                r#"
                model VerificationToken {
                    identifier String
                    token      String   @unique
                    expires    DateTime

                    @@unique([identifier, token])
                }
            "#
            )
            .is_ok()
        );
    }

    // ==========================================================================
    // Model rules
    // ==========================================================================

    #[test]
    fn test_validate_duplicate_model_names() {
        assert_error(
            r#"
            model User {
                id String @id
            }

            model User {
                id String @id
            }
        "#,
            "duplicate model `User`",
        );
    }

    #[test]
    fn test_validate_duplicate_field_names() {
        assert_error(
            r#"
            model User {
                id    String @id
                email String
                email String?
            }
        "#,
            "duplicate field `User.email`",
        );
    }

    #[test]
    fn test_validate_model_without_identifier() {
        assert_error(
            r#"
            model Loose {
                value Int
            }
        "#,
            "has no unique identifier",
        );
    }

    #[test]
    fn test_validate_index_with_invalid_field() {
        assert_error(
            r#"
            model User {
                id    String @id
                email String

                @@index([nonexistent])
            }
        "#,
            "non-existent field `nonexistent`",
        );
    }

    #[test]
    fn test_validate_datasource_provider() {
        assert_error(
            r#"
            datasource db {
                provider = "mysql"
                url      = env("DATABASE_URL")
            }
        "#,
            "unsupported provider `mysql`",
        );
    }

    #[test]
    fn test_validate_unknown_model_attribute() {
        assert_error(
            r#"
            model User {
                id String @id

                @@search([id])
            }
        "#,
            "unknown model attribute",
        );
    }

    // ==========================================================================
    // Field rules
    // ==========================================================================

    #[test]
    fn test_validate_unknown_type_reference() {
        assert_error(
            r#"
            model Post {
                id     String @id
                amount Decimal
            }
        "#,
            "unknown type `Decimal`",
        );
    }

    #[test]
    fn test_validate_scalar_list() {
        assert_error(
            r#"
            model Post {
                id   String   @id
                tags String[]
            }
        "#,
            "list types are only supported on relation fields",
        );
    }

    #[test]
    fn test_validate_autoincrement_on_string() {
        assert_error(
            r#"
            model Post {
                id String @id @default(autoincrement())
            }
        "#,
            "autoincrement() can only be used on Int or BigInt fields",
        );
    }

    #[test]
    fn test_validate_unknown_default_function() {
        assert_error(
            r#"
            model Post {
                id String @id @default(cuid())
            }
        "#,
            "unknown default function `cuid()`",
        );
    }

    #[test]
    fn test_validate_literal_default_mismatch() {
        assert_error(
            r#"
            model Tweet {
                id        String @id
                likeCount Int    @default("many")
            }
        "#,
            "does not match field type `Int`",
        );
    }

    #[test]
    fn test_validate_updated_at_on_non_datetime() {
        assert_error(
            r#"
            model Post {
                id   String @id
                name String @updatedAt
            }
        "#,
            "can only be applied to DateTime fields",
        );
    }

    #[test]
    fn test_validate_optional_id() {
        assert_error(
            r#"
            model Post {
                id String? @id
            }
        "#,
            "cannot be optional",
        );
    }

    // ==========================================================================
    // Relation rules
    // ==========================================================================

    #[test]
    fn test_validate_missing_back_relation() {
        assert_error(
            r#"
            model User {
                id String @id
            }

            model Post {
                id          String @id
                createdById String
                createdBy   User   @relation(fields: [createdById], references: [id])
            }
        "#,
            "missing opposite relation field on model `User`",
        );
    }

    #[test]
    fn test_validate_relation_length_mismatch() {
        assert_error(
            &TWITTER.replace(
                "references: [cursor, twitterUserId]",
                "references: [cursor]",
            ),
            "`fields` has 2 entries but `references` has 1",
        );
    }

    #[test]
    fn test_validate_references_must_be_unique() {
        assert_error(
            &TWITTER.replace(
                "references: [cursor, twitterUserId]",
                "references: [twitterUserId, cursor]",
            ),
            "must be the id or a unique criterion of `LatestTweetsQuery`",
        );
    }

    #[test]
    fn test_validate_missing_foreign_key_field() {
        assert_error(
            &TWITTER.replace(
                "fields: [latestTweetsQueryCursor, twitterUserId]",
                "fields: [queryCursor, twitterUserId]",
            ),
            "foreign key field `queryCursor` does not exist",
        );
    }

    #[test]
    fn test_validate_relation_without_fields() {
        let errors = errors_of(
            r#"
            model User {
                id    String @id
                posts Post[]
            }

            model Post {
                id        String @id
                createdBy User
            }
        "#,
        );
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("neither side"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let err = validate_schema(
            r#"
            model A {
                value Int
            }

            model B {
                id   String @id
                kind Kind
            }
        "#,
        )
        .unwrap_err();

        match err {
            SchemaError::ValidationFailed { count, errors } => {
                assert_eq!(count, 2);
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }
}
