//! Validation schemas for create/update payloads ("body") and lookups
//! ("query").

use serde::Serialize;

use super::{BuildError, Identifier, SchemaNames, Target, id_schema_name, identifier, target};
use crate::ast::{Entity, Field};
use crate::ir::ModelGraph;
use crate::naming::{Names, Naming};
use crate::scalar::{ScalarType, ValidatorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationModel {
    pub names: Names,
    /// `userSchema`, validates create/update payloads.
    pub schema_name: String,
    /// `userQuerySchema`, validates find-one/delete lookups.
    pub query_schema_name: String,
    /// `userIdSchema`, referenced by other entities' relation fields.
    pub id_schema_name: String,
    pub identifier: Option<Identifier>,
    pub body: Vec<ValidatorField>,
    pub query: Vec<ValidatorField>,
    /// Other entities whose identifier validators this one references.
    pub imports: Vec<Import>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorField {
    pub name: String,
    pub validator: FieldValidator,
    pub optional: bool,
    /// Accepts a single value or a list of values (identifier only).
    pub accepts_many: bool,
    /// Set on foreign-key scalars: the model the key points at.
    pub foreign_key: Option<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldValidator {
    Scalar {
        scalar: ScalarType,
        kind: ValidatorKind,
        expr: &'static str,
    },
    /// Value of a declared enum, passed through as a string.
    Enum { name: String },
    /// Nested reference to the related entity's identifier validator.
    Relation {
        target: String,
        id_schema_name: String,
        multiple: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub target: String,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub entity: String,
    pub id_schema_name: String,
    pub file_stem: String,
}

pub fn build(
    graph: &ModelGraph,
    entity: &Entity,
    naming: &dyn Naming,
) -> Result<ValidationModel, BuildError> {
    let names = Names::new(naming, &entity.name);
    let identifier = identifier(entity);
    let id_name = identifier.as_ref().map(|i| i.field.as_str());

    let mut body = Vec::with_capacity(entity.fields.len());
    let mut imports: Vec<Import> = Vec::new();

    for field in &entity.fields {
        let is_id = Some(field.name.as_str()) == id_name;
        let validator = match field.scalar() {
            Some(scalar) => scalar_validator(scalar),
            None => match target(graph, entity, field)? {
                Target::Entity(related) => {
                    let id_schema = id_schema_name(naming, &related.name);
                    if related.name != entity.name
                        && !imports.iter().any(|i| i.entity == related.name)
                    {
                        imports.push(Import {
                            entity: related.name.clone(),
                            id_schema_name: id_schema.clone(),
                            file_stem: Names::new(naming, &related.name).file_stem,
                        });
                    }
                    FieldValidator::Relation {
                        target: related.name.clone(),
                        id_schema_name: id_schema,
                        multiple: field.is_list,
                    }
                }
                Target::Enum(name) => FieldValidator::Enum {
                    name: name.to_string(),
                },
            },
        };

        let foreign_key = if field.is_foreign_key() {
            graph.relation_of(field).map(|rel| ForeignKey {
                target: rel.target.clone(),
                references: rel.references.clone(),
            })
        } else {
            None
        };

        body.push(ValidatorField {
            name: field.name.clone(),
            validator,
            optional: is_id || body_optional(field),
            accepts_many: is_id,
            foreign_key,
        });
    }

    let query = body
        .iter()
        .filter(|f| Some(f.name.as_str()) == id_name)
        .map(|f| ValidatorField {
            optional: false,
            ..f.clone()
        })
        .collect();

    let schemas = SchemaNames::new(naming, &names);
    Ok(ValidationModel {
        schema_name: schemas.body,
        query_schema_name: schemas.query,
        id_schema_name: schemas.id,
        names,
        identifier,
        body,
        query,
        imports,
    })
}

fn scalar_validator(scalar: ScalarType) -> FieldValidator {
    FieldValidator::Scalar {
        scalar,
        kind: scalar.validator_kind(),
        expr: scalar.validator(),
    }
}

/// Whether a create/update payload may leave the field out.
fn body_optional(field: &Field) -> bool {
    !field.is_required
        || field.is_read_only
        || field.default.is_some()
        || (field.is_relation_field() && field.is_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::EnglishNaming;
    use crate::resolve::resolve_source;
    use pretty_assertions::assert_eq;

    const BLOG: &str = r#"
model User {
  id        Int      @id @default(autoincrement())
  email     String   @unique
  active    Boolean  @default(true)
  role      Role
  posts     Post[]
  createdAt DateTime @default(now())
}

enum Role {
  USER
}

model Post {
  id       Int     @id
  title    String
  body     String?
  meta     Json
  author   User    @relation(fields: [authorId], references: [id])
  authorId Int
}
"#;

    fn model(entity: &str) -> ValidationModel {
        let graph = resolve_source(BLOG).unwrap();
        build(&graph, graph.entity(entity).unwrap(), &EnglishNaming).unwrap()
    }

    fn field<'a>(model: &'a ValidationModel, name: &str) -> &'a ValidatorField {
        model.body.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn test_schema_names() {
        let m = model("User");
        assert_eq!(m.schema_name, "userSchema");
        assert_eq!(m.query_schema_name, "userQuerySchema");
        assert_eq!(m.id_schema_name, "userIdSchema");
    }

    #[test]
    fn test_identifier_body_and_query() {
        let m = model("Post");
        let body_id = field(&m, "id");
        assert!(body_id.optional);
        assert!(body_id.accepts_many);

        assert_eq!(m.query.len(), 1);
        assert_eq!(m.query[0].name, "id");
        assert!(!m.query[0].optional);
        assert!(m.query[0].accepts_many);
    }

    #[test]
    fn test_scalar_validators() {
        let m = model("Post");
        assert_eq!(
            field(&m, "id").validator,
            FieldValidator::Scalar {
                scalar: ScalarType::Int,
                kind: ValidatorKind::CoercedNumber,
                expr: "z.coerce.number()",
            }
        );
        assert!(matches!(
            field(&m, "meta").validator,
            FieldValidator::Scalar {
                kind: ValidatorKind::Opaque,
                ..
            }
        ));
        assert!(!field(&m, "title").optional);
        assert!(field(&m, "body").optional);
    }

    #[test]
    fn test_defaults_and_read_only_are_optional() {
        let m = model("User");
        assert!(field(&m, "active").optional);
        assert!(field(&m, "createdAt").optional);
        assert!(!field(&m, "email").optional);
    }

    #[test]
    fn test_relation_references_identifier_validator() {
        let m = model("User");
        assert_eq!(
            field(&m, "posts").validator,
            FieldValidator::Relation {
                target: "Post".into(),
                id_schema_name: "postIdSchema".into(),
                multiple: true,
            }
        );
        assert!(field(&m, "posts").optional);
        assert_eq!(m.imports.len(), 1);
        assert_eq!(m.imports[0].file_stem, "post");

        let m = model("Post");
        let author = field(&m, "author");
        assert!(!author.optional);
        assert!(matches!(
            author.validator,
            FieldValidator::Relation { multiple: false, .. }
        ));
    }

    #[test]
    fn test_foreign_key_reads_shared_relation() {
        let m = model("Post");
        assert_eq!(
            field(&m, "authorId").foreign_key,
            Some(ForeignKey {
                target: "User".into(),
                references: vec!["id".into()],
            })
        );
        assert_eq!(field(&m, "title").foreign_key, None);
    }

    #[test]
    fn test_enum_field_passes_through() {
        let m = model("User");
        assert_eq!(
            field(&m, "role").validator,
            FieldValidator::Enum { name: "Role".into() }
        );
    }

    #[test]
    fn test_dangling_relation() {
        let graph = resolve_source("model A {\n  id Int @id\n  ghost Ghost\n}\n").unwrap();
        let err = build(&graph, graph.entity("A").unwrap(), &EnglishNaming).unwrap_err();
        assert_eq!(
            err,
            BuildError::Reference {
                entity: "A".into(),
                field: "ghost".into(),
                target: "Ghost".into(),
            }
        );
    }

    #[test]
    fn test_without_identifier_query_is_empty() {
        let graph = resolve_source("model Log {\n  b B\n}\nmodel B {\n  id Int @id\n}\n").unwrap();
        let m = build(&graph, graph.entity("Log").unwrap(), &EnglishNaming).unwrap();
        assert!(m.identifier.is_none());
        assert!(m.query.is_empty());
    }
}
