//! Relation resolver.
//!
//! Binds each relation clause back onto the foreign-key scalar fields it
//! names, so both sides of a relation share one [`RelationInfo`] in the
//! arena. A single flat pass per entity; self and mutual references need no
//! special handling.

use std::collections::HashSet;

use crate::ast::{FieldRelation, RelationId, Schema};
use crate::ir::ModelGraph;
use crate::Error;
use crate::parser::{self, ParseOutcome};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("model `{entity}`: relation `{relation_field}` names unknown foreign key `{field}`")]
    UnknownForeignKey {
        entity: String,
        field: String,
        relation_field: String,
    },
    #[error("model `{entity}`: foreign key `{field}` of relation `{relation_field}` is not a scalar field")]
    ForeignKeyNotScalar {
        entity: String,
        field: String,
        relation_field: String,
    },
    #[error("model `{0}` is declared more than once")]
    DuplicateEntity(String),
}

pub fn resolve(mut schema: Schema) -> Result<ModelGraph, ResolveError> {
    let mut seen = HashSet::new();
    for entity in &schema.entities {
        if !seen.insert(entity.name.as_str()) {
            return Err(ResolveError::DuplicateEntity(entity.name.clone()));
        }
    }

    for entity in &mut schema.entities {
        let bindings: Vec<(RelationId, String)> = entity
            .relation_fields()
            .filter_map(|f| f.relation_id().map(|id| (id, f.name.clone())))
            .collect();

        for (id, relation_field) in bindings {
            let Some(relation) = schema.relations.get(id.0) else {
                continue;
            };
            for fk in &relation.fields {
                let Some(field) = entity.fields.iter_mut().find(|f| &f.name == fk) else {
                    return Err(ResolveError::UnknownForeignKey {
                        entity: entity.name.clone(),
                        field: fk.clone(),
                        relation_field,
                    });
                };
                if field.is_relation_field() {
                    return Err(ResolveError::ForeignKeyNotScalar {
                        entity: entity.name.clone(),
                        field: fk.clone(),
                        relation_field,
                    });
                }
                if let FieldRelation::Bound(previous) = field.relation {
                    tracing::debug!(
                        model = %entity.name,
                        field = %fk,
                        ?previous,
                        "foreign key shared by several relations; keeping the last"
                    );
                }
                field.relation = FieldRelation::Bound(id);
            }
        }
    }

    Ok(ModelGraph::new(schema))
}

/// Parse and resolve in one step, discarding structural warnings.
pub fn resolve_source(source: &str) -> Result<ModelGraph, Error> {
    let ParseOutcome { schema, .. } = parser::parse(source)?;
    Ok(resolve(schema)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FieldRelation;

    const BLOG: &str = r#"
model User {
  id    Int    @id
  posts Post[]
}

model Post {
  id       Int  @id
  author   User @relation(fields: [authorId], references: [id])
  authorId Int
}
"#;

    #[test]
    fn test_foreign_key_shares_relation() {
        let graph = resolve_source(BLOG).unwrap();
        let post = graph.entity("Post").unwrap();
        let author = post.field("author").unwrap();
        let author_id = post.field("authorId").unwrap();

        assert_eq!(author.relation, author_id.relation);
        let rel = graph.relation_of(author_id).unwrap();
        assert!(std::ptr::eq(rel, graph.relation_of(author).unwrap()));
        assert_eq!(rel.fields, vec!["authorId"]);
        assert_eq!(rel.references, vec!["id"]);
        assert!(author_id.is_foreign_key());
    }

    #[test]
    fn test_navigational_side_stays_implicit() {
        let graph = resolve_source(BLOG).unwrap();
        let posts = graph.entity("User").unwrap().field("posts").unwrap();
        assert_eq!(posts.relation, FieldRelation::Implicit);
        assert_eq!(
            graph.entity("User").unwrap().field("id").unwrap().relation,
            FieldRelation::None
        );
    }

    #[test]
    fn test_self_reference() {
        let input = r#"
model Category {
  id       Int        @id
  parent   Category?  @relation("Tree", fields: [parentId], references: [id])
  parentId Int?
  children Category[] @relation("Tree")
}
"#;
        let graph = resolve_source(input).unwrap();
        let cat = graph.entity("Category").unwrap();
        let rel = graph.relation_of(cat.field("parentId").unwrap()).unwrap();
        assert_eq!(rel.name.as_deref(), Some("Tree"));
        assert_eq!(rel.target, "Category");
        assert!(!rel.required);
        assert_eq!(graph.relations().len(), 2);
    }

    #[test]
    fn test_composite_foreign_key() {
        let input = r#"
model Member {
  orgId  Int
  userId Int
  org    Org @relation(fields: [orgId, userId], references: [id, ownerId])
}
"#;
        let graph = resolve_source(input).unwrap();
        let member = graph.entity("Member").unwrap();
        let a = member.field("orgId").unwrap().relation;
        let b = member.field("userId").unwrap().relation;
        assert_eq!(a, b);
        assert_eq!(a, member.field("org").unwrap().relation);
    }

    #[test]
    fn test_unknown_foreign_key() {
        let input = r#"
model Post {
  id     Int  @id
  author User @relation(fields: [writerId], references: [id])
}
"#;
        let err = resolve_source(input).unwrap_err();
        match err {
            Error::Resolve(ResolveError::UnknownForeignKey {
                entity,
                field,
                relation_field,
            }) => {
                assert_eq!(entity, "Post");
                assert_eq!(field, "writerId");
                assert_eq!(relation_field, "author");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_foreign_key_must_be_scalar() {
        let input = r#"
model Post {
  id     Int  @id
  editor User
  author User @relation(fields: [editor], references: [id])
}
"#;
        assert!(matches!(
            resolve_source(input).unwrap_err(),
            Error::Resolve(ResolveError::ForeignKeyNotScalar { .. })
        ));
    }

    #[test]
    fn test_duplicate_entity() {
        let input = "model A {\n  id Int @id\n}\nmodel A {\n  id Int @id\n}\n";
        assert_eq!(
            resolve(parser::parse(input).unwrap().schema).unwrap_err(),
            ResolveError::DuplicateEntity("A".into())
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        assert_eq!(resolve_source(BLOG).unwrap(), resolve_source(BLOG).unwrap());
    }
}
