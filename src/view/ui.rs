use heck::ToTitleCase;
use serde::Serialize;

use super::{BuildError, Target, identifier, target};
use crate::ast::Entity;
use crate::ir::ModelGraph;
use crate::naming::{Names, Naming, resource_name};
use crate::scalar::{DisplayKind, ScalarType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiModel {
    pub names: Names,
    pub identifier: Option<String>,
    pub fields: Vec<UiField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiField {
    pub source: String,
    pub label: String,
    pub kind: DisplayKind,
    pub required: bool,
    pub read_only: bool,
    pub multiple: bool,
    /// Related resource, for relation fields.
    pub resource: Option<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    /// Route/resource identifier of the related entity.
    pub name: String,
    /// Related field shown in pickers; the identifier when nothing better exists.
    pub option_text: String,
}

pub fn build(graph: &ModelGraph, entity: &Entity, naming: &dyn Naming) -> Result<UiModel, BuildError> {
    let mut fields = Vec::with_capacity(entity.fields.len());

    for field in &entity.fields {
        let (kind, resource) = match field.scalar() {
            Some(scalar) => (scalar.display_kind(), None),
            None => match target(graph, entity, field)? {
                Target::Entity(related) => (
                    DisplayKind::Relation,
                    Some(ResourceRef {
                        name: resource_name(naming, &related.name),
                        option_text: option_text(related),
                    }),
                ),
                Target::Enum(_) => (DisplayKind::Text, None),
            },
        };

        fields.push(UiField {
            source: field.name.clone(),
            label: field.name.to_title_case(),
            kind,
            required: field.is_required && !field.is_list && field.default.is_none(),
            read_only: field.is_read_only,
            multiple: field.is_list,
            resource,
        });
    }

    Ok(UiModel {
        names: Names::new(naming, &entity.name),
        identifier: identifier(entity).map(|id| id.field),
        fields,
    })
}

/// First non-identifier string field of the related entity.
fn option_text(related: &Entity) -> String {
    related
        .scalar_fields()
        .find(|f| !f.is_id && f.scalar() == Some(ScalarType::String))
        .or_else(|| related.id_field())
        .map(|f| f.name.clone())
        .unwrap_or_else(|| "id".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::EnglishNaming;
    use crate::resolve::resolve_source;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"
model Author {
  id        Int          @id @default(autoincrement())
  name      String
  active    Boolean
  born      DateTime?
  avatar    Bytes?
  posts     BlogPost[]
  updatedAt DateTime     @updatedAt
}

model BlogPost {
  id       Int    @id
  author   Author @relation(fields: [authorId], references: [id])
  authorId Int
}
"#;

    fn model(entity: &str) -> UiModel {
        let graph = resolve_source(SOURCE).unwrap();
        build(&graph, graph.entity(entity).unwrap(), &EnglishNaming).unwrap()
    }

    fn field<'a>(m: &'a UiModel, name: &str) -> &'a UiField {
        m.fields.iter().find(|f| f.source == name).unwrap()
    }

    #[test]
    fn test_display_kinds() {
        let m = model("Author");
        assert_eq!(field(&m, "id").kind, DisplayKind::Number);
        assert_eq!(field(&m, "name").kind, DisplayKind::Text);
        assert_eq!(field(&m, "active").kind, DisplayKind::Boolean);
        assert_eq!(field(&m, "born").kind, DisplayKind::Date);
        assert_eq!(field(&m, "avatar").kind, DisplayKind::Unknown);
        assert_eq!(field(&m, "posts").kind, DisplayKind::Relation);
    }

    #[test]
    fn test_list_relation_descriptor() {
        let m = model("Author");
        assert_eq!(
            field(&m, "posts"),
            &UiField {
                source: "posts".into(),
                label: "Posts".into(),
                kind: DisplayKind::Relation,
                required: false,
                read_only: false,
                multiple: true,
                resource: Some(ResourceRef {
                    name: "blogposts".into(),
                    option_text: "id".into(),
                }),
            }
        );
    }

    #[test]
    fn test_single_relation_descriptor() {
        let m = model("BlogPost");
        let author = field(&m, "author");
        assert!(!author.multiple);
        assert!(author.required);
        let resource = author.resource.as_ref().unwrap();
        assert_eq!(resource.name, "authors");
        assert_eq!(resource.option_text, "name");
    }

    #[test]
    fn test_labels_and_flags() {
        let m = model("Author");
        let updated = field(&m, "updatedAt");
        assert_eq!(updated.label, "Updated At");
        assert!(updated.read_only);
        assert!(!field(&m, "born").required);
        assert_eq!(m.identifier.as_deref(), Some("id"));
        assert_eq!(m.names.resource, "authors");
    }
}
