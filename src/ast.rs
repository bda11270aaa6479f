use serde::Serialize;

use crate::scalar::ScalarType;

/// Unresolved model graph as produced by the parser.
///
/// Relation metadata lives once in `relations`; fields refer to it by
/// [`RelationId`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Schema {
    pub entities: Vec<Entity>,
    pub relations: Vec<RelationInfo>,
    /// Names of declared enums. Their values are never modelled.
    pub enums: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub name: String,
    /// 1-based line of the opening `model` line.
    pub line: usize,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    /// Type token as written, including `[]` / `?` markers.
    pub raw_type: String,
    pub is_list: bool,
    pub is_required: bool,
    pub is_unique: bool,
    pub is_id: bool,
    pub is_generated: bool,
    pub is_created_at: bool,
    pub is_updated_at: bool,
    pub is_read_only: bool,
    /// Generator expression of a generated default, e.g. `autoincrement()`.
    pub generated_by: Option<String>,
    /// Literal `@default(...)` argument that is not one of the generated markers.
    pub default: Option<String>,
    pub relation: FieldRelation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RelationId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRelation {
    /// Scalar field carrying no relation.
    None,
    /// Relation field without an explicit attribute clause.
    Implicit,
    Bound(RelationId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationInfo {
    /// Optional relation name, `@relation("Name", ...)`.
    pub name: Option<String>,
    /// Related entity.
    pub target: String,
    /// Navigational field that declared the relation.
    pub field: String,
    /// Foreign-key scalar fields on the owning entity.
    pub fields: Vec<String>,
    /// Referenced fields on the target entity.
    pub references: Vec<String>,
    pub restrictions: Restrictions,
    pub multiple: bool,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Restrictions {
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

impl Field {
    /// Type with `[]` and `?` stripped.
    pub fn base_type(&self) -> &str {
        strip_type_markers(&self.raw_type)
    }

    pub fn scalar(&self) -> Option<ScalarType> {
        ScalarType::from_str(self.base_type())
    }

    pub fn is_relation_field(&self) -> bool {
        self.scalar().is_none()
    }

    pub fn relation_id(&self) -> Option<RelationId> {
        match self.relation {
            FieldRelation::Bound(id) => Some(id),
            _ => None,
        }
    }

    /// Scalar field that carries a bound relation after resolution.
    pub fn is_foreign_key(&self) -> bool {
        !self.is_relation_field() && self.relation_id().is_some()
    }
}

pub fn strip_type_markers(raw: &str) -> &str {
    let t = raw.strip_suffix('?').unwrap_or(raw);
    t.strip_suffix("[]").unwrap_or(t)
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_id)
    }

    pub fn scalar_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_relation_field())
    }

    pub fn relation_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_relation_field())
    }

    /// Number of list-valued relation fields, the fan-out used for ordering.
    pub fn list_relation_count(&self) -> usize {
        self.relation_fields().filter(|f| f.is_list).count()
    }
}

impl Schema {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn relation(&self, id: RelationId) -> Option<&RelationInfo> {
        self.relations.get(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_type_markers() {
        assert_eq!(strip_type_markers("Post[]"), "Post");
        assert_eq!(strip_type_markers("String?"), "String");
        assert_eq!(strip_type_markers("Int"), "Int");
    }
}
