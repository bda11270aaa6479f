use std::collections::HashMap;

use serde::Serialize;

use crate::ast::{Entity, Field, RelationId, RelationInfo, Schema, strip_type_markers};

/// How many records sit on each side of a relation, seen from the field that
/// declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Resolved, read-only model graph handed to the view-model builders.
///
/// Only the resolver constructs one; there is no way to mutate it afterwards,
/// which is what makes the parallel per-entity build safe.
#[derive(Debug, Clone, Serialize)]
pub struct ModelGraph {
    entities: Vec<Entity>,
    relations: Vec<RelationInfo>,
    enums: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// Entities picked by name, plus the names that matched nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub entities: Vec<&'a Entity>,
    pub unknown: Vec<String>,
}

impl ModelGraph {
    pub(crate) fn new(schema: Schema) -> Self {
        let index = schema
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Self {
            entities: schema.entities,
            relations: schema.relations,
            enums: schema.enums,
            index,
        }
    }

    /// Entities in source order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    pub fn relations(&self) -> &[RelationInfo] {
        &self.relations
    }

    pub fn relation(&self, id: RelationId) -> Option<&RelationInfo> {
        self.relations.get(id.0)
    }

    /// Whether `name` is a declared enum rather than an entity.
    pub fn enums(&self) -> &[String] {
        &self.enums
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enums.iter().any(|e| e == name)
    }

    /// Relation metadata reachable from either the navigational field or one
    /// of its foreign-key fields.
    pub fn relation_of(&self, field: &Field) -> Option<&RelationInfo> {
        field.relation_id().and_then(|id| self.relation(id))
    }

    fn relation_name(&self, field: &Field) -> Option<&str> {
        self.relation_of(field).and_then(|r| r.name.as_deref())
    }

    /// The field on the other side of `field`'s relation. Named relations pair
    /// by name; unnamed ones with the first unnamed field pointing back.
    pub fn back_reference<'g>(&'g self, owner: &Entity, field: &Field) -> Option<&'g Field> {
        let target = self.entity(field.base_type())?;
        let name = self.relation_name(field);
        let mut candidates = target.relation_fields().filter(|f| {
            strip_type_markers(&f.raw_type) == owner.name
                && !(target.name == owner.name && f.name == field.name)
        });
        match name {
            Some(_) => candidates.find(|f| self.relation_name(f) == name),
            None => candidates.find(|f| self.relation_name(f).is_none()),
        }
    }

    /// Classify a relation field. `None` for scalar fields.
    pub fn multiplicity(&self, owner: &Entity, field: &Field) -> Option<Multiplicity> {
        if !field.is_relation_field() {
            return None;
        }
        let back_is_list = self
            .back_reference(owner, field)
            .is_some_and(|back| back.is_list);

        Some(match (field.is_list, back_is_list) {
            (false, false) => Multiplicity::OneToOne,
            (true, false) => Multiplicity::OneToMany,
            (false, true) => Multiplicity::ManyToOne,
            (true, true) => Multiplicity::ManyToMany,
        })
    }

    /// Pick entities by name, keeping the requested order. An empty request
    /// selects nothing.
    pub fn select(&self, names: &[String]) -> Selection<'_> {
        let mut entities = Vec::new();
        let mut unknown = Vec::new();
        for name in names {
            match self.entity(name) {
                Some(e) if !entities.iter().any(|s: &&Entity| s.name == e.name) => entities.push(e),
                Some(_) => {}
                None => unknown.push(name.clone()),
            }
        }
        Selection { entities, unknown }
    }
}

impl PartialEq for ModelGraph {
    fn eq(&self, other: &Self) -> bool {
        self.entities == other.entities
            && self.relations == other.relations
            && self.enums == other.enums
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve_source;

    const SOURCE: &str = r#"
model User {
  id      Int       @id
  posts   Post[]
  profile Profile?
  groups  Group[]
}

model Profile {
  id     Int  @id
  user   User @relation(fields: [userId], references: [id])
  userId Int  @unique
}

model Post {
  id       Int  @id
  author   User @relation(fields: [authorId], references: [id])
  authorId Int
}

model Group {
  id      Int    @id
  members User[]
}
"#;

    #[test]
    fn test_multiplicity() {
        let graph = resolve_source(SOURCE).unwrap();
        let user = graph.entity("User").unwrap();
        let post = graph.entity("Post").unwrap();
        let profile = graph.entity("Profile").unwrap();

        let m = |e: &Entity, f: &str| graph.multiplicity(e, e.field(f).unwrap());
        assert_eq!(m(user, "posts"), Some(Multiplicity::OneToMany));
        assert_eq!(m(post, "author"), Some(Multiplicity::ManyToOne));
        assert_eq!(m(user, "profile"), Some(Multiplicity::OneToOne));
        assert_eq!(m(profile, "user"), Some(Multiplicity::OneToOne));
        assert_eq!(m(user, "groups"), Some(Multiplicity::ManyToMany));
        assert_eq!(m(user, "id"), None);
    }

    #[test]
    fn test_named_relations_pair_by_name() {
        let graph = resolve_source(
            r#"
model User {
  id       Int   @id
  pinned   Post? @relation("Pin", fields: [pinnedId], references: [id])
  pinnedId Int?
  posts    Post[] @relation("Authored")
}

model Post {
  id       Int  @id
  author   User @relation("Authored", fields: [authorId], references: [id])
  authorId Int
  pinnedBy User[] @relation("Pin")
}
"#,
        )
        .unwrap();
        let user = graph.entity("User").unwrap();
        let post = graph.entity("Post").unwrap();

        let m = |e: &Entity, f: &str| graph.multiplicity(e, e.field(f).unwrap());
        assert_eq!(m(post, "author"), Some(Multiplicity::ManyToOne));
        assert_eq!(m(user, "posts"), Some(Multiplicity::OneToMany));
        assert_eq!(m(user, "pinned"), Some(Multiplicity::ManyToOne));
        assert_eq!(m(post, "pinnedBy"), Some(Multiplicity::OneToMany));

        let back = graph.back_reference(post, post.field("author").unwrap()).unwrap();
        assert_eq!(back.name, "posts");
    }

    #[test]
    fn test_select_keeps_request_order() {
        let graph = resolve_source(SOURCE).unwrap();
        let selection = graph.select(&["Post".into(), "Nope".into(), "User".into(), "Post".into()]);
        let names: Vec<_> = selection.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Post", "User"]);
        assert_eq!(selection.unknown, vec!["Nope"]);
    }

    #[test]
    fn test_empty_selection() {
        let graph = resolve_source(SOURCE).unwrap();
        let selection = graph.select(&[]);
        assert!(selection.entities.is_empty());
        assert!(selection.unknown.is_empty());
    }
}
