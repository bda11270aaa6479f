//! View-model builders.
//!
//! Each builder is a pure function from the resolved graph and one entity to
//! a template-ready structure. Builders never mutate the graph.

pub mod endpoint;
pub mod service;
pub mod ui;
pub mod validation;

use serde::Serialize;

use crate::ast::{Entity, Field};
use crate::ir::ModelGraph;
use crate::naming::{Names, Naming};
use crate::scalar::ScalarType;

pub use endpoint::EndpointModel;
pub use service::ServiceModel;
pub use ui::UiModel;
pub use validation::ValidationModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildError {
    #[error("model `{entity}`: field `{field}` refers to unknown model `{target}`")]
    Reference {
        entity: String,
        field: String,
        target: String,
    },
    #[error("model `{entity}` has no scalar field to identify records by")]
    NoIdentifier { entity: String },
}

/// Field used to look records up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub field: String,
    pub scalar: ScalarType,
    pub target_type: &'static str,
    pub validator: &'static str,
    /// No field is marked `@id`; the first scalar field stands in.
    pub surrogate: bool,
}

/// The entity's `@id` field, or its first scalar field as a surrogate.
pub fn identifier(entity: &Entity) -> Option<Identifier> {
    let (field, surrogate) = match entity.id_field() {
        Some(f) => (f, false),
        None => (entity.scalar_fields().next()?, true),
    };
    let scalar = field.scalar()?;
    Some(Identifier {
        field: field.name.clone(),
        scalar,
        target_type: scalar.target_type(),
        validator: scalar.validator(),
        surrogate,
    })
}

pub(crate) fn require_identifier(entity: &Entity) -> Result<Identifier, BuildError> {
    identifier(entity).ok_or_else(|| BuildError::NoIdentifier {
        entity: entity.name.clone(),
    })
}

/// What a non-scalar field points at.
pub(crate) enum Target<'g> {
    Entity(&'g Entity),
    Enum(&'g str),
}

/// Look up the entity a relation field refers to.
pub(crate) fn target<'g>(
    graph: &'g ModelGraph,
    entity: &Entity,
    field: &'g Field,
) -> Result<Target<'g>, BuildError> {
    let name = field.base_type();
    if let Some(related) = graph.entity(name) {
        return Ok(Target::Entity(related));
    }
    if graph.is_enum(name) {
        return Ok(Target::Enum(name));
    }
    Err(BuildError::Reference {
        entity: entity.name.clone(),
        field: field.name.clone(),
        target: name.to_string(),
    })
}

/// Name of the validator accepting only an entity's identifier.
pub(crate) fn id_schema_name(naming: &dyn Naming, entity: &str) -> String {
    format!("{}IdSchema", naming.lower_first(entity))
}

/// Validators emitted for an entity; endpoints refer to them by these names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SchemaNames {
    pub body: String,
    pub query: String,
    pub id: String,
}

impl SchemaNames {
    pub fn new(naming: &dyn Naming, names: &Names) -> Self {
        Self {
            body: format!("{}Schema", names.camel),
            query: format!("{}QuerySchema", names.camel),
            id: id_schema_name(naming, &names.name),
        }
    }
}

/// Index of all entities in emission order, for artifacts that list them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexModel {
    pub entries: Vec<Names>,
}

impl IndexModel {
    pub fn build(entities: &[&Entity], naming: &dyn Naming) -> Self {
        Self {
            entries: entities.iter().map(|e| Names::new(naming, &e.name)).collect(),
        }
    }
}

/// Any view model, as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "artifact", rename_all = "snake_case")]
pub enum ViewModel {
    Validation(ValidationModel),
    Service(ServiceModel),
    Endpoint(EndpointModel),
    Ui(UiModel),
    Index(IndexModel),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::EnglishNaming;
    use crate::resolve::resolve_source;

    #[test]
    fn test_identifier_prefers_id_field() {
        let graph = resolve_source("model A {\n  name String\n  key Int @id\n}\n").unwrap();
        let id = identifier(graph.entity("A").unwrap()).unwrap();
        assert_eq!(id.field, "key");
        assert!(!id.surrogate);
        assert_eq!(id.target_type, "number");
    }

    #[test]
    fn test_identifier_surrogate() {
        let graph = resolve_source("model A {\n  owner B\n  slug String\n}\nmodel B {\n  id Int @id\n}\n")
            .unwrap();
        let id = identifier(graph.entity("A").unwrap()).unwrap();
        assert_eq!(id.field, "slug");
        assert!(id.surrogate);
    }

    #[test]
    fn test_endpoints_use_emitted_validator_names() {
        let graph = resolve_source("model BlogPost {\n  id Int @id\n}\n").unwrap();
        let entity = graph.entity("BlogPost").unwrap();
        let validation = validation::build(&graph, entity, &EnglishNaming).unwrap();
        let endpoint = endpoint::build(entity, &EnglishNaming).unwrap();

        let validators: Vec<&str> = endpoint
            .collection
            .handlers
            .iter()
            .chain(&endpoint.item.handlers)
            .map(|h| h.validator.as_str())
            .collect();
        assert_eq!(
            validators,
            vec![
                validation.schema_name.as_str(),
                validation.schema_name.as_str(),
                validation.query_schema_name.as_str(),
                validation.schema_name.as_str(),
                validation.query_schema_name.as_str(),
            ]
        );
        assert_eq!(validation.id_schema_name, "blogPostIdSchema");
    }

    #[test]
    fn test_no_identifier() {
        let graph = resolve_source("model A {\n  b B\n}\nmodel B {\n  id Int @id\n}\n").unwrap();
        assert_eq!(
            require_identifier(graph.entity("A").unwrap()).unwrap_err(),
            BuildError::NoIdentifier { entity: "A".into() }
        );
    }
}
