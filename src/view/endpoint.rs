//! HTTP endpoints: one collection route and one single-resource route.

use serde::Serialize;

use super::service::OperationKind;
use super::{BuildError, SchemaNames, require_identifier};
use crate::ast::Entity;
use crate::naming::{Names, Naming};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Collection,
    Item,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointModel {
    pub names: Names,
    pub collection: Route,
    pub item: Route,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub kind: RouteKind,
    pub path: String,
    pub handlers: Vec<Handler>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handler {
    pub operation: OperationKind,
    /// Methods accepted for this operation; update takes PUT or PATCH.
    pub methods: Vec<HttpMethod>,
    /// Service function invoked.
    pub function: String,
    /// Validator applied to the request.
    pub validator: String,
    pub status: u16,
}

pub fn build(entity: &Entity, naming: &dyn Naming) -> Result<EndpointModel, BuildError> {
    let names = Names::new(naming, &entity.name);
    let identifier = require_identifier(entity)?;
    let schemas = SchemaNames::new(naming, &names);
    let handler = |operation: OperationKind, methods: &[HttpMethod], validator: &str, status| Handler {
        operation,
        methods: methods.to_vec(),
        function: operation.function_name(&names),
        validator: validator.to_string(),
        status,
    };

    let collection = Route {
        kind: RouteKind::Collection,
        path: format!("/api/{}", names.resource),
        handlers: vec![
            handler(OperationKind::Create, &[HttpMethod::Post], &schemas.body, 201),
            handler(OperationKind::FindMany, &[HttpMethod::Get], &schemas.body, 200),
        ],
    };
    let item = Route {
        kind: RouteKind::Item,
        path: format!("/api/{}/[{}]", names.resource, identifier.field),
        handlers: vec![
            handler(OperationKind::FindOne, &[HttpMethod::Get], &schemas.query, 200),
            handler(
                OperationKind::Update,
                &[HttpMethod::Put, HttpMethod::Patch],
                &schemas.body,
                200,
            ),
            handler(OperationKind::Delete, &[HttpMethod::Delete], &schemas.query, 200),
        ],
    };

    Ok(EndpointModel {
        names,
        collection,
        item,
    })
}

impl EndpointModel {
    pub fn route(&self, kind: RouteKind) -> &Route {
        match kind {
            RouteKind::Collection => &self.collection,
            RouteKind::Item => &self.item,
        }
    }

    /// Handler serving `method` on the given route, if any.
    pub fn dispatch(&self, kind: RouteKind, method: &str) -> Option<&Handler> {
        let method = HttpMethod::from_str(method)?;
        self.route(kind)
            .handlers
            .iter()
            .find(|h| h.methods.contains(&method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::EnglishNaming;
    use crate::resolve::resolve_source;

    fn model() -> EndpointModel {
        let graph = resolve_source("model Category {\n  id Int @id\n  name String\n}\n").unwrap();
        build(graph.entity("Category").unwrap(), &EnglishNaming).unwrap()
    }

    #[test]
    fn test_route_paths() {
        let m = model();
        assert_eq!(m.collection.path, "/api/categories");
        assert_eq!(m.item.path, "/api/categories/[id]");
    }

    #[test]
    fn test_operations_grouped_by_route() {
        let m = model();
        let ops = |r: &Route| r.handlers.iter().map(|h| h.operation).collect::<Vec<_>>();
        assert_eq!(
            ops(&m.collection),
            vec![OperationKind::Create, OperationKind::FindMany]
        );
        assert_eq!(
            ops(&m.item),
            vec![
                OperationKind::FindOne,
                OperationKind::Update,
                OperationKind::Delete
            ]
        );
    }

    #[test]
    fn test_update_accepts_put_and_patch() {
        let m = model();
        let put = m.dispatch(RouteKind::Item, "PUT").unwrap();
        let patch = m.dispatch(RouteKind::Item, "patch").unwrap();
        assert_eq!(put, patch);
        assert_eq!(put.operation, OperationKind::Update);
        assert_eq!(put.function, "updateCategory");
    }

    #[test]
    fn test_dispatch() {
        let m = model();
        assert_eq!(
            m.dispatch(RouteKind::Collection, "GET").unwrap().function,
            "findManyCategories"
        );
        assert_eq!(
            m.dispatch(RouteKind::Collection, "POST").unwrap().status,
            201
        );
        assert_eq!(
            m.dispatch(RouteKind::Item, "DELETE").unwrap().validator,
            "categoryQuerySchema"
        );
        assert!(m.dispatch(RouteKind::Collection, "DELETE").is_none());
        assert!(m.dispatch(RouteKind::Item, "TRACE").is_none());
    }
}
