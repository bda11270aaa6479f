//! Data-access service: the five canonical operations per entity.

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::{BuildError, Identifier, Target, require_identifier, target};
use crate::ast::Entity;
use crate::ir::ModelGraph;
use crate::naming::{Names, Naming};

pub const START_PARAM: &str = "_start";
pub const END_PARAM: &str = "_end";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    FindOne,
    FindMany,
    Update,
    Delete,
}

impl OperationKind {
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::FindOne,
        Self::FindMany,
        Self::Update,
        Self::Delete,
    ];

    /// Function name, e.g. `findManyUsers` / `createUser`.
    pub fn function_name(self, names: &Names) -> String {
        match self {
            Self::Create => format!("create{}", names.name),
            Self::FindOne => format!("find{}", names.name),
            Self::FindMany => format!("findMany{}", names.plural),
            Self::Update => format!("update{}", names.name),
            Self::Delete => format!("delete{}", names.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceModel {
    pub names: Names,
    pub identifier: Identifier,
    pub operations: Vec<Operation>,
    pub find_many: FindManyPlan,
    /// List-valued relations connected by identifier on create/update.
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindManyPlan {
    pub id_field: String,
    /// The id filter takes one value or a set of values.
    pub accepts_many: bool,
    pub start_param: &'static str,
    pub end_param: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub field: String,
    pub target: String,
    /// Identifier field on the related entity.
    pub target_key: String,
}

pub fn build(
    graph: &ModelGraph,
    entity: &Entity,
    naming: &dyn Naming,
) -> Result<ServiceModel, BuildError> {
    let names = Names::new(naming, &entity.name);
    let identifier = require_identifier(entity)?;

    let mut connections = Vec::new();
    for field in entity.relation_fields() {
        let Target::Entity(related) = target(graph, entity, field)? else {
            continue;
        };
        if !field.is_list {
            continue;
        }
        let target_key = require_identifier(related)
            .map(|id| id.field)
            .unwrap_or_else(|_| "id".to_string());
        connections.push(Connection {
            field: field.name.clone(),
            target: related.name.clone(),
            target_key,
        });
    }

    let operations = OperationKind::ALL
        .iter()
        .map(|&kind| Operation {
            kind,
            function: kind.function_name(&names),
        })
        .collect();

    Ok(ServiceModel {
        find_many: FindManyPlan {
            id_field: identifier.field.clone(),
            accepts_many: true,
            start_param: START_PARAM,
            end_param: END_PARAM,
        },
        names,
        identifier,
        operations,
        connections,
    })
}

impl ServiceModel {
    pub fn operation(&self, kind: OperationKind) -> Option<&Operation> {
        self.operations.iter().find(|op| op.kind == kind)
    }

    /// Rewrite list-valued relation fields of a create/update payload into
    /// connect-by-identifier form. Other fields pass through untouched.
    pub fn connect_payload(&self, payload: Value) -> Value {
        let mut object = match payload {
            Value::Object(object) => object,
            other => return other,
        };
        for conn in &self.connections {
            let Some(Value::Array(ids)) = object.get(&conn.field) else {
                continue;
            };
            let connect: Vec<Value> = ids
                .iter()
                .map(|id| {
                    let mut key = Map::new();
                    key.insert(conn.target_key.clone(), id.clone());
                    Value::Object(key)
                })
                .collect();
            object.insert(conn.field.clone(), json!({ "connect": connect }));
        }
        Value::Object(object)
    }
}

/// Identifier filter of a find-many call.
#[derive(Debug, Clone, PartialEq)]
pub enum IdFilter {
    One(Value),
    Many(Vec<Value>),
}

impl IdFilter {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(values) => Self::Many(values),
            other => Self::One(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub take: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgsError {
    #[error("`{param}` must be a non-negative integer, got {value}")]
    InvalidBound { param: &'static str, value: Value },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyArgs {
    pub ids: Option<IdFilter>,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl FindManyArgs {
    /// Read the filter and pagination bounds out of query parameters.
    pub fn from_query(plan: &FindManyPlan, params: &Map<String, Value>) -> Result<Self, ArgsError> {
        let ids = params.get(&plan.id_field).cloned().map(IdFilter::from_value);
        Ok(Self {
            ids: if plan.accepts_many {
                ids
            } else {
                ids.filter(|f| matches!(f, IdFilter::One(_)))
            },
            start: bound(params, plan.start_param)?,
            end: bound(params, plan.end_param)?,
        })
    }

    /// Pagination window; `take = end - start` when both bounds are given.
    pub fn window(&self) -> Option<Window> {
        match (self.start, self.end) {
            (None, None) => None,
            (Some(start), None) => Some(Window {
                skip: start,
                take: None,
            }),
            (None, Some(end)) => Some(Window {
                skip: 0,
                take: Some(end),
            }),
            (Some(start), Some(end)) => Some(Window {
                skip: start,
                take: Some(end.saturating_sub(start)),
            }),
        }
    }
}

fn bound(params: &Map<String, Value>, param: &'static str) -> Result<Option<u64>, ArgsError> {
    let Some(value) = params.get(param) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| ArgsError::InvalidBound {
        param,
        value: value.clone(),
    })
}
