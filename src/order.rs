//! Emission order of entities.
//!
//! An entity with a list-valued relation to another entity refers to that
//! entity's identifier validator, so the referenced entity has to be emitted
//! first. Many-to-many pairs can never satisfy this both ways.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ast::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStrategy {
    /// Ascending count of list-valued relation fields, ties in source order.
    FanOut,
    /// Dependency order, with cycles broken at the lowest fan-out.
    #[default]
    Topological,
}

impl OrderStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fan-out" | "fanout" => Some(Self::FanOut),
            "topological" | "topo" => Some(Self::Topological),
            _ => None,
        }
    }
}

/// An entity emitted before everything it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleBreak {
    pub entity: String,
    pub waiting_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmissionOrder<'a> {
    pub entities: Vec<&'a Entity>,
    pub cycle_breaks: Vec<CycleBreak>,
}

pub fn order<'a>(entities: &[&'a Entity], strategy: OrderStrategy) -> EmissionOrder<'a> {
    match strategy {
        OrderStrategy::FanOut => by_fan_out(entities),
        OrderStrategy::Topological => topological(entities),
    }
}

fn by_fan_out<'a>(entities: &[&'a Entity]) -> EmissionOrder<'a> {
    let mut sorted = entities.to_vec();
    sorted.sort_by_key(|e| e.list_relation_count());
    EmissionOrder {
        entities: sorted,
        cycle_breaks: Vec::new(),
    }
}

fn topological<'a>(entities: &[&'a Entity]) -> EmissionOrder<'a> {
    let names: HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();

    // entity -> entities it must follow
    let mut deps: HashMap<&str, Vec<&str>> = HashMap::new();
    for entity in entities {
        let mut targets: Vec<&str> = entity
            .relation_fields()
            .filter(|f| f.is_list)
            .map(|f| f.base_type())
            .filter(|t| *t != entity.name && names.contains(t))
            .collect();
        targets.sort_unstable();
        targets.dedup();
        deps.insert(entity.name.as_str(), targets);
    }

    let mut remaining: Vec<&'a Entity> = entities.to_vec();
    let mut done: HashSet<&str> = HashSet::new();
    let mut emitted = Vec::with_capacity(entities.len());
    let mut cycle_breaks = Vec::new();

    while !remaining.is_empty() {
        let ready = remaining
            .iter()
            .position(|e| deps[e.name.as_str()].iter().all(|d| done.contains(d)));

        let idx = match ready {
            Some(idx) => idx,
            None => {
                let idx = remaining
                    .iter()
                    .enumerate()
                    .min_by_key(|(i, e)| (e.list_relation_count(), *i))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                let entity = remaining[idx];
                let waiting_on: Vec<String> = deps[entity.name.as_str()]
                    .iter()
                    .filter(|d| !done.contains(*d))
                    .map(|d| d.to_string())
                    .collect();
                tracing::warn!(
                    model = %entity.name,
                    waiting_on = ?waiting_on,
                    "relation cycle; emitting before its dependencies"
                );
                cycle_breaks.push(CycleBreak {
                    entity: entity.name.clone(),
                    waiting_on,
                });
                idx
            }
        };

        let entity = remaining.remove(idx);
        done.insert(entity.name.as_str());
        emitted.push(entity);
    }

    EmissionOrder {
        entities: emitted,
        cycle_breaks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve_source;

    fn names<'a>(order: &EmissionOrder<'a>) -> Vec<&'a str> {
        order.entities.iter().map(|e| e.name.as_str()).collect()
    }

    const SHOP: &str = r#"
model Customer {
  id     Int     @id
  orders Order[]
}

model Order {
  id         Int        @id
  customer   Customer   @relation(fields: [customerId], references: [id])
  customerId Int
  items      LineItem[]
}

model LineItem {
  id      Int   @id
  order   Order @relation(fields: [orderId], references: [id])
  orderId Int
}
"#;

    #[test]
    fn test_fan_out_is_stable() {
        let graph = resolve_source(SHOP).unwrap();
        let all: Vec<_> = graph.entities().iter().collect();
        let order = order(&all, OrderStrategy::FanOut);
        assert_eq!(names(&order), vec!["LineItem", "Customer", "Order"]);
    }

    #[test]
    fn test_topological_referenced_first() {
        let graph = resolve_source(SHOP).unwrap();
        let all: Vec<_> = graph.entities().iter().collect();
        let order = order(&all, OrderStrategy::Topological);
        assert_eq!(names(&order), vec!["LineItem", "Order", "Customer"]);
        assert!(order.cycle_breaks.is_empty());
    }

    #[test]
    fn test_many_to_many_cycle_is_reported() {
        let input = r#"
model Tag {
  id    Int    @id
  posts Post[]
}

model Post {
  id     Int     @id
  tags   Tag[]
  extras Extra[]
}

model Extra {
  id Int @id
}
"#;
        let graph = resolve_source(input).unwrap();
        let all: Vec<_> = graph.entities().iter().collect();
        let order = order(&all, OrderStrategy::Topological);
        assert_eq!(names(&order), vec!["Extra", "Tag", "Post"]);
        assert_eq!(
            order.cycle_breaks,
            vec![CycleBreak {
                entity: "Tag".into(),
                waiting_on: vec!["Post".into()]
            }]
        );
    }

    #[test]
    fn test_dependencies_outside_selection_are_ignored() {
        let graph = resolve_source(SHOP).unwrap();
        let customer = graph.entity("Customer").unwrap();
        let order_entity = graph.entity("Order").unwrap();
        let order = order(&[customer, order_entity], OrderStrategy::Topological);
        assert_eq!(names(&order), vec!["Order", "Customer"]);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let input = r#"
model Node {
  id       Int    @id
  children Node[]
}
"#;
        let graph = resolve_source(input).unwrap();
        let all: Vec<_> = graph.entities().iter().collect();
        assert!(order(&all, OrderStrategy::Topological).cycle_breaks.is_empty());
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(OrderStrategy::from_str("fan-out"), Some(OrderStrategy::FanOut));
        assert_eq!(OrderStrategy::from_str("topological"), Some(OrderStrategy::Topological));
        assert_eq!(OrderStrategy::from_str("random"), None);
    }
}
