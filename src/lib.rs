pub mod ast;
pub mod config;
pub mod generate;
pub mod ir;
pub mod lexer;
pub mod measure;
pub mod naming;
pub mod order;
pub mod parser;
pub mod resolve;
pub mod scalar;
pub mod serializer;
pub mod view;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use generate::{DryRunWriter, GenerateError, Generator, JsonRenderer};
use ir::ModelGraph;
use naming::EnglishNaming;
use parser::{ParseError, ParseOptions, Parser, StructuralError};
use resolve::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A resolved document plus the structural problems tolerated on the way.
#[derive(Debug)]
pub struct Loaded {
    pub graph: ModelGraph,
    pub warnings: Vec<StructuralError>,
}

/// Parse and resolve schema source.
pub fn load(source: &str, options: ParseOptions) -> Result<Loaded, Error> {
    let outcome = Parser::new(source).with_options(options).parse()?;
    let graph = resolve::resolve(outcome.schema)?;
    Ok(Loaded {
        graph,
        warnings: outcome.warnings,
    })
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

#[derive(Serialize)]
struct ViewModels<'a> {
    structural: &'a [StructuralError],
    #[serde(flatten)]
    plan: &'a generate::Plan,
}

/// Build every view model of a schema and return them as JSON.
#[wasm_bindgen(js_name = "schemaToViewModels")]
pub fn schema_to_view_models(source: &str, strict: Option<bool>) -> Result<String, String> {
    let options = ParseOptions {
        strict: strict.unwrap_or(false),
    };
    let loaded = load(source, options).map_err(|e| e.to_string())?;
    let selection: Vec<String> = loaded
        .graph
        .entities()
        .iter()
        .map(|e| e.name.clone())
        .collect();

    let plan = Generator::new(&EnglishNaming, &JsonRenderer, &DryRunWriter)
        .plan(&loaded.graph, &selection)
        .map_err(|e| e.to_string())?;

    serde_json::to_string(&ViewModels {
        structural: &loaded.warnings,
        plan: &plan,
    })
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r#"
model Customer {
  id     Int     @id
  orders Order[]
}

model Order {
  id         Int      @id
  customer   Customer @relation(fields: [customerId], references: [id])
  customerId Int
}

model Draft {
  id Int @id
"#;

    #[test]
    fn test_load_keeps_warnings() {
        let loaded = load(SHOP, ParseOptions::default()).unwrap();
        assert_eq!(loaded.graph.entities().len(), 2);
        assert_eq!(
            loaded.warnings,
            vec![StructuralError::UnclosedEntity {
                line: 13,
                name: "Draft".into()
            }]
        );
    }

    #[test]
    fn test_load_strict() {
        let err = load(SHOP, ParseOptions { strict: true }).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::Structural(StructuralError::UnclosedEntity { .. }))
        ));
    }

    #[test]
    fn test_unclosed_only_document_is_empty() {
        let loaded = load("model User {\n  id Int @id\n", ParseOptions::default()).unwrap();
        assert!(loaded.graph.entities().is_empty());
        assert!(loaded.graph.relations().is_empty());
    }

    #[test]
    fn test_schema_to_view_models() {
        let json = schema_to_view_models(SHOP, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["structural"][0]["kind"], "unclosed_entity");
        assert_eq!(value["report"]["generated"][0], "Order");
        assert_eq!(value["report"]["generated"][1], "Customer");
        let first = &value["artifacts"][0];
        assert_eq!(first["path"], "validation/order.json");
        assert_eq!(first["model"]["artifact"], "validation");
        assert_eq!(first["model"]["schema_name"], "orderSchema");
    }

    #[test]
    fn test_schema_to_view_models_reports_errors() {
        let err = schema_to_view_models("model A {\n  id\n}\n", None).unwrap_err();
        assert!(err.contains("Missing type"));
    }
}
