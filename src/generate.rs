//! Generation orchestrator: selection, ordering, per-entity builds, index
//! artifacts and writes.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::ast::Entity;
use crate::ir::ModelGraph;
use crate::naming::{Names, Naming};
use crate::order::{self, CycleBreak, OrderStrategy};
use crate::view::{self, BuildError, IndexModel, ViewModel, endpoint, service, ui, validation};

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Kind of artifact a user can switch on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Validation,
    Service,
    Endpoint,
    Ui,
}

impl ArtifactKind {
    pub const ALL: [Self; 4] = [Self::Validation, Self::Service, Self::Endpoint, Self::Ui];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "validation" => Some(Self::Validation),
            "service" => Some(Self::Service),
            "endpoint" => Some(Self::Endpoint),
            "ui" => Some(Self::Ui),
            _ => None,
        }
    }
}

/// Template a view model is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    Validation,
    ValidationIndex,
    Service,
    EndpointCollection,
    EndpointItem,
    UiFields,
    UiResources,
}

impl TemplateId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ValidationIndex => "validation-index",
            Self::Service => "service",
            Self::EndpointCollection => "endpoint-collection",
            Self::EndpointItem => "endpoint-item",
            Self::UiFields => "ui-fields",
            Self::UiResources => "ui-resources",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template `{template}`: {message}")]
    Template {
        template: &'static str,
        message: String,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub trait Renderer: Sync {
    fn render(&self, template: TemplateId, model: &ViewModel) -> Result<String, RenderError>;

    /// File extension of rendered artifacts, without the dot.
    fn extension(&self) -> &str;
}

/// Renders every view model as pretty-printed JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: TemplateId, model: &ViewModel) -> Result<String, RenderError> {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "template": template.as_str(),
            "model": model,
        }))?;
        out.push('\n');
        Ok(out)
    }

    fn extension(&self) -> &str {
        "json"
    }
}

pub trait FileWriter: Sync {
    /// Write `content` at `path`, relative to the writer's output root.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;
}

/// Writes under an output root, creating parent directories.
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileWriter for FsWriter {
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)
    }
}

/// Collects written files in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        match self.files.lock() {
            Ok(files) => files.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl FileWriter for MemoryWriter {
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| io::Error::other("memory writer lock poisoned"))?;
        files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}

/// Logs what would be written.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunWriter;

impl FileWriter for DryRunWriter {
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        tracing::info!(path = %path.display(), bytes = content.len(), "dry run");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Failed to render {template}: {source}")]
    Render {
        template: &'static str,
        #[source]
        source: RenderError,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Something generation skipped or worked around.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("unknown model `{name}` in selection")]
    UnknownEntity { name: String },
    #[error("relation cycle: `{}` emitted before {:?}", .0.entity, .0.waiting_on)]
    Cycle(CycleBreak),
    /// No `@id` field; `surrogate` identifies records instead.
    #[error("model `{entity}` has no @id field; using `{surrogate}`")]
    MissingIdentifier { entity: String, surrogate: String },
    /// No scalar field at all; service and endpoint were skipped.
    #[error("model `{entity}` has no scalar field; skipped service and endpoint")]
    NoIdentifier { entity: String },
    /// The entity produced no artifacts.
    #[error("skipped model `{entity}`: {error}")]
    Build { entity: String, error: BuildError },
    #[error("skipped model `{entity}`: template `{template}`: {message}")]
    Render {
        entity: String,
        template: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub template: TemplateId,
    pub model: ViewModel,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Entities that produced artifacts, in emission order.
    pub generated: Vec<String>,
    pub written: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

/// Everything a run would write, before writing it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub artifacts: Vec<Artifact>,
    pub report: Report,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub ordering: OrderStrategy,
    pub parallel: bool,
    pub artifacts: Vec<ArtifactKind>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            ordering: OrderStrategy::default(),
            parallel: true,
            artifacts: ArtifactKind::ALL.to_vec(),
        }
    }
}

impl GenerateOptions {
    fn enabled(&self, kind: ArtifactKind) -> bool {
        self.artifacts.contains(&kind)
    }
}

struct EntityOutput {
    artifacts: Vec<Artifact>,
    warnings: Vec<Warning>,
}

pub struct Generator<'a> {
    naming: &'a dyn Naming,
    renderer: &'a dyn Renderer,
    writer: &'a dyn FileWriter,
    options: GenerateOptions,
}

impl<'a> Generator<'a> {
    pub fn new(naming: &'a dyn Naming, renderer: &'a dyn Renderer, writer: &'a dyn FileWriter) -> Self {
        Self {
            naming,
            renderer,
            writer,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Build and render everything for `selection` without writing.
    pub fn plan(&self, graph: &ModelGraph, selection: &[String]) -> Result<Plan, GenerateError> {
        let mut plan = Plan::default();
        if selection.is_empty() {
            tracing::info!("no models selected; nothing to generate");
            return Ok(plan);
        }

        let selected = graph.select(selection);
        for name in selected.unknown {
            tracing::warn!(model = %name, "unknown model in selection");
            plan.report.warnings.push(Warning::UnknownEntity { name });
        }

        let emission = order::order(&selected.entities, self.options.ordering);
        plan.report
            .warnings
            .extend(emission.cycle_breaks.into_iter().map(Warning::Cycle));

        let outputs = self.map_entities(&emission.entities, |entity| self.entity_artifacts(graph, entity));

        let mut generated: Vec<&Entity> = Vec::with_capacity(outputs.len());
        for (entity, output) in emission.entities.iter().zip(outputs) {
            match output {
                Ok(output) => {
                    generated.push(*entity);
                    plan.artifacts.extend(output.artifacts);
                    plan.report.warnings.extend(output.warnings);
                }
                Err(warning) => {
                    tracing::warn!("{warning}");
                    plan.report.warnings.push(warning);
                }
            }
        }

        let index = IndexModel::build(&generated, self.naming);
        if self.options.enabled(ArtifactKind::Validation) {
            plan.artifacts
                .push(self.index_artifact(TemplateId::ValidationIndex, "validation/index", &index)?);
        }
        if self.options.enabled(ArtifactKind::Ui) {
            plan.artifacts
                .push(self.index_artifact(TemplateId::UiResources, "ui/resources", &index)?);
        }

        plan.report.generated = generated.iter().map(|e| e.name.clone()).collect();
        Ok(plan)
    }

    /// Plan, then write every artifact in emission order.
    pub fn run(&self, graph: &ModelGraph, selection: &[String]) -> Result<Report, GenerateError> {
        let Plan { artifacts, mut report } = self.plan(graph, selection)?;
        for artifact in artifacts {
            self.writer
                .write(&artifact.path, &artifact.content)
                .map_err(|source| GenerateError::Write {
                    path: artifact.path.clone(),
                    source,
                })?;
            tracing::info!(path = %artifact.path.display(), "wrote artifact");
            report.written.push(artifact.path);
        }
        Ok(report)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn map_entities<T, F>(&self, entities: &[&Entity], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Entity) -> T + Sync + Send,
    {
        if self.options.parallel {
            entities.par_iter().map(|&e| f(e)).collect()
        } else {
            entities.iter().map(|&e| f(e)).collect()
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn map_entities<T, F>(&self, entities: &[&Entity], f: F) -> Vec<T>
    where
        F: Fn(&Entity) -> T,
    {
        entities.iter().map(|&e| f(e)).collect()
    }

    /// All artifacts of one entity, or the warning that skipped it.
    fn entity_artifacts(&self, graph: &ModelGraph, entity: &Entity) -> Result<EntityOutput, Warning> {
        let names = Names::new(self.naming, &entity.name);
        let mut warnings = Vec::new();
        let mut models: Vec<(TemplateId, String, ViewModel)> = Vec::new();

        let build_failed = |error: BuildError| Warning::Build {
            entity: entity.name.clone(),
            error,
        };

        let identifier = view::identifier(entity);
        let note = match &identifier {
            Some(id) if id.surrogate => Some(Warning::MissingIdentifier {
                entity: entity.name.clone(),
                surrogate: id.field.clone(),
            }),
            Some(_) => None,
            None => Some(Warning::NoIdentifier {
                entity: entity.name.clone(),
            }),
        };
        if let Some(note) = note {
            tracing::warn!("{note}");
            warnings.push(note);
        }

        if self.options.enabled(ArtifactKind::Validation) {
            let model = validation::build(graph, entity, self.naming).map_err(build_failed)?;
            models.push((
                TemplateId::Validation,
                format!("validation/{}", names.file_stem),
                ViewModel::Validation(model),
            ));
        }

        if let Some(id) = &identifier {
            if self.options.enabled(ArtifactKind::Service) {
                let model = service::build(graph, entity, self.naming).map_err(build_failed)?;
                models.push((
                    TemplateId::Service,
                    format!("services/{}", names.file_stem),
                    ViewModel::Service(model),
                ));
            }
            if self.options.enabled(ArtifactKind::Endpoint) {
                let model = endpoint::build(entity, self.naming).map_err(build_failed)?;
                models.push((
                    TemplateId::EndpointCollection,
                    format!("api/{}/index", names.resource),
                    ViewModel::Endpoint(model.clone()),
                ));
                models.push((
                    TemplateId::EndpointItem,
                    format!("api/{}/[{}]", names.resource, id.field),
                    ViewModel::Endpoint(model),
                ));
            }
        }

        if self.options.enabled(ArtifactKind::Ui) {
            let model = ui::build(graph, entity, self.naming).map_err(build_failed)?;
            models.push((
                TemplateId::UiFields,
                format!("ui/{}", names.file_stem),
                ViewModel::Ui(model),
            ));
        }

        let mut artifacts = Vec::with_capacity(models.len());
        for (template, stem, model) in models {
            let content = self
                .renderer
                .render(template, &model)
                .map_err(|err| Warning::Render {
                    entity: entity.name.clone(),
                    template: template.as_str(),
                    message: err.to_string(),
                })?;
            artifacts.push(Artifact {
                path: self.path(&stem),
                template,
                model,
                content,
            });
        }

        Ok(EntityOutput {
            artifacts,
            warnings,
        })
    }

    fn index_artifact(
        &self,
        template: TemplateId,
        stem: &str,
        index: &IndexModel,
    ) -> Result<Artifact, GenerateError> {
        let model = ViewModel::Index(index.clone());
        let content = self
            .renderer
            .render(template, &model)
            .map_err(|source| GenerateError::Render {
                template: template.as_str(),
                source,
            })?;
        Ok(Artifact {
            path: self.path(stem),
            template,
            model,
            content,
        })
    }

    fn path(&self, stem: &str) -> PathBuf {
        PathBuf::from(format!("{stem}.{}", self.renderer.extension()))
    }
}
