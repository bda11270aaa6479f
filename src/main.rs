//! schemagen command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use schemagen::config::Config;
use schemagen::generate::{ArtifactKind, DryRunWriter, FileWriter, FsWriter, GenerateOptions, Generator, JsonRenderer};
use schemagen::measure::Table;
use schemagen::naming::EnglishNaming;
use schemagen::order::OrderStrategy;
use schemagen::parser::ParseOptions;
use schemagen::view::identifier;
use schemagen::{Error, Loaded, load, serializer};

/// Schema DSL compiler - derives validation, data-access, endpoint and UI
/// view models from model declarations
#[derive(Parser, Debug)]
#[command(name = "schemagen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (default: schemagen.toml beside the schema)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate artifacts for the selected models
    Generate {
        schema: PathBuf,

        /// Output directory (overrides the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model to generate; repeat for several
        #[arg(short = 'e', long = "entity", value_name = "MODEL")]
        entities: Vec<String>,

        /// Generate every model in the schema
        #[arg(long, conflicts_with = "entities")]
        all: bool,

        /// Log what would be written without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Fail on unclosed models and stray field lines
        #[arg(long)]
        strict: bool,

        /// Emission order: topological or fan-out
        #[arg(long, value_parser = parse_ordering)]
        ordering: Option<OrderStrategy>,

        /// Build models one at a time
        #[arg(long)]
        sequential: bool,

        /// Artifact kind to emit; repeat for several (default: configured set)
        #[arg(short, long = "artifact", value_name = "KIND", value_parser = parse_artifact)]
        artifacts: Vec<ArtifactKind>,
    },
    /// Parse and resolve a schema, then print a summary
    Check {
        schema: PathBuf,

        #[arg(long)]
        strict: bool,
    },
    /// Print the schema in canonical formatting
    Fmt {
        schema: PathBuf,

        /// Rewrite the file in place
        #[arg(short, long)]
        write: bool,
    },
}

fn parse_ordering(s: &str) -> Result<OrderStrategy, String> {
    OrderStrategy::from_str(s).ok_or_else(|| format!("unknown ordering `{s}` (topological, fan-out)"))
}

fn parse_artifact(s: &str) -> Result<ArtifactKind, String> {
    ArtifactKind::from_str(s)
        .ok_or_else(|| format!("unknown artifact `{s}` (validation, service, endpoint, ui)"))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("schemagen={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Generate {
            schema,
            output,
            entities,
            all,
            dry_run,
            strict,
            ordering,
            sequential,
            artifacts,
        } => {
            let config = config_for(cli.config.as_deref(), &schema)?;
            let loaded = load_file(&schema, strict || config.strict)?;

            let selection = if all {
                loaded
                    .graph
                    .entities()
                    .iter()
                    .map(|e| e.name.clone())
                    .collect()
            } else {
                entities
            };
            let options = GenerateOptions {
                ordering: ordering.unwrap_or(config.ordering),
                parallel: config.parallel && !sequential,
                artifacts: if artifacts.is_empty() {
                    config.artifacts.clone()
                } else {
                    artifacts
                },
            };
            let output_dir = output.unwrap_or(config.output_dir);

            let fs_writer;
            let writer: &dyn FileWriter = if dry_run {
                &DryRunWriter
            } else {
                fs_writer = FsWriter::new(&output_dir);
                &fs_writer
            };

            let report = Generator::new(&EnglishNaming, &JsonRenderer, writer)
                .with_options(options)
                .run(&loaded.graph, &selection)?;

            if dry_run {
                eprintln!("{} files would be written", report.written.len());
            } else {
                eprintln!(
                    "Wrote {} files for {} models to {} ({} warnings)",
                    report.written.len(),
                    report.generated.len(),
                    output_dir.display(),
                    report.warnings.len()
                );
            }
            Ok(())
        }
        Command::Check { schema, strict } => {
            let config = config_for(cli.config.as_deref(), &schema)?;
            let loaded = load_file(&schema, strict || config.strict)?;
            print!("{}", summary(&loaded));
            Ok(())
        }
        Command::Fmt { schema, write } => {
            let source = read(&schema)?;
            let formatted = serializer::format_source(&source)?;
            if write {
                if formatted != source {
                    fs::write(&schema, &formatted).map_err(|source| Error::Write {
                        path: schema.clone(),
                        source,
                    })?;
                    tracing::info!(path = %schema.display(), "reformatted");
                }
            } else {
                print!("{formatted}");
            }
            Ok(())
        }
    }
}

fn config_for(explicit: Option<&Path>, schema: &Path) -> Result<Config, Error> {
    let config = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::discover(schema.parent().unwrap_or(Path::new(".")))?,
    };
    Ok(config)
}

fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_file(path: &Path, strict: bool) -> Result<Loaded, Error> {
    let source = read(path)?;
    load(&source, ParseOptions { strict })
}

fn summary(loaded: &Loaded) -> String {
    let mut table = Table::new(["model", "fields", "relations", "identifier"]);
    for entity in loaded.graph.entities() {
        let id = match identifier(entity) {
            Some(id) if id.surrogate => format!("{} (surrogate)", id.field),
            Some(id) => id.field,
            None => "-".to_string(),
        };
        table.push([
            entity.name.clone(),
            entity.fields.len().to_string(),
            entity.relation_fields().count().to_string(),
            id,
        ]);
    }

    let mut out = if table.is_empty() {
        String::from("no models\n")
    } else {
        table.render()
    };
    out.push_str(&format!(
        "\n{} models, {} relations, {} enums\n",
        loaded.graph.entities().len(),
        loaded.graph.relations().len(),
        loaded.graph.enums().len()
    ));
    out
}
