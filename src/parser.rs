use serde::Serialize;

use crate::ast::*;
use crate::lexer::{self, BlockKeyword, LexError, Line};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {source}: `{text}`")]
    Field {
        line: usize,
        text: String,
        #[source]
        source: LexError,
    },
    #[error("line {line}: duplicate field `{field}` in model `{entity}`")]
    DuplicateField {
        line: usize,
        entity: String,
        field: String,
    },
    #[error("{0}")]
    Structural(#[from] StructuralError),
}

/// Malformed document structure. Reported as a warning unless the parser runs
/// in strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralError {
    #[error("line {line}: field line outside any model: `{text}`")]
    OrphanField { line: usize, text: String },
    #[error("line {line}: model `{name}` is never closed")]
    UnclosedEntity { line: usize, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Fail on the first structural problem instead of warning.
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub schema: Schema,
    pub warnings: Vec<StructuralError>,
}

/// Entity being accumulated, with its relations numbered locally until the
/// closing brace commits them to the schema.
struct OpenEntity {
    entity: Entity,
    relations: Vec<RelationInfo>,
}

enum Block {
    None,
    Entity(OpenEntity),
    Skipped,
}

pub struct Parser<'a> {
    source: &'a str,
    options: ParseOptions,
    schema: Schema,
    warnings: Vec<StructuralError>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            options: ParseOptions::default(),
            schema: Schema::default(),
            warnings: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn parse(mut self) -> Result<ParseOutcome, ParseError> {
        let mut block = Block::None;

        for (idx, raw) in self.source.lines().enumerate() {
            let line = idx + 1;
            match lexer::classify(raw) {
                Line::Blank | Line::Comment | Line::Attribute => {}
                Line::Open { keyword, name } => {
                    if let Block::Entity(open) = block {
                        self.unclosed(open)?;
                    }
                    block = match keyword {
                        BlockKeyword::Model => Block::Entity(OpenEntity {
                            entity: Entity {
                                name: name.to_string(),
                                line,
                                fields: Vec::new(),
                            },
                            relations: Vec::new(),
                        }),
                        other => {
                            if other == BlockKeyword::Enum {
                                self.schema.enums.push(name.to_string());
                            }
                            tracing::debug!(line, block = other.as_str(), name, "skipping block");
                            Block::Skipped
                        }
                    };
                }
                Line::Close => match std::mem::replace(&mut block, Block::None) {
                    Block::Entity(open) => self.close(open),
                    Block::Skipped => {}
                    Block::None => tracing::debug!(line, "stray closing brace"),
                },
                Line::Field(text) => match &mut block {
                    Block::Entity(open) => push_field(open, line, text)?,
                    Block::Skipped => {}
                    Block::None => self.warn(StructuralError::OrphanField {
                        line,
                        text: text.trim().to_string(),
                    })?,
                },
                Line::Other => match block {
                    Block::None => self.warn(StructuralError::OrphanField {
                        line,
                        text: raw.trim().to_string(),
                    })?,
                    _ => tracing::debug!(line, text = raw.trim(), "ignoring unindented line"),
                },
            }
        }

        if let Block::Entity(open) = block {
            self.unclosed(open)?;
        }

        Ok(ParseOutcome {
            schema: self.schema,
            warnings: self.warnings,
        })
    }

    fn close(&mut self, open: OpenEntity) {
        let OpenEntity {
            mut entity,
            relations,
        } = open;
        let offset = self.schema.relations.len();
        for field in &mut entity.fields {
            if let FieldRelation::Bound(RelationId(local)) = field.relation {
                field.relation = FieldRelation::Bound(RelationId(offset + local));
            }
        }
        self.schema.relations.extend(relations);
        tracing::debug!(model = %entity.name, fields = entity.fields.len(), "parsed model");
        self.schema.entities.push(entity);
    }

    fn unclosed(&mut self, open: OpenEntity) -> Result<(), ParseError> {
        self.warn(StructuralError::UnclosedEntity {
            line: open.entity.line,
            name: open.entity.name,
        })
    }

    fn warn(&mut self, warning: StructuralError) -> Result<(), ParseError> {
        if self.options.strict {
            return Err(warning.into());
        }
        tracing::warn!("{warning}");
        self.warnings.push(warning);
        Ok(())
    }
}

fn push_field(open: &mut OpenEntity, line: usize, text: &str) -> Result<(), ParseError> {
    let parsed = lexer::parse_field(text).map_err(|source| ParseError::Field {
        line,
        text: text.trim().to_string(),
        source,
    })?;
    let mut field = parsed.field;

    if open.entity.field(&field.name).is_some() {
        return Err(ParseError::DuplicateField {
            line,
            entity: open.entity.name.clone(),
            field: field.name,
        });
    }

    if let Some(clause) = parsed.clause {
        let id = RelationId(open.relations.len());
        open.relations.push(RelationInfo {
            name: clause.name,
            target: field.base_type().to_string(),
            field: field.name.clone(),
            fields: clause.fields,
            references: clause.references,
            restrictions: clause.restrictions,
            multiple: field.is_list,
            required: field.is_required,
        });
        field.relation = FieldRelation::Bound(id);
    }

    open.entity.fields.push(field);
    Ok(())
}

/// Parse a document with default (lenient) options.
pub fn parse(source: &str) -> Result<ParseOutcome, ParseError> {
    Parser::new(source).parse()
}
