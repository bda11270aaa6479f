//! Canonical formatting of schema source.
//!
//! Model blocks are rewritten field by field with aligned columns; every
//! other line (enums, datasources, comments outside models) passes through.
//! Formatting never adds or removes lines, so line numbers survive.

use crate::ast::Field;
use crate::lexer::{self, BlockKeyword, Line, RelationClause};
use crate::measure;
use crate::parser::{self, ParseError};

const INDENT: &str = "  ";

enum Pending {
    Row([String; 4]),
    Verbatim(String),
}

/// Reformat `source`. Fails with the same errors as parsing it.
pub fn format_source(source: &str) -> Result<String, ParseError> {
    parser::parse(source)?;

    let mut out = String::with_capacity(source.len());
    let mut block: Option<Vec<Pending>> = None;

    for raw in source.lines() {
        let line = lexer::classify(raw);
        let Some(pending) = block.as_mut() else {
            match line {
                Line::Open { keyword, name } => block = open(&mut out, keyword, name, raw),
                _ => {
                    out.push_str(raw.trim_end());
                    out.push('\n');
                }
            }
            continue;
        };

        match line {
            Line::Close => {
                flush(&mut out, pending);
                out.push('}');
                push_comment(&mut out, raw);
                block = None;
            }
            Line::Field(text) => pending.push(Pending::Row(field_row(text)?)),
            Line::Blank => pending.push(Pending::Verbatim(String::new())),
            Line::Comment | Line::Attribute => {
                pending.push(Pending::Verbatim(format!("{INDENT}{}", raw.trim())));
            }
            Line::Other => pending.push(Pending::Verbatim(raw.trim_end().to_string())),
            Line::Open { keyword, name } => {
                // previous model never closed
                flush(&mut out, pending);
                block = open(&mut out, keyword, name, raw);
            }
        }
    }
    if let Some(pending) = &mut block {
        flush(&mut out, pending);
    }
    Ok(out)
}

fn open(out: &mut String, keyword: BlockKeyword, name: &str, raw: &str) -> Option<Vec<Pending>> {
    if keyword == BlockKeyword::Model {
        out.push_str(&format!("model {name} {{"));
        push_comment(out, raw);
        Some(Vec::new())
    } else {
        out.push_str(raw.trim_end());
        out.push('\n');
        None
    }
}

/// Finish a block delimiter line, keeping its trailing comment.
fn push_comment(out: &mut String, raw: &str) {
    if let (_, Some(comment)) = lexer::split_trailing_comment(raw.trim()) {
        out.push(' ');
        out.push_str(comment);
    }
    out.push('\n');
}

fn flush(out: &mut String, pending: &mut Vec<Pending>) {
    let rows: Vec<&[String; 4]> = pending
        .iter()
        .filter_map(|p| match p {
            Pending::Row(row) => Some(row),
            Pending::Verbatim(_) => None,
        })
        .collect();
    let table: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| row.iter().map(String::as_str).collect())
        .collect();
    let mut aligned = measure::align(&table, 1).into_iter();

    for p in pending.drain(..) {
        match p {
            Pending::Row(_) => {
                if let Some(line) = aligned.next() {
                    out.push_str(INDENT);
                    out.push_str(&line);
                }
            }
            Pending::Verbatim(text) => out.push_str(&text),
        }
        out.push('\n');
    }
}

/// Name, type, attributes and trailing comment of one field line.
fn field_row(text: &str) -> Result<[String; 4], ParseError> {
    let parsed = lexer::parse_field(text).map_err(|source| ParseError::Field {
        line: 0,
        text: text.trim().to_string(),
        source,
    })?;
    let (_, comment) = lexer::split_trailing_comment(text);

    let mut attributes = field_attributes(&parsed.field);
    attributes.extend(parsed.other_attributes);
    if let Some(clause) = &parsed.clause {
        attributes.push(relation_attribute(clause));
    }

    Ok([
        parsed.field.name,
        parsed.field.raw_type,
        attributes.join(" "),
        comment.map(|c| c.trim_end().to_string()).unwrap_or_default(),
    ])
}

/// Recognized attributes in canonical order.
pub fn field_attributes(field: &Field) -> Vec<String> {
    let mut attrs = Vec::new();
    if field.is_id {
        attrs.push("@id".to_string());
    }
    if field.is_unique {
        attrs.push("@unique".to_string());
    }
    if let Some(generator) = &field.generated_by {
        attrs.push(format!("@default({generator})"));
    }
    if field.is_created_at {
        attrs.push("@default(now())".to_string());
    }
    if let Some(value) = &field.default {
        attrs.push(format!("@default({value})"));
    }
    if field.is_updated_at {
        attrs.push("@updatedAt".to_string());
    }
    attrs
}

pub fn relation_attribute(clause: &RelationClause) -> String {
    let mut args = Vec::new();
    if let Some(name) = &clause.name {
        args.push(format!("\"{name}\""));
    }
    if !clause.fields.is_empty() {
        args.push(format!("fields: [{}]", clause.fields.join(", ")));
    }
    if !clause.references.is_empty() {
        args.push(format!("references: [{}]", clause.references.join(", ")));
    }
    if let Some(action) = &clause.restrictions.on_delete {
        args.push(format!("onDelete: {action}"));
    }
    if let Some(action) = &clause.restrictions.on_update {
        args.push(format!("onUpdate: {action}"));
    }

    if args.is_empty() {
        "@relation".to_string()
    } else {
        format!("@relation({})", args.join(", "))
    }
}
