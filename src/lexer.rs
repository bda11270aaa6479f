//! Line classifier and field-line parser.
//!
//! The schema language is line oriented: every physical line is classified on
//! its own, and field lines are split into a [`Field`] plus an optional
//! relation clause. Grouping lines into entities is the parser's job.

use crate::ast::{Field, FieldRelation, Restrictions, strip_type_markers};
use crate::scalar::ScalarType;

const RELATION_MARKER: &str = "@relation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKeyword {
    Model,
    Enum,
    Datasource,
    Generator,
    Type,
    View,
}

impl BlockKeyword {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "model" => Some(Self::Model),
            "enum" => Some(Self::Enum),
            "datasource" => Some(Self::Datasource),
            "generator" => Some(Self::Generator),
            "type" => Some(Self::Type),
            "view" => Some(Self::View),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Enum => "enum",
            Self::Datasource => "datasource",
            Self::Generator => "generator",
            Self::Type => "type",
            Self::View => "view",
        }
    }
}

/// Classification of one physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Comment,
    /// Bare attribute line such as `@@index([a, b])`.
    Attribute,
    Open { keyword: BlockKeyword, name: &'a str },
    Close,
    /// Indented line, handed to [`parse_field`] when inside an entity.
    Field(&'a str),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("Missing type for field `{0}`")]
    MissingType(String),
    #[error("Invalid field name: {0}")]
    InvalidName(String),
    #[error("Unbalanced brackets in relation clause")]
    UnbalancedBrackets,
    #[error("Expected `[` after `{0}:`")]
    ExpectedList(&'static str),
    #[error("Unterminated string")]
    UnterminatedString,
}

/// Relation attribute clause as written on a relation field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationClause {
    pub name: Option<String>,
    pub fields: Vec<String>,
    pub references: Vec<String>,
    pub restrictions: Restrictions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedField {
    pub field: Field,
    pub clause: Option<RelationClause>,
    /// Attributes with no meaning here (`@map`, `@db.*`), kept verbatim.
    pub other_attributes: Vec<String>,
}

pub fn classify(raw: &str) -> Line<'_> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if trimmed.starts_with("//") {
        return Line::Comment;
    }
    if trimmed.starts_with('@') {
        return Line::Attribute;
    }
    let (code, _) = split_trailing_comment(trimmed);
    let code = code.trim_end();
    if code == "}" {
        return Line::Close;
    }
    if is_indented(raw) {
        return Line::Field(raw);
    }

    let mut tokens = code.split_whitespace();
    let keyword = tokens.next().and_then(BlockKeyword::from_str);
    let name = tokens.next().map(|n| n.trim_end_matches('{'));
    match (keyword, name) {
        (Some(keyword), Some(name)) if !name.is_empty() && code.ends_with('{') => {
            Line::Open { keyword, name }
        }
        _ => Line::Other,
    }
}

fn is_indented(raw: &str) -> bool {
    raw.starts_with("  ") || raw.starts_with('\t')
}

/// Parse one field line. The caller has already filtered blank, comment and
/// attribute-only lines.
pub fn parse_field(raw: &str) -> Result<ParsedField, LexError> {
    let (line, _) = split_trailing_comment(raw);
    let tokens = split_tokens(line)?;

    let name = match tokens.first() {
        Some(n) if is_ident(n) => (*n).to_string(),
        Some(n) => return Err(LexError::InvalidName((*n).to_string())),
        None => return Err(LexError::InvalidName(String::new())),
    };
    let raw_type = match tokens.get(1) {
        Some(t) => (*t).to_string(),
        None => return Err(LexError::MissingType(name)),
    };

    let rest = &tokens[2..];
    let (attributes, clause_tokens) = match rest.iter().position(|t| t.starts_with(RELATION_MARKER)) {
        Some(i) => {
            let end = i + clause_len(&rest[i..]);
            let attributes: Vec<&str> = rest[..i].iter().chain(&rest[end..]).copied().collect();
            (attributes, Some(&rest[i..end]))
        }
        None => (rest.to_vec(), None),
    };

    let is_list = raw_type.ends_with("[]");
    let is_required = !raw_type.ends_with('?');
    let is_id = attributes.contains(&"@id");
    let is_unique = attributes.contains(&"@unique");
    let is_updated_at = attributes.contains(&"@updatedAt");
    let is_created_at = attributes.contains(&"@default(now())");
    let generated_by = attributes
        .iter()
        .find(|a| is_generated_default(a))
        .and_then(|a| default_argument(a))
        .map(str::to_string);
    let is_generated = generated_by.is_some();
    let default = attributes
        .iter()
        .filter(|a| !is_generated_default(a) && **a != "@default(now())")
        .find_map(|a| default_argument(a))
        .map(str::to_string);

    let other_attributes = attributes
        .iter()
        .filter(|a| !is_known_attribute(a))
        .map(|a| a.to_string())
        .collect();

    let is_relation = ScalarType::from_str(strip_type_markers(&raw_type)).is_none();
    let clause = match clause_tokens {
        Some(tokens) => Some(parse_relation_clause(&tokens.join(" "))?),
        None => None,
    };
    if clause.is_some() && !is_relation {
        tracing::warn!(field = %name, "relation clause on scalar field ignored");
    }

    let field = Field {
        name,
        raw_type,
        is_list,
        is_required,
        is_unique,
        is_id,
        is_generated,
        is_created_at,
        is_updated_at,
        is_read_only: is_generated || is_created_at || is_updated_at,
        generated_by,
        default,
        relation: if is_relation {
            FieldRelation::Implicit
        } else {
            FieldRelation::None
        },
    };

    Ok(ParsedField {
        field,
        clause: if is_relation { clause } else { None },
        other_attributes,
    })
}

/// Number of tokens making up the `@relation(...)` clause at the head of
/// `tokens`. Runs to the end when the parentheses never close.
fn clause_len(tokens: &[&str]) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    let mut in_string = false;
    for (i, token) in tokens.iter().enumerate() {
        for c in token.chars() {
            match c {
                '"' => in_string = !in_string,
                _ if in_string => {}
                '(' => {
                    depth += 1;
                    opened = true;
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        let continues = !opened && tokens.get(i + 1).is_some_and(|t| t.starts_with('('));
        if depth <= 0 && !in_string && !continues {
            return i + 1;
        }
    }
    tokens.len()
}

fn is_known_attribute(attr: &str) -> bool {
    matches!(attr, "@id" | "@unique" | "@updatedAt") || attr.starts_with("@default(")
}

fn default_argument(attr: &str) -> Option<&str> {
    attr.strip_prefix("@default(")?.strip_suffix(')')
}

fn is_generated_default(attr: &str) -> bool {
    matches!(
        attr,
        "@default(autoincrement())" | "@default(uuid())" | "@default(cuid())"
    ) || attr.starts_with("@default(dbgenerated(")
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Split off a `//` comment that is not inside a string literal.
pub(crate) fn split_trailing_comment(line: &str) -> (&str, Option<&str>) {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => {
                return (&line[..i], Some(&line[i..]));
            }
            _ => {}
        }
        i += 1;
    }
    (line, None)
}

/// Split on whitespace runs, keeping quoted strings in one token.
fn split_tokens(line: &str) -> Result<Vec<&str>, LexError> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(&line[s..i]);
            }
            continue;
        }
        if start.is_none() {
            start = Some(i);
        }
        if c == '"' {
            in_string = true;
        }
    }

    if in_string {
        return Err(LexError::UnterminatedString);
    }
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    Ok(tokens)
}

/// Parse `@relation("Name", fields: [a, b], references: [id], onDelete: Cascade)`.
pub fn parse_relation_clause(clause: &str) -> Result<RelationClause, LexError> {
    check_balanced(clause)?;

    let args = clause
        .strip_prefix(RELATION_MARKER)
        .unwrap_or(clause)
        .trim();
    let args = args
        .strip_prefix('(')
        .and_then(|a| a.strip_suffix(')'))
        .unwrap_or(args);

    let name = leading_name(args);
    let fields = bracket_list(args, "fields")?.unwrap_or_default();
    let references = bracket_list(args, "references")?.unwrap_or_default();
    let restrictions = Restrictions {
        on_update: key_value(args, "onUpdate"),
        on_delete: key_value(args, "onDelete"),
    };

    Ok(RelationClause {
        name,
        fields,
        references,
        restrictions,
    })
}

fn check_balanced(clause: &str) -> Result<(), LexError> {
    let mut stack = Vec::new();
    let mut in_string = false;
    for c in clause.chars() {
        match c {
            '"' => in_string = !in_string,
            _ if in_string => {}
            '[' | '(' => stack.push(c),
            ']' => {
                if stack.pop() != Some('[') {
                    return Err(LexError::UnbalancedBrackets);
                }
            }
            ')' => {
                if stack.pop() != Some('(') {
                    return Err(LexError::UnbalancedBrackets);
                }
            }
            _ => {}
        }
    }
    if stack.is_empty() && !in_string {
        Ok(())
    } else {
        Err(LexError::UnbalancedBrackets)
    }
}

/// Relation name, either positional (`"Name", ...`) or keyed (`name: "Name"`).
fn leading_name(args: &str) -> Option<String> {
    let quoted = if args.starts_with('"') {
        Some(args)
    } else {
        find_key(args, "name").map(|at| args[at..].trim_start())
    }?;
    let inner = quoted.strip_prefix('"')?;
    inner.find('"').map(|end| inner[..end].to_string())
}

/// Byte offset just past `key:`, matching `key` on a word boundary.
fn find_key(args: &str, key: &str) -> Option<usize> {
    for (at, _) in args.match_indices(key) {
        let boundary = args[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        if !boundary {
            continue;
        }
        let after = &args[at + key.len()..];
        let trimmed = after.trim_start();
        if let Some(rest) = trimmed.strip_prefix(':') {
            return Some(args.len() - rest.len());
        }
    }
    None
}

fn bracket_list(args: &str, key: &'static str) -> Result<Option<Vec<String>>, LexError> {
    let Some(at) = find_key(args, key) else {
        return Ok(None);
    };
    let rest = args[at..].trim_start();
    let Some(rest) = rest.strip_prefix('[') else {
        return Err(LexError::ExpectedList(key));
    };
    let end = rest.find(']').ok_or(LexError::UnbalancedBrackets)?;
    let names = rest[..end]
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some(names))
}

fn key_value(args: &str, key: &str) -> Option<String> {
    let at = find_key(args, key)?;
    let rest = &args[at..];
    let end = rest.find([',', ')']).unwrap_or(rest.len());
    let value = rest[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}
