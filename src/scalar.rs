//! Scalar type registry.
//!
//! Every primitive type the schema language knows, together with the
//! target-language type, the validator primitive and the UI display kind it
//! maps to. Anything not found here is the name of another entity.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScalarType {
    String,
    Boolean,
    Int,
    BigInt,
    Float,
    Decimal,
    DateTime,
    Json,
    Bytes,
    Unsupported,
}

/// Validator primitive chosen for a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Numeric input, coerced from its string form.
    CoercedNumber,
    /// Boolean input, coerced from its string form.
    CoercedBoolean,
    String,
    /// Accepted as-is, never inspected.
    Opaque,
}

/// How a field is displayed by scaffolded UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    Text,
    Number,
    Boolean,
    Date,
    Relation,
    Unknown,
}

impl ScalarType {
    pub const ALL: [Self; 10] = [
        Self::String,
        Self::Boolean,
        Self::Int,
        Self::BigInt,
        Self::Float,
        Self::Decimal,
        Self::DateTime,
        Self::Json,
        Self::Bytes,
        Self::Unsupported,
    ];

    /// Look up a type token with list/optional markers already stripped.
    ///
    /// `Unsupported("point")` carries an argument; only the part before the
    /// parenthesis takes part in the match.
    pub fn from_str(s: &str) -> Option<Self> {
        let base = s.split('(').next().unwrap_or(s);
        match base {
            "String" => Some(Self::String),
            "Boolean" => Some(Self::Boolean),
            "Int" => Some(Self::Int),
            "BigInt" => Some(Self::BigInt),
            "Float" => Some(Self::Float),
            "Decimal" => Some(Self::Decimal),
            "DateTime" => Some(Self::DateTime),
            "Json" => Some(Self::Json),
            "Bytes" => Some(Self::Bytes),
            "Unsupported" => Some(Self::Unsupported),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Int => "Int",
            Self::BigInt => "BigInt",
            Self::Float => "Float",
            Self::Decimal => "Decimal",
            Self::DateTime => "DateTime",
            Self::Json => "Json",
            Self::Bytes => "Bytes",
            Self::Unsupported => "Unsupported",
        }
    }

    /// Target-language (TypeScript) type.
    pub fn target_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Int | Self::Float | Self::Decimal => "number",
            Self::BigInt => "bigint",
            Self::DateTime => "Date",
            Self::Json => "unknown",
            Self::Bytes => "Buffer",
            Self::Unsupported => "unknown",
        }
    }

    pub fn validator_kind(self) -> ValidatorKind {
        match self {
            Self::Int | Self::BigInt | Self::Float | Self::Decimal => ValidatorKind::CoercedNumber,
            Self::Boolean => ValidatorKind::CoercedBoolean,
            Self::String | Self::DateTime => ValidatorKind::String,
            Self::Json | Self::Bytes | Self::Unsupported => ValidatorKind::Opaque,
        }
    }

    /// Target validator expression for this primitive.
    pub fn validator(self) -> &'static str {
        match self.validator_kind() {
            ValidatorKind::CoercedNumber => "z.coerce.number()",
            ValidatorKind::CoercedBoolean => "z.coerce.boolean()",
            ValidatorKind::String => "z.string()",
            ValidatorKind::Opaque => "z.any()",
        }
    }

    pub fn display_kind(self) -> DisplayKind {
        match self {
            Self::String => DisplayKind::Text,
            Self::Int | Self::BigInt | Self::Float | Self::Decimal => DisplayKind::Number,
            Self::Boolean => DisplayKind::Boolean,
            Self::DateTime => DisplayKind::Date,
            Self::Json | Self::Bytes | Self::Unsupported => DisplayKind::Unknown,
        }
    }
}
