//! Code generation from the schema
//!
//! Every generator is a pure function of the schema: tables and fields are
//! visited in insertion order and references are resolved to names at
//! emission time. Output is wrapped in a per-format header template.

pub mod check;
pub mod dialect;
pub mod orm;
pub mod sql;

use std::fmt;
use std::str::FromStr;

use crate::core::error::ValidationError;
use crate::core::schema::{Field, Schema};

pub use check::{SqlChecker, SyntaxError};
pub use dialect::{ConstraintSyntax, Dialect, DialectKind};
pub use orm::SqlAlchemyGenerator;
pub use sql::SqlGenerator;

/// Crate version written into generated headers
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub trait CodeGenerator {
    /// Header with `{version}` and `{body}` placeholders
    fn template(&self) -> &'static str;

    fn generate_body(&self, schema: &Schema) -> String;

    fn generate(&self, schema: &Schema) -> String {
        self.template()
            .replace("{version}", VERSION)
            .replace("{body}", &self.generate_body(schema))
    }
}

/// Output formats selectable by tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorKind {
    SqlAlchemy,
    MySql,
    Sqlite,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 3] = [
        GeneratorKind::SqlAlchemy,
        GeneratorKind::MySql,
        GeneratorKind::Sqlite,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            GeneratorKind::SqlAlchemy => "ORM/SQLAlchemy",
            GeneratorKind::MySql => "mysql",
            GeneratorKind::Sqlite => "sqlite",
        }
    }

    /// SQL dialect, None for ORM output
    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            GeneratorKind::SqlAlchemy => None,
            GeneratorKind::MySql => Some(Dialect::mysql()),
            GeneratorKind::Sqlite => Some(Dialect::sqlite()),
        }
    }

    pub fn generator(&self) -> Box<dyn CodeGenerator> {
        match self.dialect() {
            Some(dialect) => Box::new(SqlGenerator::new(dialect)),
            None => Box::new(SqlAlchemyGenerator),
        }
    }

    pub fn generate(&self, schema: &Schema) -> String {
        self.generator().generate(schema)
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for GeneratorKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeneratorKind::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownGenerator(s.to_string()))
    }
}

// ============================================================================
// Shared column helpers
// ============================================================================

/// Text columns without a size are emitted as 255
pub const DEFAULT_TEXT_SIZE: u32 = 255;

/// Wrap a literal default in double quotes unless it already is
pub fn quote_default(value: &str) -> String {
    let inner = value.strip_prefix('"').unwrap_or(value);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    format!("\"{inner}\"")
}

/// Size to emit for a column, if any
pub fn column_size(field: &Field) -> Option<u32> {
    if !field.field_type.is_sized() {
        return None;
    }
    Some(if field.size == 0 {
        DEFAULT_TEXT_SIZE
    } else {
        field.size
    })
}

/// Default literal to emit for a column, if any
pub fn default_literal(field: &Field) -> Option<String> {
    let value = field.default_value.as_deref()?;
    if field.field_type.has_literal_default() {
        Some(quote_default(value))
    } else if value.trim().is_empty() {
        None
    } else {
        Some(value.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::FieldType;

    #[test]
    fn test_quote_default_is_idempotent() {
        assert_eq!(quote_default("abc"), "\"abc\"");
        assert_eq!(quote_default("\"abc\""), "\"abc\"");
        assert_eq!(quote_default("\"abc"), "\"abc\"");
        assert_eq!(quote_default("abc\""), "\"abc\"");
        assert_eq!(quote_default(""), "\"\"");
        assert_eq!(quote_default(&quote_default("x")), "\"x\"");
    }

    #[test]
    fn test_column_size() {
        assert_eq!(column_size(&Field::new("t", FieldType::Text)), Some(255));
        assert_eq!(column_size(&Field::new("t", FieldType::Text).with_size(40)), Some(40));
        assert_eq!(column_size(&Field::new("n", FieldType::Integer).with_size(40)), None);
    }

    #[test]
    fn test_default_literal() {
        let date = Field::new("d", FieldType::Date).with_default("2024-01-01");
        assert_eq!(default_literal(&date).as_deref(), Some("\"2024-01-01\""));
        let n = Field::new("n", FieldType::Integer).with_default("5");
        assert_eq!(default_literal(&n).as_deref(), Some("5"));
        let blank = Field::new("n", FieldType::Integer).with_default("");
        assert_eq!(default_literal(&blank), None);
    }

    #[test]
    fn test_generator_tags() {
        assert_eq!("mysql".parse::<GeneratorKind>().unwrap(), GeneratorKind::MySql);
        assert_eq!(
            "ORM/SQLAlchemy".parse::<GeneratorKind>().unwrap(),
            GeneratorKind::SqlAlchemy
        );
        assert_eq!(GeneratorKind::Sqlite.to_string(), "sqlite");
        assert!("postgres".parse::<GeneratorKind>().is_err());
    }

    #[test]
    fn test_generate_wraps_template() {
        let schema = Schema::new();
        let out = GeneratorKind::MySql.generate(&schema);
        assert!(out.contains(VERSION));
        assert!(!out.contains("{body}"));
    }
}
