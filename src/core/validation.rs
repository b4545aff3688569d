//! Validation of table and field drafts before they reach the schema
//!
//! Names must match `[A-Za-z0-9_-]+`. Length and reserved keywords only warn,
//! since the generated SQL is still accepted by the permissive dialects we emit.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};

use crate::core::error::ValidationError;
use crate::core::schema::{Field, FieldType, Table};

/// Longest identifier MySQL accepts
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Largest size of a Text column
pub const MAX_TEXT_SIZE: u32 = 65535;

/// Accepted layouts for Date defaults
pub const DATE_FORMATS: [&str; 1] = ["%Y-%m-%d"];

/// Accepted layouts for DateTime defaults
pub const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

static RESERVED_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
        "CONSTRAINT", "CREATE", "CROSS", "DATABASE", "DEFAULT", "DELETE", "DESC", "DISTINCT",
        "DROP", "ELSE", "EXISTS", "FOREIGN", "FROM", "GROUP", "HAVING", "IN", "INDEX", "INNER",
        "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "ON", "OR",
        "ORDER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO",
        "UNION", "UNIQUE", "UPDATE", "VALUES", "WHEN", "WHERE", "WITH",
        // type names and MySQL/SQLite specifics
        "AUTO_INCREMENT", "AUTOINCREMENT", "CHAR", "DATE", "DATETIME", "FLOAT", "INT",
        "INTEGER", "PRAGMA", "TEXT", "VARCHAR",
    ]
    .into_iter()
    .collect()
});

/// Errors block the operation, warnings are reported alongside a success
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationError) {
        self.warnings.push(warning);
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// First error, if any
    pub fn to_result(&self) -> Result<(), ValidationError> {
        match self.errors.first() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    pub fn all_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("Error: {}", e))
            .chain(self.warnings.iter().map(|w| format!("Warning: {}", w)))
            .collect()
    }
}

/// Check a table or field name
pub fn validate_identifier(name: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if name.is_empty() {
        result.add_error(ValidationError::Empty);
        return result;
    }

    let invalid: String = name
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-')
        .collect();
    if !invalid.is_empty() {
        result.add_error(ValidationError::InvalidCharacters { invalid });
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        result.add_warning(ValidationError::TooLong {
            max: MAX_IDENTIFIER_LENGTH,
            actual: name.len(),
        });
    }

    if is_reserved_keyword(name) {
        result.add_warning(ValidationError::ReservedKeyword {
            keyword: name.to_string(),
        });
    }

    result
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    validate_identifier(name).to_result()
}

pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(name.to_uppercase().as_str())
}

/// Whether `value` is an acceptable default for a column of `field_type`.
/// Serial columns take no default.
pub fn check_type(field_type: FieldType, value: &str) -> bool {
    let value = value.trim();
    match field_type {
        FieldType::Text => true,
        FieldType::Integer => {
            value.parse::<i64>().is_ok()
                || value
                    .parse::<f64>()
                    .is_ok_and(|n| n.is_finite() && n.fract() == 0.0)
        }
        FieldType::Float => value.parse::<f64>().is_ok_and(f64::is_finite),
        FieldType::Date => {
            let value = unquote(value);
            DATE_FORMATS
                .iter()
                .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        }
        FieldType::DateTime => {
            let value = unquote(value);
            DATETIME_FORMATS
                .iter()
                .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        }
        FieldType::Serial => false,
    }
}

// Dates may already carry the quotes added at generation time
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Text sizes must be within 1..=65535
pub fn check_size(field: &Field) -> Result<(), ValidationError> {
    if field.field_type.is_sized() && !(1..=MAX_TEXT_SIZE).contains(&field.size) {
        return Err(ValidationError::InvalidSize {
            field: field.name.clone(),
            size: field.size,
        });
    }
    Ok(())
}

pub fn check_default(field: &Field) -> Result<(), ValidationError> {
    match field.default_value.as_deref() {
        Some(value) if !value.is_empty() && !check_type(field.field_type, value) => {
            Err(ValidationError::DefaultTypeMismatch {
                value: value.to_string(),
                field_type: field.field_type,
            })
        }
        _ => Ok(()),
    }
}

/// Name, key flags, size and default of a single field
pub fn validate_field(field: &Field) -> ValidationResult {
    let mut result = validate_identifier(&field.name);
    for check in [
        field.check_attributes(),
        check_size(field),
        check_default(field),
    ] {
        if let Err(e) = check {
            result.add_error(e);
        }
    }
    result
}

/// Validate a table draft against the names of the other tables in the schema
pub fn validate_table<'a>(
    table: &Table,
    other_names: impl IntoIterator<Item = &'a str>,
) -> ValidationResult {
    let mut result = validate_identifier(&table.name);

    if other_names.into_iter().any(|n| n == table.name) {
        result.add_error(ValidationError::DuplicateTableName(table.name.clone()));
    }

    if !table.has_fields() {
        result.add_error(ValidationError::NoFields);
    }

    let mut seen = HashSet::new();
    for field in table.fields() {
        if !seen.insert(field.name.as_str()) {
            result.add_error(ValidationError::DuplicateFieldName(field.name.clone()));
        }
        result.merge(validate_field(field));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_name("users").is_ok());
        assert!(validate_name("user_id").is_ok());
        assert!(validate_name("order-lines").is_ok());
        assert!(validate_name("2fa_codes").is_ok());
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(validate_name(""), Err(ValidationError::Empty));
        assert!(validate_name("user name").is_err());
        assert!(validate_name("user.name").is_err());
        assert!(validate_name("tëst").is_err());
        assert_eq!(
            validate_name("a b@c"),
            Err(ValidationError::InvalidCharacters {
                invalid: " @".into()
            })
        );
    }

    #[test]
    fn test_reserved_and_long_names_only_warn() {
        let result = validate_identifier("select");
        assert!(result.is_valid());
        assert!(result.has_warnings());

        let result = validate_identifier(&"a".repeat(65));
        assert!(result.is_valid());
        assert_eq!(
            result.warnings,
            vec![ValidationError::TooLong {
                max: 64,
                actual: 65
            }]
        );
    }

    #[test]
    fn test_check_type() {
        assert!(check_type(FieldType::Text, "anything at all"));
        assert!(check_type(FieldType::Integer, "42"));
        assert!(check_type(FieldType::Integer, "-7"));
        assert!(check_type(FieldType::Integer, "3.0"));
        assert!(!check_type(FieldType::Integer, "3.5"));
        assert!(!check_type(FieldType::Integer, "abc"));
        assert!(check_type(FieldType::Float, "3.5"));
        assert!(check_type(FieldType::Float, "3"));
        assert!(!check_type(FieldType::Float, "NaN"));
        assert!(check_type(FieldType::Date, "2024-02-29"));
        assert!(check_type(FieldType::Date, "\"2024-02-29\""));
        assert!(!check_type(FieldType::Date, "2023-02-29"));
        assert!(check_type(FieldType::DateTime, "2024-01-05 10:30"));
        assert!(check_type(FieldType::DateTime, "2024-01-05 10:30:15"));
        assert!(!check_type(FieldType::DateTime, "2024-01-05"));
        assert!(!check_type(FieldType::Serial, "1"));
    }

    #[test]
    fn test_check_size() {
        assert!(check_size(&Field::new("title", FieldType::Text).with_size(255)).is_ok());
        assert!(check_size(&Field::new("title", FieldType::Text).with_size(0)).is_err());
        assert!(check_size(&Field::new("title", FieldType::Text).with_size(65536)).is_err());
        assert!(check_size(&Field::new("n", FieldType::Integer)).is_ok());
    }

    #[test]
    fn test_validate_field_collects_errors() {
        let field = Field::new("bad name", FieldType::Integer).with_default("x");
        let result = validate_field(&field);
        assert_eq!(result.errors.len(), 2);
        assert!(matches!(
            result.errors[1],
            ValidationError::DefaultTypeMismatch { .. }
        ));
    }

    #[test]
    fn test_validate_table() {
        let table = Table::new("users")
            .with_field(Field::new("id", FieldType::Serial).primary_key())
            .with_field(Field::new("email", FieldType::Text).with_size(120).unique());
        assert!(validate_table(&table, ["orders"]).is_valid());

        assert_eq!(
            validate_table(&table, ["users"]).to_result(),
            Err(ValidationError::DuplicateTableName("users".into()))
        );

        assert_eq!(
            validate_table(&Table::new("empty"), []).to_result(),
            Err(ValidationError::NoFields)
        );
    }

    #[test]
    fn test_duplicate_field_names() {
        let table = Table::new("t")
            .with_field(Field::new("a", FieldType::Integer).with_id("1"))
            .with_field(Field::new("a", FieldType::Integer).with_id("2"));
        assert_eq!(
            validate_table(&table, []).to_result(),
            Err(ValidationError::DuplicateFieldName("a".into()))
        );
    }
}
