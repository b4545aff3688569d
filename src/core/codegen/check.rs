//! Syntax check of generated DDL
//!
//! Runs the output through `sqlparser` for the matching dialect so a broken
//! identifier or default shows up before the script reaches a database.

use sqlparser::ast::Statement;
use sqlparser::parser::{Parser, ParserError};

use crate::core::codegen::dialect::Dialect;

/// First syntax error found in a script
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub suggestion: Option<String>,
}

impl SyntaxError {
    /// Message followed by the hint, if there is one
    pub fn format_for_display(&self) -> String {
        match &self.suggestion {
            Some(hint) => format!("{}\n  hint: {}", self.message, hint),
            None => self.message.clone(),
        }
    }
}

pub struct SqlChecker {
    dialect: Dialect,
}

impl SqlChecker {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, ParserError> {
        let dialect = self.dialect.parser_dialect();
        Parser::parse_sql(dialect.as_ref(), sql)
    }

    /// Number of statements on success
    pub fn validate_syntax(&self, sql: &str) -> Result<usize, SyntaxError> {
        match self.parse(sql) {
            Ok(statements) => Ok(statements.len()),
            Err(e) => {
                let message = e.to_string();
                let (line, column) = extract_position_from_error(&message);
                let suggestion = generate_syntax_suggestion(&message);
                tracing::warn!(dialect = self.dialect.name, ?line, ?column, "Generated SQL does not parse: {}", message);
                Err(SyntaxError {
                    message,
                    line,
                    column,
                    suggestion,
                })
            }
        }
    }
}

/// sqlparser reports positions as `... at Line: X, Column: Y`
fn extract_position_from_error(message: &str) -> (Option<usize>, Option<usize>) {
    let number_after = |marker: &str| {
        let start = message.find(marker)? + marker.len();
        let rest = &message[start..];
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        rest[..end].parse::<usize>().ok()
    };
    (number_after("Line: "), number_after("Column: "))
}

fn generate_syntax_suggestion(message: &str) -> Option<String> {
    if message.contains("Expected: identifier") || message.contains("Expected identifier") {
        Some("A table or column name is probably a reserved word or contains '-'.".into())
    } else if message.contains("Expected: )") || message.contains("Expected )") {
        Some("Check the column list and sizes for stray characters.".into())
    } else if message.contains("Expected: an expression") || message.contains("Expected an expression") {
        Some("Check the default values of the table.".into())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let checker = SqlChecker::new(Dialect::mysql());
        let sql = "create table a\n(\n\tid int primary key\n);\n\
                   create table b\n(\n\ta_id int\n);\n\
                   alter table b add constraint fk_b_a foreign key (a_id) references a(id);";
        assert_eq!(checker.validate_syntax(sql), Ok(3));
    }

    #[test]
    fn test_syntax_error_has_position() {
        let checker = SqlChecker::new(Dialect::sqlite());
        let err = checker
            .validate_syntax("create table t\n(\n\tid int,\n\tbad-name int\n);")
            .unwrap_err();
        assert_eq!(err.line, Some(4));
        assert!(err.column.is_some());
    }

    #[test]
    fn test_extract_position() {
        assert_eq!(
            extract_position_from_error("Expected: ), found: x at Line: 3, Column: 12"),
            (Some(3), Some(12))
        );
        assert_eq!(extract_position_from_error("no position"), (None, None));
    }
}
