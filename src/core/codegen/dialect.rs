//! SQL dialect descriptions
//!
//! A dialect is plain data: the raw type for each field type, whether foreign
//! keys are emitted after every `create table`, the constraint syntax and the
//! identifier quote.

use std::borrow::Cow;

use sqlparser::dialect::{Dialect as ParserDialect, MySqlDialect, SQLiteDialect};

use crate::core::schema::FieldType;
use crate::core::validation::is_reserved_keyword;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialectKind {
    MySql,
    Sqlite,
}

/// How a foreign key constraint is written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintSyntax {
    /// `alter table src add constraint fk_src_dst foreign key (..) references dst(..);`
    AlterTable,
    /// `foreign key (..) references dst(..)` inside the create statement
    Inline,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialect {
    pub kind: DialectKind,
    pub name: &'static str,
    pub raw_types: &'static [(FieldType, &'static str)],
    pub defer_foreign_keys: bool,
    pub constraint_syntax: ConstraintSyntax,
    pub identifier_quote: char,
}

const MYSQL_TYPES: &[(FieldType, &str)] = &[
    (FieldType::Text, "varchar"),
    (FieldType::Integer, "int"),
    (FieldType::Float, "float"),
    (FieldType::Date, "date"),
    (FieldType::DateTime, "datetime"),
    (FieldType::Serial, "int auto_increment"),
];

const SQLITE_TYPES: &[(FieldType, &str)] = &[
    (FieldType::Text, "varchar"),
    (FieldType::Integer, "int"),
    (FieldType::Float, "float"),
    (FieldType::Date, "date"),
    (FieldType::DateTime, "datetime"),
    (FieldType::Serial, "integer"),
];

impl Dialect {
    pub fn mysql() -> Self {
        Self {
            kind: DialectKind::MySql,
            name: "MySQL",
            raw_types: MYSQL_TYPES,
            defer_foreign_keys: true,
            constraint_syntax: ConstraintSyntax::AlterTable,
            identifier_quote: '`',
        }
    }

    /// SQLite cannot add constraints to an existing table
    pub fn sqlite() -> Self {
        Self {
            kind: DialectKind::Sqlite,
            name: "SQLite",
            raw_types: SQLITE_TYPES,
            defer_foreign_keys: false,
            constraint_syntax: ConstraintSyntax::Inline,
            identifier_quote: '"',
        }
    }

    pub fn raw_type(&self, field_type: FieldType) -> &'static str {
        self.raw_types
            .iter()
            .find(|(t, _)| *t == field_type)
            .map(|(_, raw)| *raw)
            .unwrap_or("varchar")
    }

    /// Names are written bare unless they hold characters other than ASCII
    /// letters, digits and `_`, start with a digit or are reserved words.
    pub fn quote_identifier<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if is_bare_identifier(name) {
            return Cow::Borrowed(name);
        }
        let q = self.identifier_quote;
        let escaped = name.replace(q, &format!("{q}{q}"));
        Cow::Owned(format!("{q}{escaped}{q}"))
    }

    fn quote_list(&self, names: &[&str]) -> String {
        names
            .iter()
            .map(|name| self.quote_identifier(name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Table and field names are raw, quoting happens here
    pub fn foreign_key_constraint(
        &self,
        source_table: &str,
        source_fields: &[&str],
        target_table: &str,
        target_fields: &[&str],
    ) -> String {
        let constraint = format!("fk_{source_table}_{target_table}");
        let constraint = self.quote_identifier(&constraint);
        let source_table = self.quote_identifier(source_table);
        let target_table = self.quote_identifier(target_table);
        let source_fields = self.quote_list(source_fields);
        let target_fields = self.quote_list(target_fields);
        match self.constraint_syntax {
            ConstraintSyntax::AlterTable => format!(
                "alter table {source_table} add constraint {constraint} \
                 foreign key ({source_fields}) references {target_table}({target_fields});"
            ),
            ConstraintSyntax::Inline => format!(
                "\tforeign key ({source_fields}) references {target_table}({target_fields})"
            ),
        }
    }

    /// sqlparser dialect used to check generated output
    pub fn parser_dialect(&self) -> Box<dyn ParserDialect> {
        match self.kind {
            DialectKind::MySql => Box::new(MySqlDialect {}),
            DialectKind::Sqlite => Box::new(SQLiteDialect {}),
        }
    }
}

fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_reserved_keyword(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_types() {
        assert_eq!(Dialect::mysql().raw_type(FieldType::Text), "varchar");
        assert_eq!(Dialect::mysql().raw_type(FieldType::Serial), "int auto_increment");
        assert_eq!(Dialect::sqlite().raw_type(FieldType::Serial), "integer");
        assert_eq!(Dialect::sqlite().raw_type(FieldType::DateTime), "datetime");
    }

    #[test]
    fn test_constraint_syntax() {
        assert_eq!(
            Dialect::mysql().foreign_key_constraint("orders", &["a", "b"], "customers", &["id", "region"]),
            "alter table orders add constraint fk_orders_customers foreign key (a, b) references customers(id, region);"
        );
        assert_eq!(
            Dialect::sqlite().foreign_key_constraint("orders", &["a"], "customers", &["id"]),
            "\tforeign key (a) references customers(id)"
        );
    }

    #[test]
    fn test_quote_identifier() {
        let mysql = Dialect::mysql();
        assert_eq!(mysql.quote_identifier("customer_id"), "customer_id");
        assert_eq!(mysql.quote_identifier("order-lines"), "`order-lines`");
        assert_eq!(mysql.quote_identifier("order"), "`order`");
        assert_eq!(mysql.quote_identifier("2fa"), "`2fa`");
        assert_eq!(mysql.quote_identifier("odd`name"), "`odd``name`");
        assert_eq!(Dialect::sqlite().quote_identifier("Key"), "\"Key\"");
    }

    #[test]
    fn test_constraint_quotes_names() {
        assert_eq!(
            Dialect::mysql().foreign_key_constraint("order-lines", &["order-id"], "order", &["id"]),
            "alter table `order-lines` add constraint `fk_order-lines_order` foreign key (`order-id`) references `order`(id);"
        );
        assert_eq!(
            Dialect::sqlite().foreign_key_constraint("lines", &["order"], "order", &["id"]),
            "\tforeign key (\"order\") references \"order\"(id)"
        );
    }
}
