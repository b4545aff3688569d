//! SQLAlchemy declarative classes

use std::borrow::Cow;

use crate::core::codegen::{CodeGenerator, column_size, default_literal};
use crate::core::schema::{Field, FieldType, Schema};

const TEMPLATE: &str = "# Generated by dbdesigner {version}\n\
from sqlalchemy import Column, Date, DateTime, Float, ForeignKey, Integer, Text\n\
from sqlalchemy.orm import declarative_base\n\
\n\
Base = declarative_base()\n\
\n\
\n\
{body}";

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Attributes the declarative base already defines
const DECLARATIVE_ATTRIBUTES: &[&str] = &["metadata", "registry"];

/// Turn a table or field name into a Python identifier
fn python_identifier<'a>(name: &'a str, taken: &[&str]) -> Cow<'a, str> {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if PYTHON_KEYWORDS.contains(&ident.as_str()) || taken.contains(&ident.as_str()) {
        ident.push('_');
    }
    if ident == name {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(ident)
    }
}

pub struct SqlAlchemyGenerator;

impl SqlAlchemyGenerator {
    fn column_type(field_type: FieldType) -> &'static str {
        match field_type {
            FieldType::Text => "Text",
            FieldType::Integer | FieldType::Serial => "Integer",
            FieldType::Float => "Float",
            FieldType::Date => "Date",
            FieldType::DateTime => "DateTime",
        }
    }

    fn column(schema: &Schema, field: &Field) -> String {
        let attribute = python_identifier(&field.name, DECLARATIVE_ATTRIBUTES);
        let mut column = String::new();
        // the column keeps its real name when the attribute had to change
        if attribute != field.name.as_str() {
            column.push_str(&format!("\"{}\", ", field.name));
        }
        column.push_str(Self::column_type(field.field_type));
        if let Some(size) = column_size(field) {
            column.push_str(&format!("({size})"));
        }
        if let Some(target) = &field.pk_ref {
            match schema.resolve(target) {
                Some((table, target_field)) => {
                    column.push_str(&format!(", ForeignKey('{}.{}')", table.name, target_field.name));
                }
                None => {
                    tracing::warn!(field = %field.name, %target, "Skipping unresolved reference");
                }
            }
        }
        if field.primary_key {
            column.push_str(", primary_key=True");
        }
        if field.field_type == FieldType::Serial {
            column.push_str(", autoincrement=True");
        }
        if field.unique {
            column.push_str(", unique=True");
        }
        if field.not_null {
            column.push_str(", nullable=False");
        }
        if let Some(default) = default_literal(field) {
            column.push_str(", default=");
            column.push_str(&default);
        }
        format!("\t{} = Column({})\n", attribute, column)
    }
}

impl CodeGenerator for SqlAlchemyGenerator {
    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn generate_body(&self, schema: &Schema) -> String {
        let mut code = String::new();
        for table in schema.tables() {
            code.push_str(&format!("class {}(Base):\n", python_identifier(&table.name, &[])));
            code.push_str(&format!("\t__tablename__ = \"{}\"\n", table.name));
            for field in table.fields() {
                code.push_str(&Self::column(schema, field));
            }
            code.push('\n');
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{FieldRef, Table};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classes_resolve_foreign_keys_to_names() {
        let schema = Schema::from_tables([
            Table::new("t-customers")
                .with_id("c1")
                .with_field(Field::new("id", FieldType::Serial).with_id("f1").primary_key()),
            Table::new("orders")
                .with_field(Field::new("id", FieldType::Integer).primary_key())
                .with_field(
                    Field::new("customer", FieldType::Integer)
                        .not_null()
                        .references(FieldRef::new("c1", "f1")),
                )
                .with_field(Field::new("note", FieldType::Text).unique().with_default("none")),
        ])
        .unwrap();

        let body = SqlAlchemyGenerator.generate_body(&schema);
        assert_eq!(
            body,
            "class t_customers(Base):\n\
             \t__tablename__ = \"t-customers\"\n\
             \tid = Column(Integer, primary_key=True, autoincrement=True)\n\
             \n\
             class orders(Base):\n\
             \t__tablename__ = \"orders\"\n\
             \tid = Column(Integer, primary_key=True)\n\
             \tcustomer = Column(Integer, ForeignKey('t-customers.id'), nullable=False)\n\
             \tnote = Column(Text(255), unique=True, default=\"none\")\n\
             \n"
        );
    }

    #[test]
    fn test_names_become_python_identifiers() {
        let schema = Schema::from_tables([Table::new("2024-orders")
            .with_field(Field::new("order-id", FieldType::Integer).primary_key())
            .with_field(Field::new("from", FieldType::Date))
            .with_field(Field::new("metadata", FieldType::Text))
            .with_field(Field::new("total", FieldType::Float))])
        .unwrap();

        let body = SqlAlchemyGenerator.generate_body(&schema);
        assert_eq!(
            body,
            "class _2024_orders(Base):\n\
             \t__tablename__ = \"2024-orders\"\n\
             \torder_id = Column(\"order-id\", Integer, primary_key=True)\n\
             \tfrom_ = Column(\"from\", Date)\n\
             \tmetadata_ = Column(\"metadata\", Text(255))\n\
             \ttotal = Column(Float)\n\
             \n"
        );
    }

    #[test]
    fn test_template_header() {
        let out = SqlAlchemyGenerator.generate(&Schema::new());
        assert!(out.starts_with("# Generated by dbdesigner "));
        assert!(out.contains("Base = declarative_base()"));
    }
}
