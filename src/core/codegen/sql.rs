//! DDL generation for the SQL dialects

use crate::core::codegen::check::{SqlChecker, SyntaxError};
use crate::core::codegen::dialect::Dialect;
use crate::core::codegen::{CodeGenerator, column_size, default_literal};
use crate::core::schema::{Field, Schema, Table};

const TEMPLATE: &str = "-- Generated by dbdesigner {version}\n\n{body}\n";

/// One resolved reference out of a table, sortable by target
#[derive(Debug)]
struct ForeignKeyColumn<'a> {
    /// `"targetTable.targetField"`, the grouping sort key
    target: String,
    target_table: &'a str,
    target_field: &'a str,
    source_field: &'a str,
}

pub struct SqlGenerator {
    dialect: Dialect,
}

impl SqlGenerator {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn mysql() -> Self {
        Self::new(Dialect::mysql())
    }

    pub fn sqlite() -> Self {
        Self::new(Dialect::sqlite())
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn column_line(&self, field: &Field, single_primary: bool) -> String {
        let mut line = format!(
            "\t{} {}",
            self.dialect.quote_identifier(&field.name),
            self.dialect.raw_type(field.field_type)
        );
        if let Some(size) = column_size(field) {
            line.push_str(&format!("({size})"));
        }
        if field.not_null {
            line.push_str(" not null");
        }
        if field.primary_key && single_primary {
            line.push_str(" primary key");
        }
        if field.unique {
            line.push_str(" unique");
        }
        if let Some(default) = default_literal(field) {
            line.push_str(" default ");
            line.push_str(&default);
        }
        line
    }

    fn foreign_key_columns<'a>(schema: &'a Schema, table: &'a Table) -> Vec<ForeignKeyColumn<'a>> {
        let mut columns: Vec<ForeignKeyColumn<'a>> = table
            .fields()
            .filter_map(|field| {
                let target = field.pk_ref.as_ref()?;
                let Some((target_table, target_field)) = schema.resolve(target) else {
                    tracing::warn!(table = %table.name, field = %field.name, %target, "Skipping unresolved reference");
                    return None;
                };
                Some(ForeignKeyColumn {
                    target: format!("{}.{}", target_table.name, target_field.name),
                    target_table: &target_table.name,
                    target_field: &target_field.name,
                    source_field: &field.name,
                })
            })
            .collect();
        columns.sort_by(|a, b| a.target.cmp(&b.target));
        columns
    }

    /// One constraint per contiguous run of columns pointing at the same table.
    /// Columns are sorted by target first, so composite keys collapse into one.
    fn foreign_key_constraints(&self, schema: &Schema, table: &Table) -> Vec<String> {
        let columns = Self::foreign_key_columns(schema, table);
        let mut constraints = Vec::new();

        for group in columns.chunk_by(|a, b| a.target_table == b.target_table) {
            let source_fields: Vec<&str> = group.iter().map(|c| c.source_field).collect();
            let target_fields: Vec<&str> = group.iter().map(|c| c.target_field).collect();
            let constraint = self.dialect.foreign_key_constraint(
                &table.name,
                &source_fields,
                group[0].target_table,
                &target_fields,
            );
            tracing::debug!(table = %table.name, "Adding constraint: {}", constraint);
            constraints.push(constraint);
        }

        constraints
    }

    fn create_table(&self, schema: &Schema, table: &Table, deferred: &mut Vec<String>) -> String {
        let primary: Vec<_> = table
            .primary_fields()
            .map(|f| self.dialect.quote_identifier(&f.name))
            .collect();
        let single_primary = primary.len() == 1;

        let mut lines: Vec<String> = table
            .fields()
            .map(|field| self.column_line(field, single_primary))
            .collect();

        if primary.len() > 1 {
            lines.push(format!("\tprimary key ({})", primary.join(", ")));
        }

        let constraints = self.foreign_key_constraints(schema, table);
        if self.dialect.defer_foreign_keys {
            deferred.extend(constraints);
        } else {
            lines.extend(constraints);
        }

        format!(
            "create table {}\n(\n{}\n);\n",
            self.dialect.quote_identifier(&table.name),
            lines.join(",\n")
        )
    }

    /// Parse generated DDL with the dialect's parser
    pub fn check(&self, sql: &str) -> Result<usize, SyntaxError> {
        SqlChecker::new(self.dialect.clone()).validate_syntax(sql)
    }
}

impl CodeGenerator for SqlGenerator {
    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn generate_body(&self, schema: &Schema) -> String {
        let mut code = String::new();
        let mut deferred = Vec::new();

        for table in schema.tables() {
            tracing::debug!(dialect = self.dialect.name, "Generating code for table {}", table.name);
            code.push_str(&self.create_table(schema, table, &mut deferred));
        }

        if !deferred.is_empty() {
            code.push_str(&deferred.join("\n"));
            code.push('\n');
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{FieldRef, FieldType};
    use pretty_assertions::assert_eq;

    fn composite_schema() -> Schema {
        Schema::from_tables([
            Table::new("customers")
                .with_field(Field::new("id", FieldType::Serial).primary_key())
                .with_field(Field::new("region", FieldType::Text).with_size(8).primary_key())
                .with_field(Field::new("name", FieldType::Text).not_null().with_default("anon")),
            Table::new("orders")
                .with_field(Field::new("id", FieldType::Integer).primary_key())
                .with_field(
                    Field::new("customer_region", FieldType::Text)
                        .with_size(8)
                        .references(FieldRef::new("customers", "region")),
                )
                .with_field(
                    Field::new("customer_id", FieldType::Integer)
                        .references(FieldRef::new("customers", "id")),
                ),
        ])
        .unwrap()
    }

    #[test]
    fn test_mysql_composite_keys_and_deferred_constraint() {
        let body = SqlGenerator::mysql().generate_body(&composite_schema());
        assert_eq!(
            body,
            "create table customers\n(\n\
             \tid int auto_increment,\n\
             \tregion varchar(8),\n\
             \tname varchar(255) not null default \"anon\",\n\
             \tprimary key (id, region)\n\
             );\n\
             create table orders\n(\n\
             \tid int primary key,\n\
             \tcustomer_region varchar(8),\n\
             \tcustomer_id int\n\
             );\n\
             alter table orders add constraint fk_orders_customers foreign key (customer_id, customer_region) references customers(id, region);\n"
        );
    }

    #[test]
    fn test_sqlite_inlines_constraints() {
        let body = SqlGenerator::sqlite().generate_body(&composite_schema());
        assert!(body.contains(
            "\tcustomer_id int,\n\tforeign key (customer_id, customer_region) references customers(id, region)\n);"
        ));
        assert!(!body.contains("alter table"));
        assert!(body.contains("\tid integer,\n"));
    }

    #[test]
    fn test_separate_targets_get_separate_constraints() {
        let schema = Schema::from_tables([
            Table::new("users").with_field(Field::new("id", FieldType::Integer).primary_key()),
            Table::new("products").with_field(Field::new("id", FieldType::Integer).primary_key()),
            Table::new("reviews")
                .with_field(
                    Field::new("user_id", FieldType::Integer).references(FieldRef::new("users", "id")),
                )
                .with_field(
                    Field::new("product_id", FieldType::Integer)
                        .references(FieldRef::new("products", "id")),
                ),
        ])
        .unwrap();

        let body = SqlGenerator::mysql().generate_body(&schema);
        let constraints: Vec<&str> = body.lines().filter(|l| l.starts_with("alter table")).collect();
        assert_eq!(
            constraints,
            vec![
                "alter table reviews add constraint fk_reviews_products foreign key (product_id) references products(id);",
                "alter table reviews add constraint fk_reviews_users foreign key (user_id) references users(id);",
            ]
        );
    }

    #[test]
    fn test_generation_does_not_mutate_schema() {
        let schema = Schema::from_tables([Table::new("notes")
            .with_field(Field::new("id", FieldType::Integer).primary_key())
            .with_field(Field::new("body", FieldType::Text).with_default("hello"))])
        .unwrap();

        let first = SqlGenerator::mysql().generate_body(&schema);
        let second = SqlGenerator::mysql().generate_body(&schema);
        assert_eq!(first, second);

        let body = schema.table_by_name("notes").unwrap().field_by_name("body").unwrap();
        assert_eq!(body.size, 0);
        assert_eq!(body.default_value.as_deref(), Some("hello"));
    }

    #[test]
    fn test_hyphenated_and_reserved_names_are_quoted() {
        let schema = Schema::from_tables([
            Table::new("order")
                .with_field(Field::new("id", FieldType::Serial).primary_key())
                .with_field(Field::new("key", FieldType::Text).with_size(16)),
            Table::new("order-lines")
                .with_field(Field::new("line-id", FieldType::Integer).primary_key())
                .with_field(Field::new("2nd_pass", FieldType::Integer).primary_key())
                .with_field(
                    Field::new("order-id", FieldType::Integer).references(FieldRef::new("order", "id")),
                ),
        ])
        .unwrap();

        let mysql = SqlGenerator::mysql();
        let body = mysql.generate_body(&schema);
        assert!(body.contains("create table `order`\n(\n\tid int auto_increment primary key,\n\t`key` varchar(16)\n);"));
        assert!(body.contains("\tprimary key (`line-id`, `2nd_pass`)\n"));
        assert!(body.contains(
            "alter table `order-lines` add constraint `fk_order-lines_order` foreign key (`order-id`) references `order`(id);"
        ));

        for (generator, statements) in [(mysql, 3), (SqlGenerator::sqlite(), 2)] {
            let sql = generator.generate(&schema);
            assert_eq!(generator.check(&sql), Ok(statements), "{}", generator.dialect().name);
        }
    }

    #[test]
    fn test_generated_sql_parses() {
        // two create statements, plus the deferred alter for MySQL
        for (generator, statements) in [(SqlGenerator::mysql(), 3), (SqlGenerator::sqlite(), 2)] {
            let sql = generator.generate(&composite_schema());
            assert_eq!(generator.check(&sql), Ok(statements), "{}", generator.dialect().name);
        }
    }
}
