//! Reference clearing on delete
//!
//! Deleting a primary field first detaches every foreign field pointing at it,
//! persisting each detach, and only then removes the field. Deleting a table
//! does the same for all of its primary fields before the table goes.

use crate::core::error::{DesignerError, IntegrityError};
use crate::core::persistence::{PendingOp, PendingOps, SchemaStore};
use crate::core::schema::{FieldRef, Schema, TableId};

pub struct CascadeEngine;

impl CascadeEngine {
    /// Steps to delete one field: clear each referencer, then delete
    pub fn plan_delete_field(schema: &Schema, field_ref: &FieldRef) -> Result<PendingOps, IntegrityError> {
        if schema.field(field_ref).is_none() {
            return Err(IntegrityError::FieldNotFound(field_ref.clone()));
        }

        let mut ops: PendingOps = schema
            .get_referencers(field_ref)
            .into_iter()
            .map(PendingOp::ClearReference)
            .collect();
        ops.push(PendingOp::DeleteField(field_ref.clone()));
        Ok(ops)
    }

    /// Steps to delete a table: clear every external reference into it, then delete
    pub fn plan_delete_table(schema: &Schema, table_id: &TableId) -> Result<PendingOps, IntegrityError> {
        let table = schema
            .table(table_id)
            .ok_or_else(|| IntegrityError::TableNotFound(table_id.clone()))?;

        let mut ops: PendingOps = table
            .primary_fields()
            .flat_map(|field| schema.get_referencers(&field.field_ref()))
            .filter(|referencer| &referencer.table_id != table_id)
            .map(PendingOp::ClearReference)
            .collect();
        ops.push(PendingOp::DeleteTable(table_id.clone()));
        Ok(ops)
    }

    pub async fn delete_field<S: SchemaStore>(
        schema: &mut Schema,
        store: &S,
        field_ref: &FieldRef,
    ) -> Result<usize, DesignerError> {
        let ops = Self::plan_delete_field(schema, field_ref)?;
        tracing::debug!(%field_ref, steps = ops.len(), "Deleting field");
        ops.run("Delete field", schema, store).await
    }

    pub async fn delete_table<S: SchemaStore>(
        schema: &mut Schema,
        store: &S,
        table_id: &TableId,
    ) -> Result<usize, DesignerError> {
        let ops = Self::plan_delete_table(schema, table_id)?;
        tracing::debug!(%table_id, steps = ops.len(), "Deleting table");
        ops.run("Delete table", schema, store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Field, FieldType, Table};

    fn schema() -> Schema {
        Schema::from_tables([
            Table::new("customers")
                .with_field(Field::new("id", FieldType::Serial).primary_key())
                .with_field(Field::new("name", FieldType::Text).with_size(40)),
            Table::new("orders")
                .with_field(Field::new("id", FieldType::Integer).primary_key())
                .with_field(
                    Field::new("customer_id", FieldType::Integer)
                        .references(FieldRef::new("customers", "id")),
                ),
            Table::new("invoices").with_field(
                Field::new("customer_id", FieldType::Integer)
                    .references(FieldRef::new("customers", "id")),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_plan_delete_field_clears_referencers_first() {
        let schema = schema();
        let ops = CascadeEngine::plan_delete_field(&schema, &FieldRef::new("customers", "id")).unwrap();
        let steps: Vec<_> = ops.iter().cloned().collect();
        assert_eq!(
            steps,
            vec![
                PendingOp::ClearReference(FieldRef::new("orders", "customer_id")),
                PendingOp::ClearReference(FieldRef::new("invoices", "customer_id")),
                PendingOp::DeleteField(FieldRef::new("customers", "id")),
            ]
        );
    }

    #[test]
    fn test_plan_delete_plain_field_is_single_step() {
        let schema = schema();
        let ops =
            CascadeEngine::plan_delete_field(&schema, &FieldRef::new("customers", "name")).unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_plan_delete_table() {
        let schema = schema();
        let ops = CascadeEngine::plan_delete_table(&schema, &"customers".into()).unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(
            ops.iter().last(),
            Some(&PendingOp::DeleteTable("customers".into()))
        );

        let ops = CascadeEngine::plan_delete_table(&schema, &"orders".into()).unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_plan_unknown_targets() {
        let schema = schema();
        assert!(CascadeEngine::plan_delete_table(&schema, &"nope".into()).is_err());
        assert!(CascadeEngine::plan_delete_field(&schema, &FieldRef::new("orders", "nope")).is_err());
    }
}
