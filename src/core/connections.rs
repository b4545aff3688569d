//! Primary key -> foreign key connections
//!
//! [`ConnectionValidator`] decides whether an edge may exist without touching
//! anything. [`ConnectionManager`] applies or removes an edge, persists the
//! foreign field and reports the result.

use crate::core::error::{ConnectionError, DesignerError, IntegrityError};
use crate::core::notifications::{Notification, Notifier};
use crate::core::persistence::SchemaStore;
use crate::core::schema::{FieldRef, Schema};

pub struct ConnectionValidator;

impl ConnectionValidator {
    /// Check a proposed `source` (primary) -> `target` (foreign) edge.
    ///
    /// Rules run in a fixed order and the first failure wins.
    pub fn is_valid_connection(
        schema: &Schema,
        source: &FieldRef,
        target: &FieldRef,
    ) -> Result<(), ConnectionError> {
        let (_, source_field) = schema
            .resolve(source)
            .ok_or_else(|| ConnectionError::Unresolved(source.clone()))?;
        let (target_table, target_field) = schema
            .resolve(target)
            .ok_or_else(|| ConnectionError::Unresolved(target.clone()))?;

        if let Some(current) = &target_field.pk_ref {
            return Err(ConnectionError::AlreadyReferenced {
                foreign: schema.display_name(target),
                current: schema.display_name(current),
            });
        }

        if source == target {
            return Err(ConnectionError::SelfReference);
        }

        if source.table_id == target.table_id {
            return Err(ConnectionError::SameTable);
        }

        if !source_field
            .field_type
            .is_compatible_with(target_field.field_type)
        {
            return Err(ConnectionError::TypeMismatch {
                primary: schema.display_name(source),
                foreign: schema.display_name(target),
                primary_type: source_field.field_type,
                foreign_type: target_field.field_type,
            });
        }

        // only the target table is checked; other tables may reference the same source
        if let Some(existing) = target_table
            .fields()
            .find(|f| f.id != target.field_id && f.pk_ref.as_ref() == Some(source))
        {
            return Err(ConnectionError::Redundant {
                primary: schema.display_name(source),
                existing: schema.display_name(&existing.field_ref()),
            });
        }

        if !source_field.primary_key {
            return Err(ConnectionError::NotPrimary(schema.display_name(source)));
        }

        if target_field.primary_key {
            return Err(ConnectionError::ForeignIsPrimary(schema.display_name(target)));
        }

        Ok(())
    }
}

pub struct ConnectionManager;

impl ConnectionManager {
    /// `"customers.id -> orders.customer_id"`
    pub fn describe(schema: &Schema, source: &FieldRef, target: &FieldRef) -> String {
        format!(
            "{} -> {}",
            schema.display_name(source),
            schema.display_name(target)
        )
    }

    /// Point `target` at `source` and persist the foreign field
    pub async fn connect<S: SchemaStore>(
        schema: &mut Schema,
        store: &S,
        notifier: &dyn Notifier,
        source: &FieldRef,
        target: &FieldRef,
    ) -> Result<(), DesignerError> {
        ConnectionValidator::is_valid_connection(schema, source, target)?;

        schema.set_reference(target, source)?;
        let (table, field) = schema
            .resolve(target)
            .ok_or_else(|| IntegrityError::FieldNotFound(target.clone()))?;
        store.update_field(table, field).await?;

        let description = Self::describe(schema, source, target);
        tracing::info!(%source, %target, "Connection established: {}", description);
        notifier.notify(Notification::success("Connection established", description));
        Ok(())
    }

    /// Clear the reference of `target` to `source`.
    ///
    /// Returns `Ok(false)` without persisting or notifying when `target`
    /// carries no reference.
    pub async fn disconnect<S: SchemaStore>(
        schema: &mut Schema,
        store: &S,
        notifier: &dyn Notifier,
        source: &FieldRef,
        target: &FieldRef,
    ) -> Result<bool, DesignerError> {
        let field = schema
            .field(target)
            .ok_or_else(|| ConnectionError::Unresolved(target.clone()))?;

        match &field.pk_ref {
            None => {
                tracing::debug!(%target, "Nothing to detach");
                return Ok(false);
            }
            Some(current) if current != source => {
                return Err(ConnectionError::NotConnected {
                    primary: schema.display_name(source),
                    foreign: schema.display_name(target),
                }
                .into());
            }
            Some(_) => {}
        }

        let description = Self::describe(schema, source, target);
        schema.clear_reference(target)?;
        let (table, field) = schema
            .resolve(target)
            .ok_or_else(|| IntegrityError::FieldNotFound(target.clone()))?;
        store.update_field(table, field).await?;

        tracing::info!(%source, %target, "Connection detached: {}", description);
        notifier.notify(Notification::success("Detached connection", description));
        Ok(true)
    }
}
