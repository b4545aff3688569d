//! Table and field editing flows
//!
//! [`Designer`] is the session object a front end talks to. It owns the
//! [`Schema`], the [`SchemaStore`] it persists to and a [`Notifier`]. Every
//! flow validates locally first, then mutates the schema and persists; any
//! error is both returned and reported as an error notification.

use std::collections::HashSet;

use crate::core::canvas::{CanvasState, LoadedCanvas};
use crate::core::cascade::CascadeEngine;
use crate::core::codegen::GeneratorKind;
use crate::core::connections::ConnectionManager;
use crate::core::error::{CanvasError, DesignerError, IntegrityError, StoreError, ValidationError};
use crate::core::notifications::{Notification, Notifier, TracingNotifier};
use crate::core::persistence::{PendingOp, PendingOps, SchemaStore};
use crate::core::schema::{Field, FieldId, FieldRef, Position, Schema, Table, TableId};
use crate::core::validation::{ValidationResult, validate_identifier, validate_table};

pub const ZOOM_MIN: f64 = 0.6;
pub const ZOOM_MAX: f64 = 1.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Clamp to the supported range and snap to the zoom step
pub fn normalize_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return ZOOM_MAX;
    }
    // one decimal, the size of ZOOM_STEP
    (zoom.clamp(ZOOM_MIN, ZOOM_MAX) * 10.0).round() / 10.0
}

pub struct Designer<S: SchemaStore> {
    schema: Schema,
    store: S,
    notifier: Box<dyn Notifier + Send + Sync>,
}

impl<S: SchemaStore> Designer<S> {
    /// Designer with an empty schema reporting through `tracing`
    pub fn new(store: S) -> Self {
        Self::with_notifier(store, TracingNotifier)
    }

    pub fn with_notifier(store: S, notifier: impl Notifier + Send + Sync + 'static) -> Self {
        Self {
            schema: Schema::new(),
            store,
            notifier: Box::new(notifier),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    /// Report a failed flow and hand the result back unchanged
    fn report<T>(&self, result: Result<T, DesignerError>) -> Result<T, DesignerError> {
        if let Err(e) = &result {
            if e.is_persistence_failure() {
                tracing::error!(title = e.title(), "{}", e);
            } else {
                tracing::warn!(title = e.title(), "{}", e);
            }
            self.notify(Notification::from_error(e));
        }
        result
    }

    /// Turn validation errors into an `Err` and warnings into notifications
    fn check(&self, result: ValidationResult) -> Result<(), DesignerError> {
        result.to_result()?;
        for warning in &result.warnings {
            self.notify(Notification::warning("Check name", warning.to_string()));
        }
        Ok(())
    }

    fn table_names_except<'a>(&'a self, id: Option<&'a TableId>) -> impl Iterator<Item = &'a str> + 'a {
        self.schema
            .tables()
            .filter(move |t| Some(&t.id) != id)
            .map(|t| t.name.as_str())
    }

    // ------------------------------------------------------------------
    // Loading and clearing
    // ------------------------------------------------------------------

    /// Replace the schema with the store's snapshot. Returns the table count.
    pub async fn load(&mut self) -> Result<usize, DesignerError> {
        let result = self.try_load().await;
        self.report(result)
    }

    async fn try_load(&mut self) -> Result<usize, DesignerError> {
        if !self.store.is_ready().await {
            return Err(StoreError::NotReady.into());
        }
        let state = self.store.get().await?.ok_or(StoreError::Missing)?;
        let loaded = state.into_schema()?;
        Ok(self.install(loaded))
    }

    fn install(&mut self, loaded: LoadedCanvas) -> usize {
        for (foreign, target) in &loaded.dangling {
            self.notify(Notification::warning(
                "Reference dropped",
                format!("{} pointed at missing or invalid field {}", foreign, target),
            ));
        }
        self.schema = loaded.schema;
        tracing::info!(tables = self.schema.table_count(), "Schema loaded");
        self.schema.table_count()
    }

    /// Drop every table here and in the store
    pub async fn clear(&mut self) -> Result<(), DesignerError> {
        self.schema.clear();
        let result = self.store.clear().await.map_err(DesignerError::from);
        if result.is_ok() {
            tracing::info!("Canvas cleared");
        }
        self.report(result)
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// Validate and persist a new table. Returns its permanent id.
    ///
    /// Drafts carry transient ids (the names); they are rewritten to the
    /// ids the store hands out. References are only made through
    /// [`Designer::connect`], so any pk_ref in the draft is dropped.
    pub async fn create_table(&mut self, draft: Table) -> Result<TableId, DesignerError> {
        let result = self.try_create_table(draft).await;
        self.report(result)
    }

    async fn try_create_table(&mut self, mut draft: Table) -> Result<TableId, DesignerError> {
        self.check(validate_table(&draft, self.table_names_except(None)))?;

        for field in draft.fields.values_mut() {
            field.pk_ref = None;
        }
        let transient = draft.id.clone();
        self.schema.insert_table(draft)?;

        let created = {
            let Some(table) = self.schema.table(&transient) else {
                return Err(IntegrityError::TableNotFound(transient).into());
            };
            self.store.create_table(table).await
        };
        let created = match created {
            Ok(created) => created,
            Err(e) => {
                // never stored, nothing can reference it yet
                self.schema.remove_table(&transient)?;
                return Err(e.into());
            }
        };

        self.schema.rekey_table(&transient, created.id.clone())?;
        // names are unique within a table, the store may reorder fields
        let rekeys: Vec<(FieldRef, FieldId)> = match self.schema.table(&created.id) {
            Some(table) => created
                .fields()
                .filter_map(|field| {
                    let draft_field = table.field_by_name(&field.name)?;
                    let old = FieldRef::new(created.id.clone(), draft_field.id.clone());
                    Some((old, field.id.clone()))
                })
                .collect(),
            None => Vec::new(),
        };
        for (old, id) in rekeys {
            self.schema.rekey_field(&old, id)?;
        }

        tracing::info!(table_id = %created.id, name = %created.name, "Table created");
        self.notify(Notification::success("Table", format!("{} added!", created.name)));
        Ok(created.id)
    }

    /// Apply an edited copy of a table.
    ///
    /// Fields are matched by id: known ids are updated, unknown ones are
    /// created and missing ones are deleted with their references cleared.
    pub async fn update_table(&mut self, table_id: &TableId, draft: Table) -> Result<usize, DesignerError> {
        let result = self.try_update_table(table_id, draft).await;
        self.report(result)
    }

    async fn try_update_table(&mut self, table_id: &TableId, draft: Table) -> Result<usize, DesignerError> {
        let current = self
            .schema
            .table(table_id)
            .ok_or_else(|| IntegrityError::TableNotFound(table_id.clone()))?;
        self.check(validate_table(&draft, self.table_names_except(Some(table_id))))?;

        let mut ops = PendingOps::new();
        let mut kept_ids = HashSet::new();

        for field in draft.fields() {
            let Some(existing) = current.field(&field.id) else {
                let mut field = field.clone();
                field.pk_ref = None;
                ops.push(PendingOp::CreateField {
                    table_id: table_id.clone(),
                    field,
                });
                continue;
            };
            kept_ids.insert(existing.id.clone());

            let field_ref = existing.field_ref();
            let mut update = field.clone();
            if self.schema.has_relations(&field_ref) {
                for conflict in pinned_by_relations(existing, &mut update) {
                    tracing::warn!(%field_ref, "{}", conflict);
                    self.notify(Notification::warning("Existing relations", conflict.to_string()));
                }
            }
            if !existing.is_equal_with(&update) {
                ops.push(PendingOp::UpdateField { field_ref, update });
            }
        }

        for field in current.fields().filter(|f| !kept_ids.contains(&f.id)) {
            let plan = CascadeEngine::plan_delete_field(&self.schema, &field.field_ref())?;
            ops.extend(plan.iter().cloned());
        }

        let renamed = current.name != draft.name;
        let moved = current.position != draft.position;
        let new_name = draft.name.clone();
        if renamed || moved {
            ops.push(PendingOp::UpdateTable {
                table_id: table_id.clone(),
                also_update_fields: false,
            });
        }

        // header changes are in memory before the store sees the table
        if renamed {
            self.schema.rename_table(table_id, new_name)?;
        }
        if moved {
            self.schema.set_position(table_id, draft.position)?;
        }

        let steps = ops.run("Update table", &mut self.schema, &self.store).await?;
        tracing::info!(%table_id, steps, "Table updated");
        self.notify(Notification::success("Table", "Table updated!"));
        Ok(steps)
    }

    pub async fn rename_table(&mut self, table_id: &TableId, name: &str) -> Result<(), DesignerError> {
        let result = self.try_rename_table(table_id, name).await;
        self.report(result)
    }

    async fn try_rename_table(&mut self, table_id: &TableId, name: &str) -> Result<(), DesignerError> {
        if self.schema.table(table_id).is_none() {
            return Err(IntegrityError::TableNotFound(table_id.clone()).into());
        }
        self.check(validate_identifier(name))?;
        if self.table_names_except(Some(table_id)).any(|n| n == name) {
            return Err(ValidationError::DuplicateTableName(name.to_string()).into());
        }

        self.schema.rename_table(table_id, name)?;
        self.persist_table(table_id, false).await?;
        tracing::info!(%table_id, name, "Table renamed");
        Ok(())
    }

    /// Store a new canvas position for a table
    pub async fn move_table(&mut self, table_id: &TableId, position: Position) -> Result<(), DesignerError> {
        let result = self.try_move_table(table_id, position).await;
        self.report(result)
    }

    async fn try_move_table(&mut self, table_id: &TableId, position: Position) -> Result<(), DesignerError> {
        self.schema.set_position(table_id, position)?;
        self.persist_table(table_id, false).await
    }

    pub async fn delete_table(&mut self, table_id: &TableId) -> Result<(), DesignerError> {
        let name = self.schema.table(table_id).map(|t| t.name.clone());
        let result = CascadeEngine::delete_table(&mut self.schema, &self.store, table_id).await;
        if result.is_ok() {
            let name = name.unwrap_or_else(|| table_id.to_string());
            tracing::info!(%table_id, "Table deleted");
            self.notify(Notification::success("Table", format!("{} deleted!", name)));
        }
        self.report(result.map(|_| ()))
    }

    async fn persist_table(&self, table_id: &TableId, also_update_fields: bool) -> Result<(), DesignerError> {
        let table = self
            .schema
            .table(table_id)
            .ok_or_else(|| IntegrityError::TableNotFound(table_id.clone()))?;
        self.store.update_table(table, also_update_fields).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    /// Delete a field, clearing every reference to it first. The last field
    /// of a table cannot be deleted.
    pub async fn delete_field(&mut self, field_ref: &FieldRef) -> Result<(), DesignerError> {
        let result = self.try_delete_field(field_ref).await;
        self.report(result)
    }

    async fn try_delete_field(&mut self, field_ref: &FieldRef) -> Result<(), DesignerError> {
        let table = self
            .schema
            .table(&field_ref.table_id)
            .ok_or_else(|| IntegrityError::TableNotFound(field_ref.table_id.clone()))?;
        if table.field(&field_ref.field_id).is_some() && table.field_count() == 1 {
            return Err(ValidationError::NoFields.into());
        }
        let steps = CascadeEngine::delete_field(&mut self.schema, &self.store, field_ref).await?;
        tracing::info!(%field_ref, steps, "Field deleted");
        Ok(())
    }

    /// Swap a field with its neighbour `offset` places away, wrapping at
    /// both ends. Returns false when the table has a single field.
    pub async fn move_field(&mut self, field_ref: &FieldRef, offset: isize) -> Result<bool, DesignerError> {
        let result = self.try_move_field(field_ref, offset).await;
        self.report(result)
    }

    async fn try_move_field(&mut self, field_ref: &FieldRef, offset: isize) -> Result<bool, DesignerError> {
        if !self.schema.move_field(field_ref, offset)? {
            return Ok(false);
        }
        self.persist_table(&field_ref.table_id, true).await?;
        tracing::debug!(%field_ref, offset, "Field moved");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Make `target` a foreign key to the primary field `source`
    pub async fn connect(&mut self, source: &FieldRef, target: &FieldRef) -> Result<(), DesignerError> {
        let result =
            ConnectionManager::connect(&mut self.schema, &self.store, &*self.notifier, source, target).await;
        self.report(result)
    }

    pub async fn disconnect(&mut self, source: &FieldRef, target: &FieldRef) -> Result<bool, DesignerError> {
        let result =
            ConnectionManager::disconnect(&mut self.schema, &self.store, &*self.notifier, source, target)
                .await;
        self.report(result)
    }

    // ------------------------------------------------------------------
    // Zoom
    // ------------------------------------------------------------------

    /// Set and persist the zoom factor. Returns the value actually applied.
    pub async fn set_zoom(&mut self, zoom: f64) -> Result<f64, DesignerError> {
        let zoom = normalize_zoom(zoom);
        self.schema.set_zoom(zoom);
        let result = self.store.update_zoom(zoom).await.map(|_| zoom);
        self.report(result.map_err(DesignerError::from))
    }

    pub async fn zoom_in(&mut self) -> Result<f64, DesignerError> {
        self.set_zoom(self.schema.zoom() + ZOOM_STEP).await
    }

    pub async fn zoom_out(&mut self) -> Result<f64, DesignerError> {
        self.set_zoom(self.schema.zoom() - ZOOM_STEP).await
    }

    // ------------------------------------------------------------------
    // Export, import and code generation
    // ------------------------------------------------------------------

    pub fn export_canvas(&self) -> Result<String, DesignerError> {
        let result = if self.schema.is_empty() {
            Err(CanvasError::Empty)
        } else {
            CanvasState::from_schema(&self.schema).to_json()
        };
        self.report(result.map_err(DesignerError::from))
    }

    /// Replace everything with the canvas in `json` and persist it.
    /// Returns the number of imported tables.
    pub async fn import_canvas(&mut self, json: &str) -> Result<usize, DesignerError> {
        let result = self.try_import_canvas(json).await;
        self.report(result)
    }

    async fn try_import_canvas(&mut self, json: &str) -> Result<usize, DesignerError> {
        // a file that is rejected leaves the canvas alone
        let loaded = CanvasState::from_json(json)?.into_schema()?;
        self.store.clear().await?;

        let tables = self.install(loaded);
        self.schema.rebuild_index();
        self.store.set(&CanvasState::from_schema(&self.schema)).await?;

        tracing::info!(tables, "Canvas imported");
        self.notify(Notification::success("Canvas", format!("Imported {} table(s)", tables)));
        Ok(tables)
    }

    pub fn generate(&self, kind: GeneratorKind) -> Result<String, DesignerError> {
        let result = if self.schema.is_empty() {
            Err(DesignerError::NothingToGenerate)
        } else {
            tracing::info!(generator = %kind, tables = self.schema.table_count(), "Generating code");
            Ok(kind.generate(&self.schema))
        };
        self.report(result)
    }
}

/// Undo the parts of `update` that existing relations do not allow to
/// change: the type (with its size) and the primary key flag.
fn pinned_by_relations(current: &Field, update: &mut Field) -> Vec<IntegrityError> {
    let mut conflicts = Vec::new();
    if update.field_type != current.field_type {
        update.field_type = current.field_type;
        update.size = current.size;
        conflicts.push(IntegrityError::TypeLocked(current.name.clone()));
    }
    if update.primary_key != current.primary_key {
        update.primary_key = current.primary_key;
        update.unique = current.unique;
        update.unique_composite = current.unique_composite;
        update.not_null = current.not_null;
        conflicts.push(IntegrityError::KeyLocked(current.name.clone()));
    }
    conflicts
}
