//! Persistence contract and the ordered execution of dependent writes
//!
//! The engine only talks to storage through [`SchemaStore`]. Multi-step edits
//! (cascading reference clears followed by a delete, field creation followed
//! by a rename) are planned as a [`PendingOps`] list and executed strictly in
//! order; the first failure stops the chain without rolling back.

use async_trait::async_trait;
use derive_more::Display;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::canvas::CanvasState;
use crate::core::error::{DesignerError, IntegrityError, StoreError};
use crate::core::schema::{Field, FieldId, FieldRef, Schema, Table, TableId};

/// Store operation, used in failure messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum StoreOp {
    #[display("create table")]
    CreateTable,
    #[display("update table")]
    UpdateTable,
    #[display("delete table")]
    DeleteTable,
    #[display("create field")]
    CreateField,
    #[display("update field")]
    UpdateField,
    #[display("delete field")]
    DeleteField,
    #[display("update zoom")]
    UpdateZoom,
    #[display("set")]
    Set,
    #[display("clear")]
    Clear,
}

/// Backend the designer persists to.
///
/// Creation calls return the permanent ids chosen by the store; the caller
/// rewrites its in-memory keys afterwards.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn is_ready(&self) -> bool;

    /// Full persisted snapshot, or None when nothing has been stored
    async fn get(&self) -> Result<Option<CanvasState>, StoreError>;

    /// Replace the whole snapshot
    async fn set(&self, state: &CanvasState) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    /// Store a new table with its fields and return it carrying permanent ids
    async fn create_table(&self, table: &Table) -> Result<Table, StoreError>;

    async fn update_table(&self, table: &Table, also_update_fields: bool) -> Result<(), StoreError>;

    async fn delete_table(&self, table: &Table) -> Result<(), StoreError>;

    /// Store a new field of `table` and return its permanent id
    async fn create_field(&self, table: &Table, field: &Field) -> Result<FieldId, StoreError>;

    async fn update_field(&self, table: &Table, field: &Field) -> Result<(), StoreError>;

    async fn delete_field(&self, table: &Table, field: &Field) -> Result<(), StoreError>;

    async fn update_zoom(&self, zoom: f64) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store keeping the snapshot in memory. Ids are UUID v4 strings.
#[derive(Debug)]
pub struct MemoryStore {
    ready: bool,
    state: RwLock<Option<CanvasState>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Ready store holding an empty canvas
    pub fn new() -> Self {
        Self::with_state(CanvasState::default())
    }

    pub fn with_state(state: CanvasState) -> Self {
        Self {
            ready: true,
            state: RwLock::new(Some(state)),
        }
    }

    /// Ready store that has never been written
    pub fn empty() -> Self {
        Self {
            ready: true,
            state: RwLock::new(None),
        }
    }

    /// Store that reports itself as not ready
    pub fn unavailable() -> Self {
        Self {
            ready: false,
            state: RwLock::new(None),
        }
    }

    pub async fn snapshot(&self) -> Option<CanvasState> {
        self.state.read().await.clone()
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    async fn write<T: Send>(
        &self,
        op: StoreOp,
        f: impl FnOnce(&mut CanvasState) -> Result<T, String> + Send,
    ) -> Result<T, StoreError> {
        if !self.ready {
            return Err(StoreError::NotReady);
        }
        let mut guard = self.state.write().await;
        let state = guard.get_or_insert_with(CanvasState::default);
        f(state).map_err(|reason| StoreError::rejected(op, reason))
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn is_ready(&self) -> bool {
        self.ready
    }

    async fn get(&self) -> Result<Option<CanvasState>, StoreError> {
        if !self.ready {
            return Err(StoreError::NotReady);
        }
        Ok(self.state.read().await.clone())
    }

    async fn set(&self, state: &CanvasState) -> Result<(), StoreError> {
        let state = state.clone();
        self.write(StoreOp::Set, move |current| {
            *current = state;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        if !self.ready {
            return Err(StoreError::NotReady);
        }
        *self.state.write().await = Some(CanvasState::default());
        Ok(())
    }

    async fn create_table(&self, table: &Table) -> Result<Table, StoreError> {
        let mut stored = Table::new(table.name.clone()).with_id(Self::new_id());
        stored.position = table.position.clone();
        for field in table.fields() {
            stored = stored.with_field(field.clone().with_id(Self::new_id()));
        }

        let created = stored.clone();
        self.write(StoreOp::CreateTable, move |state| {
            state.str_tables.insert(stored.id.clone(), stored);
            Ok(())
        })
        .await?;
        Ok(created)
    }

    async fn update_table(&self, table: &Table, also_update_fields: bool) -> Result<(), StoreError> {
        let table = table.clone();
        self.write(StoreOp::UpdateTable, move |state| {
            let stored = state
                .str_tables
                .get_mut(&table.id)
                .ok_or_else(|| format!("unknown table '{}'", table.id))?;
            stored.name = table.name;
            stored.position = table.position;
            if also_update_fields {
                stored.fields = table.fields;
            }
            Ok(())
        })
        .await
    }

    async fn delete_table(&self, table: &Table) -> Result<(), StoreError> {
        let id = table.id.clone();
        self.write(StoreOp::DeleteTable, move |state| {
            state
                .str_tables
                .shift_remove(&id)
                .map(|_| ())
                .ok_or_else(|| format!("unknown table '{}'", id))
        })
        .await
    }

    async fn create_field(&self, table: &Table, field: &Field) -> Result<FieldId, StoreError> {
        let table_id = table.id.clone();
        let mut field = field.clone().with_id(Self::new_id());
        field.table_id = table_id.clone();
        let id = field.id.clone();
        self.write(StoreOp::CreateField, move |state| {
            let stored = state
                .str_tables
                .get_mut(&table_id)
                .ok_or_else(|| format!("unknown table '{}'", table_id))?;
            stored.fields.insert(field.id.clone(), field);
            Ok(())
        })
        .await?;
        Ok(id)
    }

    async fn update_field(&self, table: &Table, field: &Field) -> Result<(), StoreError> {
        let table_id = table.id.clone();
        let field = field.clone();
        self.write(StoreOp::UpdateField, move |state| {
            let stored = state
                .str_tables
                .get_mut(&table_id)
                .and_then(|t| t.fields.get_mut(&field.id))
                .ok_or_else(|| format!("unknown field '{}.{}'", table_id, field.id))?;
            *stored = field;
            Ok(())
        })
        .await
    }

    async fn delete_field(&self, table: &Table, field: &Field) -> Result<(), StoreError> {
        let field_ref = FieldRef::new(table.id.clone(), field.id.clone());
        self.write(StoreOp::DeleteField, move |state| {
            state
                .str_tables
                .get_mut(&field_ref.table_id)
                .and_then(|t| t.fields.shift_remove(&field_ref.field_id))
                .map(|_| ())
                .ok_or_else(|| format!("unknown field '{}'", field_ref))
        })
        .await
    }

    async fn update_zoom(&self, zoom: f64) -> Result<(), StoreError> {
        self.write(StoreOp::UpdateZoom, move |state| {
            state.zoom = zoom;
            Ok(())
        })
        .await
    }
}

// ============================================================================
// Ordered pending operations
// ============================================================================

/// One planned step of a multi-step edit.
///
/// Each step changes the in-memory schema first and then persists the change.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingOp {
    CreateField { table_id: TableId, field: Field },
    UpdateField { field_ref: FieldRef, update: Field },
    ClearReference(FieldRef),
    DeleteField(FieldRef),
    DeleteTable(TableId),
    UpdateTable { table_id: TableId, also_update_fields: bool },
}

impl PendingOp {
    async fn apply<S: SchemaStore>(&self, schema: &mut Schema, store: &S) -> Result<(), DesignerError> {
        match self {
            PendingOp::CreateField { table_id, field } => {
                // keyed by its transient id until the store hands out the permanent one
                let field_ref = schema.insert_field(table_id, field.clone())?;
                let (table, field) = resolve(schema, &field_ref)?;
                let id = store.create_field(table, field).await?;
                schema.rekey_field(&field_ref, id)?;
            }
            PendingOp::UpdateField { field_ref, update } => {
                schema.update_field(field_ref, update)?;
                let (table, field) = resolve(schema, field_ref)?;
                store.update_field(table, field).await?;
            }
            PendingOp::ClearReference(field_ref) => {
                schema.clear_reference(field_ref)?;
                let (table, field) = resolve(schema, field_ref)?;
                store.update_field(table, field).await?;
            }
            PendingOp::DeleteField(field_ref) => {
                let field = schema.remove_field(field_ref)?;
                let table = table_of(schema, &field_ref.table_id)?;
                store.delete_field(table, &field).await?;
            }
            PendingOp::DeleteTable(table_id) => {
                let table = schema.remove_table(table_id)?;
                store.delete_table(&table).await?;
            }
            PendingOp::UpdateTable {
                table_id,
                also_update_fields,
            } => {
                let table = table_of(schema, table_id)?;
                store.update_table(table, *also_update_fields).await?;
            }
        }
        Ok(())
    }
}

fn table_of<'a>(schema: &'a Schema, id: &TableId) -> Result<&'a Table, IntegrityError> {
    schema
        .table(id)
        .ok_or_else(|| IntegrityError::TableNotFound(id.clone()))
}

fn resolve<'a>(schema: &'a Schema, field_ref: &FieldRef) -> Result<(&'a Table, &'a Field), IntegrityError> {
    schema
        .resolve(field_ref)
        .ok_or_else(|| IntegrityError::FieldNotFound(field_ref.clone()))
}

/// Ordered list of steps, executed one after another
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingOps {
    ops: Vec<PendingOp>,
}

impl PendingOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: PendingOp) {
        self.ops.push(op);
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = PendingOp>) {
        self.ops.extend(ops);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.iter()
    }

    /// Run every step in order. Stops at the first failure; steps already
    /// applied stay applied. A failure before any step completed is returned
    /// as is, later ones are wrapped in [`DesignerError::Interrupted`].
    pub async fn run<S: SchemaStore>(
        &self,
        operation: &str,
        schema: &mut Schema,
        store: &S,
    ) -> Result<usize, DesignerError> {
        let planned = self.ops.len();
        for (completed, op) in self.ops.iter().enumerate() {
            tracing::debug!(operation, step = completed + 1, planned, ?op, "Applying step");
            if let Err(cause) = op.apply(schema, store).await {
                tracing::error!(operation, completed, planned, "Step failed: {}", cause);
                if completed == 0 {
                    return Err(cause);
                }
                return Err(DesignerError::Interrupted {
                    operation: operation.to_string(),
                    completed,
                    planned,
                    cause: Box::new(cause),
                });
            }
        }
        Ok(planned)
    }
}

impl FromIterator<PendingOp> for PendingOps {
    fn from_iter<I: IntoIterator<Item = PendingOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}
