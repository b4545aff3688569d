//! Canvas JSON export/import
//!
//! The file format is `{ "zoom": 1.0, "strTables": { "<tableId>": table } }`
//! with each table's fields keyed by field id and references written as
//! `"tableId.fieldId"` strings.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::CanvasError;
use crate::core::schema::{FieldRef, Schema, Table, TableId};

/// Persisted snapshot of a canvas
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub str_tables: IndexMap<TableId, Table>,
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            str_tables: IndexMap::new(),
        }
    }
}

/// Schema rebuilt from a snapshot, plus the references that had to be dropped
#[derive(Debug)]
pub struct LoadedCanvas {
    pub schema: Schema,
    /// Foreign fields whose target was missing, not primary or in the same table
    pub dangling: Vec<(FieldRef, FieldRef)>,
}

impl CanvasState {
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            zoom: schema.zoom(),
            str_tables: schema.tables_map().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.str_tables.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, CanvasError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, CanvasError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a schema. Map keys win over the ids stored inside the entries,
    /// and references that cannot be honoured are cleared.
    pub fn into_schema(self) -> Result<LoadedCanvas, CanvasError> {
        let mut names = HashSet::new();
        let mut schema = Schema::new();
        schema.set_zoom(self.zoom);

        for (table_id, mut table) in self.str_tables {
            if !names.insert(table.name.clone()) {
                return Err(CanvasError::DuplicateTableName(table.name));
            }
            table.id = table_id;
            table.fields = table
                .fields
                .into_iter()
                .map(|(field_id, mut field)| {
                    field.id = field_id.clone();
                    (field_id, field)
                })
                .collect();
            schema.insert_table(table)?;
        }

        let dangling: Vec<(FieldRef, FieldRef)> = schema
            .tables()
            .flat_map(|t| t.fields())
            .filter_map(|field| {
                let target = field.pk_ref.as_ref()?;
                let valid = !field.primary_key
                    && target.table_id != field.table_id
                    && schema.field(target).is_some_and(|t| {
                        t.primary_key && t.field_type.is_compatible_with(field.field_type)
                    });
                (!valid).then(|| (field.field_ref(), target.clone()))
            })
            .collect();

        for (foreign, target) in &dangling {
            tracing::warn!(%foreign, %target, "Dropping reference that cannot be resolved");
            schema.clear_reference(foreign)?;
        }

        Ok(LoadedCanvas { schema, dangling })
    }
}
