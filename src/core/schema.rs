use std::fmt;
use std::str::FromStr;

use derive_more::{Display, From};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::{IntegrityError, ValidationError};
use crate::core::references::ReferenceIndex;

/// Table identifier. Equals the table name until the store assigns a permanent id.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TableId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Field identifier, unique within its table
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Structured address of a field: owning table id plus field id.
///
/// Serialized in the dotted `"tableId.fieldId"` form used by canvas files.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub table_id: TableId,
    pub field_id: FieldId,
}

impl FieldRef {
    pub fn new(table_id: impl Into<TableId>, field_id: impl Into<FieldId>) -> Self {
        Self {
            table_id: table_id.into(),
            field_id: field_id.into(),
        }
    }

    /// Parse the dotted form; both halves must be non-empty
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.split_once('.') {
            Some((table, field)) if !table.is_empty() && !field.is_empty() => {
                Ok(Self::new(table, field))
            }
            _ => Err(ValidationError::MalformedReference(s.to_string())),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table_id, self.field_id)
    }
}

impl FromStr for FieldRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Column types offered by the editor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[default]
    Text,
    Integer,
    Float,
    Date,
    DateTime,
    Serial,
}

impl FieldType {
    pub const ALL: [FieldType; 6] = [
        FieldType::Text,
        FieldType::Integer,
        FieldType::Float,
        FieldType::Date,
        FieldType::DateTime,
        FieldType::Serial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "Text",
            FieldType::Integer => "Integer",
            FieldType::Float => "Float",
            FieldType::Date => "Date",
            FieldType::DateTime => "DateTime",
            FieldType::Serial => "Serial",
        }
    }

    /// Type class used when matching a foreign key against a primary key.
    /// Serial columns are integers.
    pub fn reference_class(self) -> FieldType {
        match self {
            FieldType::Serial => FieldType::Integer,
            other => other,
        }
    }

    pub fn is_compatible_with(self, other: FieldType) -> bool {
        self.reference_class() == other.reference_class()
    }

    /// Only text columns carry a size
    pub fn is_sized(self) -> bool {
        matches!(self, FieldType::Text)
    }

    /// Types whose default values are emitted as quoted literals
    pub fn has_literal_default(self) -> bool {
        matches!(self, FieldType::Text | FieldType::Date | FieldType::DateTime)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownType(s.to_string()))
    }
}

/// Canvas coordinates, kept as the CSS strings the canvas writes (`"120px"`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: String,
    pub y: String,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            x: "0px".to_string(),
            y: "0px".to_string(),
        }
    }
}

/// A column of a table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Field {
    pub table_id: TableId,
    pub id: FieldId,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Meaningful for Text only (1..=65535), 0 otherwise
    pub size: u32,
    pub unique: bool,
    pub unique_composite: bool,
    pub primary_key: bool,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// The primary field this field references. Only set on non-primary fields.
    pub pk_ref: Option<FieldRef>,
}

impl Default for Field {
    fn default() -> Self {
        Self::new("Unnamed", FieldType::Text)
    }
}

impl Field {
    /// New field with a transient id equal to its name
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            table_id: TableId::default(),
            id: FieldId::new(name.clone()),
            name,
            field_type,
            size: 0,
            unique: false,
            unique_composite: false,
            primary_key: false,
            not_null: false,
            default_value: None,
            pk_ref: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<FieldId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Marks the field as primary. Clears the other key flags and not-null,
    /// which is implied for primary keys.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.unique = false;
        self.unique_composite = false;
        self.not_null = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.primary_key = false;
        self.unique_composite = false;
        self
    }

    pub fn unique_composite(mut self) -> Self {
        self.unique_composite = true;
        self.primary_key = false;
        self.unique = false;
        self
    }

    /// Ignored on primary fields
    pub fn not_null(mut self) -> Self {
        self.not_null = !self.primary_key;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn references(mut self, target: FieldRef) -> Self {
        self.pk_ref = Some(target);
        self
    }

    pub fn field_ref(&self) -> FieldRef {
        FieldRef::new(self.table_id.clone(), self.id.clone())
    }

    /// Compares the user-editable attributes. Ids and pk_ref are ignored.
    pub fn is_equal_with(&self, other: &Field) -> bool {
        self.name == other.name
            && self.field_type == other.field_type
            && self.size == other.size
            && self.unique == other.unique
            && self.unique_composite == other.unique_composite
            && self.primary_key == other.primary_key
            && self.not_null == other.not_null
            && self.default_value == other.default_value
    }

    /// Copies the user-editable attributes of `other` onto this field
    pub fn update_from(&mut self, other: &Field) {
        self.name = other.name.clone();
        self.field_type = other.field_type;
        self.size = other.size;
        self.unique = other.unique;
        self.unique_composite = other.unique_composite;
        self.primary_key = other.primary_key;
        self.not_null = other.not_null;
        self.default_value = other.default_value.clone();
    }

    /// Checks the key-flag exclusivity and the "no pk_ref on primary" rule
    pub fn check_attributes(&self) -> Result<(), ValidationError> {
        let keys = [self.primary_key, self.unique, self.unique_composite]
            .into_iter()
            .filter(|flag| *flag)
            .count();
        if keys > 1 {
            return Err(ValidationError::ConflictingKeys(self.name.clone()));
        }
        if self.primary_key && self.pk_ref.is_some() {
            return Err(ValidationError::PrimaryWithReference(self.name.clone()));
        }
        Ok(())
    }

    /// Short attribute summary, e.g. `Primary` or `Unique,Not Null`
    pub fn attribute_summary(&self) -> String {
        let mut attributes = Vec::new();
        if self.primary_key {
            attributes.push("Primary");
        }
        if self.unique {
            attributes.push("Unique");
        }
        if self.unique_composite {
            attributes.push("Unique Composite");
        }
        if self.not_null {
            attributes.push("Not Null");
        }
        attributes.join(",")
    }
}

/// A table: named, ordered set of fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub id: TableId,
    pub name: String,
    #[serde(default)]
    pub(crate) fields: IndexMap<FieldId, Field>,
    #[serde(default)]
    pub position: Position,
}

impl Table {
    /// New table with a transient id equal to its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: TableId::new(name.clone()),
            name,
            fields: IndexMap::new(),
            position: Position::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<TableId>) -> Self {
        self.id = id.into();
        for field in self.fields.values_mut() {
            field.table_id = self.id.clone();
        }
        self
    }

    pub fn with_position(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.position = Position {
            x: x.into(),
            y: y.into(),
        };
        self
    }

    /// Appends a field to a draft table. An existing field with the same id is replaced.
    pub fn with_field(mut self, mut field: Field) -> Self {
        field.table_id = self.id.clone();
        self.fields.insert(field.id.clone(), field);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.get(id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.values().find(|f| f.name == name)
    }

    pub fn field_index(&self, id: &FieldId) -> Option<usize> {
        self.fields.get_index_of(id)
    }

    pub fn primary_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values().filter(|f| f.primary_key)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Edit a field of a draft. Tables inside a [`Schema`] are only
    /// reachable through `&Table`, so this never bypasses the index.
    pub fn field_mut(&mut self, id: &FieldId) -> Option<&mut Field> {
        self.fields.get_mut(id)
    }

    /// Draft without the given field, keeping the order of the others
    pub fn without_field(mut self, id: &FieldId) -> Self {
        self.fields.shift_remove(id);
        self
    }
}

/// The schema being edited: tables in insertion order, the zoom factor and
/// the reverse index of foreign key references.
///
/// All pk_ref changes go through this type so the index stays in sync.
#[derive(Clone, Debug)]
pub struct Schema {
    tables: IndexMap<TableId, Table>,
    zoom: f64,
    index: ReferenceIndex,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    pub fn new() -> Self {
        Self {
            tables: IndexMap::new(),
            zoom: 1.0,
            index: ReferenceIndex::new(),
        }
    }

    /// Build a schema from already-identified tables and index their references
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Result<Self, IntegrityError> {
        let mut schema = Self::new();
        for table in tables {
            schema.insert_table(table)?;
        }
        Ok(schema)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub(crate) fn tables_map(&self) -> &IndexMap<TableId, Table> {
        &self.tables
    }

    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.tables.get(id)
    }

    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables.values().find(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn field(&self, field_ref: &FieldRef) -> Option<&Field> {
        self.tables
            .get(&field_ref.table_id)
            .and_then(|t| t.fields.get(&field_ref.field_id))
    }

    /// Table and field addressed by `field_ref`
    pub fn resolve(&self, field_ref: &FieldRef) -> Option<(&Table, &Field)> {
        let table = self.tables.get(&field_ref.table_id)?;
        let field = table.fields.get(&field_ref.field_id)?;
        Some((table, field))
    }

    /// `table.field` display name, falling back to the raw ids
    pub fn display_name(&self, field_ref: &FieldRef) -> String {
        match self.resolve(field_ref) {
            Some((table, field)) => format!("{}.{}", table.name, field.name),
            None => field_ref.to_string(),
        }
    }

    pub fn reference_index(&self) -> &ReferenceIndex {
        &self.index
    }

    fn require_table(&self, id: &TableId) -> Result<&Table, IntegrityError> {
        self.tables
            .get(id)
            .ok_or_else(|| IntegrityError::TableNotFound(id.clone()))
    }

    fn require_field_mut(&mut self, field_ref: &FieldRef) -> Result<&mut Field, IntegrityError> {
        self.tables
            .get_mut(&field_ref.table_id)
            .and_then(|t| t.fields.get_mut(&field_ref.field_id))
            .ok_or_else(|| IntegrityError::FieldNotFound(field_ref.clone()))
    }

    // ------------------------------------------------------------------
    // Reference lookups
    // ------------------------------------------------------------------

    /// Foreign fields whose pk_ref names `primary`, in table/field order.
    /// Empty when the field is missing or not a primary key.
    pub fn get_referencers(&self, primary: &FieldRef) -> Vec<FieldRef> {
        match self.field(primary) {
            Some(field) if field.primary_key => {}
            _ => return Vec::new(),
        }

        let mut referencers = self.index.referencers_of(primary);
        referencers.sort_by_key(|r| self.position_of(r));
        referencers
    }

    /// Full-scan variant of [`Schema::get_referencers`] that reads pk_ref directly
    pub fn scan_referencers(&self, primary: &FieldRef) -> Vec<FieldRef> {
        match self.field(primary) {
            Some(field) if field.primary_key => {}
            _ => return Vec::new(),
        }

        self.tables
            .values()
            .flat_map(|t| t.fields.values())
            .filter(|f| f.pk_ref.as_ref() == Some(primary))
            .map(Field::field_ref)
            .collect()
    }

    /// Whether any field references `primary`, or `primary` itself holds a reference
    pub fn has_relations(&self, field_ref: &FieldRef) -> bool {
        self.field(field_ref).is_some_and(|f| f.pk_ref.is_some())
            || !self.get_referencers(field_ref).is_empty()
    }

    fn position_of(&self, field_ref: &FieldRef) -> (usize, usize) {
        let table_pos = self
            .tables
            .get_index_of(&field_ref.table_id)
            .unwrap_or(usize::MAX);
        let field_pos = self
            .tables
            .get(&field_ref.table_id)
            .and_then(|t| t.fields.get_index_of(&field_ref.field_id))
            .unwrap_or(usize::MAX);
        (table_pos, field_pos)
    }

    /// Recompute the reference index from the pk_ref values
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for table in self.tables.values() {
            for field in table.fields.values() {
                if let Some(target) = &field.pk_ref {
                    self.index.link(&field.field_ref(), target);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutation primitives
    // ------------------------------------------------------------------

    /// Insert a table, stamping its id on every field and indexing references
    pub fn insert_table(&mut self, mut table: Table) -> Result<(), IntegrityError> {
        if self.tables.contains_key(&table.id) {
            return Err(IntegrityError::DuplicateTableId(table.id));
        }
        for field in table.fields.values_mut() {
            field.table_id = table.id.clone();
            if let Some(target) = &field.pk_ref {
                self.index.link(&field.field_ref(), target);
            }
        }
        self.tables.insert(table.id.clone(), table);
        Ok(())
    }

    /// Remove a table. Refused while any field outside the table still
    /// references one of its fields.
    pub fn remove_table(&mut self, id: &TableId) -> Result<Table, IntegrityError> {
        let table = self.require_table(id)?;
        for field in table.primary_fields() {
            let external = self
                .index
                .referencers_of(&field.field_ref())
                .into_iter()
                .filter(|r| &r.table_id != id)
                .count();
            if external > 0 {
                return Err(IntegrityError::StillReferenced {
                    field: field.field_ref(),
                    count: external,
                });
            }
        }

        let table = self
            .tables
            .shift_remove(id)
            .ok_or_else(|| IntegrityError::TableNotFound(id.clone()))?;
        for field in table.fields.values() {
            self.index.forget(&field.field_ref());
        }
        Ok(table)
    }

    pub fn rename_table(&mut self, id: &TableId, name: impl Into<String>) -> Result<(), IntegrityError> {
        let table = self
            .tables
            .get_mut(id)
            .ok_or_else(|| IntegrityError::TableNotFound(id.clone()))?;
        table.name = name.into();
        Ok(())
    }

    pub fn set_position(&mut self, id: &TableId, position: Position) -> Result<(), IntegrityError> {
        let table = self
            .tables
            .get_mut(id)
            .ok_or_else(|| IntegrityError::TableNotFound(id.clone()))?;
        table.position = position;
        Ok(())
    }

    /// Append a field to an existing table
    pub fn insert_field(&mut self, table_id: &TableId, mut field: Field) -> Result<FieldRef, IntegrityError> {
        let table = self
            .tables
            .get_mut(table_id)
            .ok_or_else(|| IntegrityError::TableNotFound(table_id.clone()))?;
        field.table_id = table_id.clone();
        let field_ref = field.field_ref();
        if table.fields.contains_key(&field.id) {
            return Err(IntegrityError::DuplicateFieldId(field_ref));
        }
        if let Some(target) = &field.pk_ref {
            self.index.link(&field_ref, target);
        }
        table.fields.insert(field.id.clone(), field);
        Ok(field_ref)
    }

    /// Remove a field. Refused while other fields reference it.
    pub fn remove_field(&mut self, field_ref: &FieldRef) -> Result<Field, IntegrityError> {
        let count = self.index.referencers_of(field_ref).len();
        if count > 0 {
            return Err(IntegrityError::StillReferenced {
                field: field_ref.clone(),
                count,
            });
        }
        let table = self
            .tables
            .get_mut(&field_ref.table_id)
            .ok_or_else(|| IntegrityError::TableNotFound(field_ref.table_id.clone()))?;
        let field = table
            .fields
            .shift_remove(&field_ref.field_id)
            .ok_or_else(|| IntegrityError::FieldNotFound(field_ref.clone()))?;
        self.index.forget(field_ref);
        Ok(field)
    }

    /// Copy the user-editable attributes of `update` onto an existing field.
    /// Ids and pk_ref are left untouched.
    ///
    /// While the field takes part in a connection its primary flag and its
    /// type class are fixed, and a field holding a pk_ref never becomes primary.
    pub fn update_field(&mut self, field_ref: &FieldRef, update: &Field) -> Result<(), IntegrityError> {
        let related = self.has_relations(field_ref);
        let field = self.require_field_mut(field_ref)?;
        if (update.primary_key && field.pk_ref.is_some())
            || (related && update.primary_key != field.primary_key)
        {
            return Err(IntegrityError::KeyLocked(field.name.clone()));
        }
        if related && !update.field_type.is_compatible_with(field.field_type) {
            return Err(IntegrityError::TypeLocked(field.name.clone()));
        }
        field.update_from(update);
        Ok(())
    }

    /// Point `foreign` at `primary`, returning the previous target
    pub fn set_reference(
        &mut self,
        foreign: &FieldRef,
        primary: &FieldRef,
    ) -> Result<Option<FieldRef>, IntegrityError> {
        if self.field(primary).is_none() {
            return Err(IntegrityError::FieldNotFound(primary.clone()));
        }
        let field = self.require_field_mut(foreign)?;
        let previous = field.pk_ref.replace(primary.clone());
        self.index.link(foreign, primary);
        Ok(previous)
    }

    /// Clear the pk_ref of `foreign`, returning the previous target
    pub fn clear_reference(&mut self, foreign: &FieldRef) -> Result<Option<FieldRef>, IntegrityError> {
        let field = self.require_field_mut(foreign)?;
        let previous = field.pk_ref.take();
        self.index.unlink(foreign);
        Ok(previous)
    }

    /// Rewrite a table's key (transient -> permanent id), keeping its position
    /// and every reference into or out of it.
    pub fn rekey_table(&mut self, old: &TableId, new: TableId) -> Result<(), IntegrityError> {
        if old == &new {
            return Ok(());
        }
        if self.tables.contains_key(&new) {
            return Err(IntegrityError::DuplicateTableId(new));
        }
        let index = self
            .tables
            .get_index_of(old)
            .ok_or_else(|| IntegrityError::TableNotFound(old.clone()))?;
        let Some((_, mut table)) = self.tables.shift_remove_index(index) else {
            return Err(IntegrityError::TableNotFound(old.clone()));
        };

        table.id = new.clone();
        for field in table.fields.values_mut() {
            field.table_id = new.clone();
        }
        self.tables.shift_insert(index, new.clone(), table);

        for table in self.tables.values_mut() {
            for field in table.fields.values_mut() {
                if let Some(target) = field.pk_ref.as_mut()
                    && &target.table_id == old
                {
                    target.table_id = new.clone();
                }
            }
        }
        self.rebuild_index();
        Ok(())
    }

    /// Rewrite a field's key (transient -> permanent id) within its table
    pub fn rekey_field(&mut self, old: &FieldRef, new: FieldId) -> Result<FieldRef, IntegrityError> {
        let new_ref = FieldRef::new(old.table_id.clone(), new.clone());
        if old.field_id == new {
            return Ok(new_ref);
        }
        let table = self
            .tables
            .get_mut(&old.table_id)
            .ok_or_else(|| IntegrityError::TableNotFound(old.table_id.clone()))?;
        if table.fields.contains_key(&new) {
            return Err(IntegrityError::DuplicateFieldId(new_ref));
        }
        let index = table
            .fields
            .get_index_of(&old.field_id)
            .ok_or_else(|| IntegrityError::FieldNotFound(old.clone()))?;
        let Some((_, mut field)) = table.fields.shift_remove_index(index) else {
            return Err(IntegrityError::FieldNotFound(old.clone()));
        };
        field.id = new.clone();
        table.fields.shift_insert(index, new, field);

        for table in self.tables.values_mut() {
            for field in table.fields.values_mut() {
                if field.pk_ref.as_ref() == Some(old) {
                    field.pk_ref = Some(new_ref.clone());
                }
            }
        }
        self.rebuild_index();
        Ok(new_ref)
    }

    /// Swap a field with its neighbour `offset` places away, wrapping around
    /// at either end. Returns false when the table has a single field.
    pub fn move_field(&mut self, field_ref: &FieldRef, offset: isize) -> Result<bool, IntegrityError> {
        let table = self
            .tables
            .get_mut(&field_ref.table_id)
            .ok_or_else(|| IntegrityError::TableNotFound(field_ref.table_id.clone()))?;
        let len = table.fields.len();
        if len < 2 {
            return Ok(false);
        }
        let from = table
            .fields
            .get_index_of(&field_ref.field_id)
            .ok_or_else(|| IntegrityError::FieldNotFound(field_ref.clone()))?;

        let target = from as isize + offset;
        let to = if target < 0 {
            len - 1
        } else if target as usize >= len {
            0
        } else {
            target as usize
        };
        table.fields.swap_indices(from, to);
        Ok(true)
    }

    /// Drop every table
    pub fn clear(&mut self) {
        self.tables.clear();
        self.index.clear();
    }
}
