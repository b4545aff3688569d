//! Error types for the schema engine
//!
//! Each layer has its own enum so that callers can tell a user-correctable
//! input problem from a refused integrity change or a failing store.

use crate::core::persistence::StoreOp;
use crate::core::schema::{FieldRef, FieldType, TableId};

/// User-correctable input errors (names, sizes, defaults)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    Empty,

    #[error(
        "Name contains invalid characters: '{invalid}'. Please use only letters, digits, '_' and '-'"
    )]
    InvalidCharacters { invalid: String },

    #[error("Name is too long ({actual} chars, max {max})")]
    TooLong { max: usize, actual: usize },

    #[error("'{keyword}' is a reserved SQL keyword")]
    ReservedKeyword { keyword: String },

    #[error("Table name '{0}' already exists")]
    DuplicateTableName(String),

    #[error("A field with the name '{0}' already exists")]
    DuplicateFieldName(String),

    #[error("Not a valid size for '{field}': {size}. Must be (1 - 65535)")]
    InvalidSize { field: String, size: u32 },

    #[error("The default value '{value}' doesn't match the type {field_type}")]
    DefaultTypeMismatch { value: String, field_type: FieldType },

    #[error("Unknown field type '{0}'")]
    UnknownType(String),

    #[error("You must add at least one field")]
    NoFields,

    #[error("Field '{0}' can only be one of primary key, unique or unique composite")]
    ConflictingKeys(String),

    #[error("Primary key field '{0}' cannot reference another field")]
    PrimaryWithReference(String),

    #[error("Malformed field reference '{0}'")]
    MalformedReference(String),

    #[error("Unknown code generator '{0}'")]
    UnknownGenerator(String),
}

/// Changes refused because they would break referential integrity
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityError {
    #[error("Table '{0}' not found")]
    TableNotFound(TableId),

    #[error("Field '{0}' not found")]
    FieldNotFound(FieldRef),

    #[error("A table with id '{0}' already exists")]
    DuplicateTableId(TableId),

    #[error("A field with id '{0}' already exists")]
    DuplicateFieldId(FieldRef),

    #[error("Field '{field}' is still referenced by {count} foreign key(s)")]
    StillReferenced { field: FieldRef, count: usize },

    #[error("Type change of '{0}' was ignored because of existing relations")]
    TypeLocked(String),

    #[error("Key change of '{0}' was ignored because of existing relations")]
    KeyLocked(String),
}

/// Reasons a proposed primary -> foreign connection is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("The foreign key {foreign} is already referencing {current}")]
    AlreadyReferenced { foreign: String, current: String },

    #[error("A field cannot have a reference to itself")]
    SelfReference,

    #[error("Primary key and foreign key must be in different tables")]
    SameTable,

    #[error("{foreign} ({foreign_type}) and {primary} ({primary_type}) must have the same type")]
    TypeMismatch {
        primary: String,
        foreign: String,
        primary_type: FieldType,
        foreign_type: FieldType,
    },

    #[error("{primary} is already referenced by {existing}")]
    Redundant { primary: String, existing: String },

    #[error("{0} is not a primary key")]
    NotPrimary(String),

    #[error("{0} is a primary key and cannot reference another field")]
    ForeignIsPrimary(String),

    #[error("{foreign} is not connected to {primary}")]
    NotConnected { primary: String, foreign: String },

    #[error("Unknown field {0}")]
    Unresolved(FieldRef),
}

impl ConnectionError {
    /// Short headline used for notifications
    pub fn title(&self) -> &'static str {
        match self {
            ConnectionError::AlreadyReferenced { .. } => "Existing Reference",
            ConnectionError::SelfReference => "Self reference",
            ConnectionError::SameTable
            | ConnectionError::NotPrimary(_)
            | ConnectionError::ForeignIsPrimary(_)
            | ConnectionError::Unresolved(_) => "Invalid Reference",
            ConnectionError::TypeMismatch { .. } => "Type difference",
            ConnectionError::Redundant { .. } => "Redundancy detected",
            ConnectionError::NotConnected { .. } => "Not connected",
        }
    }
}

/// Persistence failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage is not ready")]
    NotReady,

    #[error("Storage is ready but returned no data")]
    Missing,

    #[error("{operation} failed: {reason}")]
    Rejected { operation: StoreOp, reason: String },
}

impl StoreError {
    pub fn rejected(operation: StoreOp, reason: impl Into<String>) -> Self {
        StoreError::Rejected {
            operation,
            reason: reason.into(),
        }
    }
}

/// Canvas JSON import/export errors
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("No tables to export")]
    Empty,

    #[error("Invalid canvas JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table name '{0}' appears more than once")]
    DuplicateTableName(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

/// Umbrella error returned by the designer flows
#[derive(Debug, thiserror::Error)]
pub enum DesignerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error("{operation} stopped after {completed} of {planned} steps: {cause}")]
    Interrupted {
        operation: String,
        completed: usize,
        planned: usize,
        #[source]
        cause: Box<DesignerError>,
    },

    #[error("There should be at least one table")]
    NothingToGenerate,
}

impl DesignerError {
    /// Short headline used for notifications
    pub fn title(&self) -> &'static str {
        match self {
            DesignerError::Validation(_) => "Invalid input",
            DesignerError::Connection(e) => e.title(),
            DesignerError::Integrity(_) => "Existing relations",
            DesignerError::Store(_) | DesignerError::Interrupted { .. } => "Storage error",
            DesignerError::Canvas(_) => "Canvas",
            DesignerError::NothingToGenerate => "Code Generator",
        }
    }

    /// Whether the failure came from the persistence layer
    pub fn is_persistence_failure(&self) -> bool {
        match self {
            DesignerError::Store(_) => true,
            DesignerError::Interrupted { cause, .. } => cause.is_persistence_failure(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_titles() {
        assert_eq!(ConnectionError::SelfReference.title(), "Self reference");
        assert_eq!(ConnectionError::SameTable.title(), "Invalid Reference");
        assert_eq!(
            ConnectionError::Redundant {
                primary: "a.id".into(),
                existing: "b.a_id".into()
            }
            .title(),
            "Redundancy detected"
        );
    }

    #[test]
    fn test_interrupted_is_persistence_failure() {
        let err = DesignerError::Interrupted {
            operation: "Delete field".into(),
            completed: 1,
            planned: 3,
            cause: Box::new(StoreError::rejected(StoreOp::UpdateField, "disk full").into()),
        };

        assert!(err.is_persistence_failure());
        assert_eq!(
            err.to_string(),
            "Delete field stopped after 1 of 3 steps: update field failed: disk full"
        );
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(ValidationError::Empty.to_string(), "Name cannot be empty");
        assert_eq!(
            ValidationError::InvalidSize {
                field: "title".into(),
                size: 70000
            }
            .to_string(),
            "Not a valid size for 'title': 70000. Must be (1 - 65535)"
        );
    }
}
