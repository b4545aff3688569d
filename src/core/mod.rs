//! Core domain models and business logic for schema design

pub mod canvas;
pub mod cascade;
pub mod codegen;
pub mod config;
pub mod connections;
pub mod designer;
pub mod error;
pub mod notifications;
pub mod persistence;
pub mod references;
mod schema;
pub mod validation;


pub use canvas::CanvasState;
pub use codegen::{CodeGenerator, GeneratorKind};
pub use designer::Designer;
pub use error::{
    CanvasError, ConnectionError, DesignerError, IntegrityError, StoreError, ValidationError,
};
pub use notifications::{Notification, NotificationKind, NotificationLog, Notifier};
pub use persistence::{MemoryStore, PendingOp, PendingOps, SchemaStore};
pub use references::ReferenceIndex;
pub use schema::*;
