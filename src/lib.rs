//! dbdesigner - Entity-Relationship Schema Engine
//!
//! Keeps a graph of tables and typed fields, validates and applies
//! primary-key to foreign-key connections, cascades reference removal on
//! deletes, and turns the resulting schema into SQL DDL or ORM classes.

pub mod core;
