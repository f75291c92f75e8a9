//! Scenario Engine: spreadsheet scenarios to visual novel scripts.
//!
//! Each source row is handed to a priority-ordered pipeline of generators.
//! Every generator claims a few named fields, resolves them through the
//! translation tables and emits commands for one target engine: script
//! lines for Ren'Py and Naninovel, sheet records for Utage.

pub mod core;
pub mod engines;
pub mod schema;
