//! Core types for the attendance report.
//!
//! Holds the attendance data model, the shared error type, spreadsheet date
//! handling, number/label formatting and the CLI settings layer.

pub mod dates;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
