//! Runtime layer for the attendance report.
//!
//! Keeps the loaded workbook cached, reloads it when the file changes, and
//! drives the watch loop that feeds fresh snapshots to the binary.

pub mod data_manager;
pub mod orchestrator;

pub use attendance_core as core;
pub use attendance_data as data;
