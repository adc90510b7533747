//! Data layer for the attendance report.
//!
//! Reads workbooks, recovers the department → group → student structure from
//! loosely formatted rows, and derives statistics, filters, drill-downs and
//! alerts from the result.

pub mod aggregator;
pub mod alerts;
pub mod analysis;
pub mod classifier;
pub mod drill;
pub mod export;
pub mod filter;
pub mod hierarchy;
pub mod reader;

pub use attendance_core as core;
