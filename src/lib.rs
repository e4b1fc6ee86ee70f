//! Budget Ledger
//!
//! Tracks departmental budget-vs-actual spending across a fiscal year,
//! synchronized with an external spreadsheet file used as a pseudo-database,
//! and derives the execution-rate and projection statistics dashboards
//! consume.

pub mod config;
pub mod core;
pub mod export;
pub mod import;
pub mod sheet;
pub mod store;
