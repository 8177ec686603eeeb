//! AIT: Asset Inventory Toolkit
//!
//! Reconciles spreadsheet exports of a fixed-asset register with a SQLite
//! or Postgres registry, and tracks which assets have been physically
//! verified.

pub mod cli;
pub mod core;
pub mod import;
