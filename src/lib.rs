//! # Host Inventory Library
//!
//! Persistent, multi-tenant inventory of managed hosts: tenants, hosts with
//! per-host JSON variables, global tags, and shared access secrets, stored
//! through SeaORM on PostgreSQL or SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod telemetry;
pub use migration;
