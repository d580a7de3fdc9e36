//! `spreadmart-audit`: Multi-branch sales audit and reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded branch tables, returns the cleaned
//! dataset, audit log and defect subsets. No CLI or IO dependencies.

pub mod anomaly;
pub mod config;
pub mod consistency;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod kpi;
pub mod model;

pub use config::AuditConfig;
pub use engine::{reconcile, reconcile_dataset};
pub use error::AuditError;
pub use model::{AuditLog, AuditResult, CleanedDataset, Dataset, Record, SourceTable};
