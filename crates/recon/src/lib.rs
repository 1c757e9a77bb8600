//! `previa-recon`: preview vs base circuit reconciliation engine.
//!
//! Pure engine crate: receives pre-parsed tables, returns the reconciled
//! table, SLA classification, penalties, summary and billing sheet.
//! No CLI or file-format dependencies.

pub mod billing;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod join;
pub mod model;
pub mod normalize;
pub mod penalty;
pub mod reconcile;
pub mod summary;

pub use config::{DuplicatePolicy, ReconConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{
    BillingSheet, CircuitStatus, ReconInput, ReconResult, ReconSummary, ReconciledRow, SlaStatus,
    Table, Value,
};
