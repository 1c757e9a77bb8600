use std::collections::BTreeSet;

use crate::model::{CircuitStatus, SlaStatus};

/// Classify one row's SLA status.
///
/// A missing availability or threshold wins over the comparison. Equality is
/// not a breach.
pub fn classify_sla(availability: Option<f64>, threshold: Option<f64>) -> SlaStatus {
    match (availability, threshold) {
        (Some(a), Some(t)) => {
            if a < t {
                SlaStatus::Breached
            } else {
                SlaStatus::WithinSla
            }
        }
        _ => SlaStatus::MissingData,
    }
}

/// Membership of a preview identifier (already normalized) in the base set.
pub fn classify_circuit(key: Option<&str>, base_ids: &BTreeSet<String>) -> CircuitStatus {
    match key {
        None => CircuitStatus::IdentifierAbsent,
        Some(k) if base_ids.contains(k) => CircuitStatus::MatchedInBase,
        Some(_) => CircuitStatus::ExtraInPreview,
    }
}
