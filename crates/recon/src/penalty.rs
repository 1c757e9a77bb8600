use serde::Serialize;

use crate::model::SlaStatus;

/// The two penalty framings of one row.
///
/// `contractual` is the reduction applied to the contracted value
/// (`value * availability - value`, never positive). `alternative` is the
/// same shortfall as a non-negative discount (`(1 - availability) * value`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Penalty {
    pub contractual: f64,
    pub alternative: f64,
}

/// Both penalties for a breached row with a contracted value and an
/// availability; exactly zero otherwise.
pub fn compute_penalty(
    status: SlaStatus,
    contracted_value: Option<f64>,
    availability: Option<f64>,
) -> Penalty {
    match (status, contracted_value, availability) {
        (SlaStatus::Breached, Some(value), Some(avail)) => Penalty {
            contractual: value * avail - value,
            alternative: (1.0 - avail) * value,
        },
        _ => Penalty::default(),
    }
}
