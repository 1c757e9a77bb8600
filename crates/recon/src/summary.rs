use std::collections::BTreeMap;

use crate::model::{CircuitStatus, ReconSummary, ReconciledRow, SlaStatus};
use crate::reconcile::SetDiff;

/// Reduce the reconciled rows to counts and penalty totals.
pub fn compute_summary(
    rows: &[ReconciledRow],
    input_preview_rows: usize,
    base_rows: usize,
    diff: &SetDiff,
) -> ReconSummary {
    let mut sla_breached = 0;
    let mut sla_within = 0;
    let mut sla_missing_data = 0;
    let mut circuit_status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut penalty_total = 0.0;
    let mut alternative_discount_total = 0.0;

    for status in [
        CircuitStatus::MatchedInBase,
        CircuitStatus::ExtraInPreview,
        CircuitStatus::IdentifierAbsent,
    ] {
        circuit_status_counts.insert(status.to_string(), 0);
    }

    for r in rows {
        match r.sla_status {
            SlaStatus::Breached => sla_breached += 1,
            SlaStatus::WithinSla => sla_within += 1,
            SlaStatus::MissingData => sla_missing_data += 1,
        }
        *circuit_status_counts.entry(r.circuit_status.to_string()).or_insert(0) += 1;
        penalty_total += r.penalty;
        alternative_discount_total += r.alternative_discount;
    }

    ReconSummary {
        preview_rows: rows.len(),
        input_preview_rows,
        base_rows,
        sla_breached,
        sla_within,
        sla_missing_data,
        extra_in_preview: diff.extra_in_preview.len(),
        missing_from_preview: diff.missing_from_preview.len(),
        circuit_status_counts,
        duplicate_circuits: 0,
        penalty_total,
        alternative_discount_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sla_status: SlaStatus, circuit_status: CircuitStatus, penalty: f64) -> ReconciledRow {
        ReconciledRow {
            preview_row: 0,
            circuit: Some("C".into()),
            availability: None,
            sla_threshold: None,
            contracted_value: None,
            sla_status,
            circuit_status,
            penalty,
            alternative_discount: -penalty,
        }
    }

    #[test]
    fn summary_counts() {
        let rows = vec![
            row(SlaStatus::Breached, CircuitStatus::MatchedInBase, -50.0),
            row(SlaStatus::Breached, CircuitStatus::MatchedInBase, -10.0),
            row(SlaStatus::WithinSla, CircuitStatus::ExtraInPreview, 0.0),
            row(SlaStatus::MissingData, CircuitStatus::IdentifierAbsent, 0.0),
        ];
        let diff = SetDiff {
            extra_in_preview: ["C3".to_string()].into_iter().collect(),
            missing_from_preview: ["C4".to_string(), "C5".to_string()].into_iter().collect(),
        };
        let s = compute_summary(&rows, 4, 7, &diff);

        assert_eq!(s.preview_rows, 4);
        assert_eq!(s.input_preview_rows, 4);
        assert_eq!(s.base_rows, 7);
        assert_eq!(s.sla_breached, 2);
        assert_eq!(s.sla_within, 1);
        assert_eq!(s.sla_missing_data, 1);
        assert_eq!(s.sla_breached + s.sla_within + s.sla_missing_data, s.preview_rows);
        assert_eq!(s.extra_in_preview, 1);
        assert_eq!(s.missing_from_preview, 2);
        assert_eq!(s.circuit_status_counts["matched_in_base"], 2);
        assert_eq!(s.circuit_status_counts["extra_in_preview"], 1);
        assert_eq!(s.circuit_status_counts["identifier_absent"], 1);
        assert_eq!(s.penalty_total, -60.0);
        assert_eq!(s.alternative_discount_total, 60.0);
    }

    #[test]
    fn empty_rows() {
        let s = compute_summary(&[], 0, 3, &SetDiff::default());
        assert_eq!(s.preview_rows, 0);
        assert_eq!(s.penalty_total, 0.0);
        assert_eq!(s.circuit_status_counts.values().sum::<usize>(), 0);
        assert_eq!(s.circuit_status_counts.len(), 3);
    }
}
