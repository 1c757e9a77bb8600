//! Billing sheet: per-circuit billing lines derived from the reconciled rows.
//!
//! One line per reconciled row that carries an identifier. The net value is
//! the contracted value after the contractual penalty; it is left empty when
//! the circuit has no contracted value.

use crate::model::{BillingLine, BillingSheet, BillingTotals, ReconciledRow};

pub fn build_billing_sheet(rows: &[ReconciledRow]) -> BillingSheet {
    let mut sheet = BillingSheet::default();

    for r in rows {
        let Some(ref circuit) = r.circuit else {
            continue;
        };

        let net_value = r.contracted_value.map(|v| v + r.penalty);

        sheet.totals.lines += 1;
        sheet.totals.contracted_total += r.contracted_value.unwrap_or(0.0);
        sheet.totals.penalty_total += r.penalty;
        sheet.totals.alternative_discount_total += r.alternative_discount;
        sheet.totals.net_total += net_value.unwrap_or(0.0);

        sheet.lines.push(BillingLine {
            circuit: circuit.clone(),
            circuit_status: r.circuit_status,
            sla_status: r.sla_status,
            availability: r.availability,
            sla_threshold: r.sla_threshold,
            contracted_value: r.contracted_value,
            penalty: r.penalty,
            alternative_discount: r.alternative_discount,
            net_value,
        });
    }

    sheet
}

impl BillingTotals {
    /// Share of the contracted total withheld by penalties, in [0, 1].
    pub fn discount_ratio(&self) -> f64 {
        if self.contracted_total == 0.0 {
            0.0
        } else {
            self.alternative_discount_total / self.contracted_total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CircuitStatus, SlaStatus};

    fn row(circuit: Option<&str>, contracted: Option<f64>, penalty: f64) -> ReconciledRow {
        ReconciledRow {
            preview_row: 0,
            circuit: circuit.map(String::from),
            availability: Some(0.95),
            sla_threshold: Some(0.99),
            contracted_value: contracted,
            sla_status: if penalty != 0.0 { SlaStatus::Breached } else { SlaStatus::WithinSla },
            circuit_status: CircuitStatus::MatchedInBase,
            penalty,
            alternative_discount: -penalty,
        }
    }

    #[test]
    fn lines_and_totals() {
        let rows = vec![
            row(Some("C1"), Some(1000.0), -50.0),
            row(Some("C2"), Some(400.0), 0.0),
            row(Some("C3"), None, 0.0),
            row(None, Some(999.0), 0.0),
        ];
        let sheet = build_billing_sheet(&rows);

        assert_eq!(sheet.lines.len(), 3);
        assert_eq!(sheet.lines[0].net_value, Some(950.0));
        assert_eq!(sheet.lines[1].net_value, Some(400.0));
        assert_eq!(sheet.lines[2].net_value, None);

        assert_eq!(sheet.totals.lines, 3);
        assert_eq!(sheet.totals.contracted_total, 1400.0);
        assert_eq!(sheet.totals.penalty_total, -50.0);
        assert_eq!(sheet.totals.alternative_discount_total, 50.0);
        assert_eq!(sheet.totals.net_total, 1350.0);
        assert!((sheet.totals.discount_ratio() - 50.0 / 1400.0).abs() < 1e-12);
    }

    #[test]
    fn empty_rows_zero_ratio() {
        let sheet = build_billing_sheet(&[]);
        assert!(sheet.lines.is_empty());
        assert_eq!(sheet.totals.discount_ratio(), 0.0);
    }
}
