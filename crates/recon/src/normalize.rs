//! Column normalization: label trimming and percentage rescaling.
//!
//! The rescale decision is made once per column: if any coerced value is
//! above 1, every value in that column is divided by 100. A column that mixes
//! fractions with percentages is therefore scaled uniformly.

use log::{debug, warn};

use crate::model::{Table, Value};

/// What `normalize_percent_columns` did to each column it touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    /// Columns divided by 100.
    pub rescaled: Vec<String>,
    /// (column, number of non-empty cells that failed numeric coercion)
    pub coercion_failures: Vec<(String, usize)>,
    /// Configured columns not present in the table.
    pub absent: Vec<String>,
}

/// Trim whitespace from every column label.
pub fn trim_labels(table: &mut Table) {
    for label in &mut table.columns {
        let trimmed = label.trim();
        if trimmed.len() != label.len() {
            *label = trimmed.to_string();
        }
    }
}

/// Coerce each listed column to numbers and rescale it to fractions.
/// Unparseable cells become `Empty`; nothing here fails.
pub fn normalize_percent_columns(table: &mut Table, columns: &[String]) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    for label in columns {
        let Some(col) = table.column_index(label) else {
            debug!("percent column '{label}' not in table; skipped");
            report.absent.push(label.clone());
            continue;
        };

        let failures = coerce_column(table, col);
        if failures > 0 {
            warn!("column '{label}': {failures} value(s) not numeric, treated as missing");
            report.coercion_failures.push((label.clone(), failures));
        }

        if rescale_column(table, col) {
            debug!("column '{label}' holds values above 1; divided by 100");
            report.rescaled.push(label.clone());
        }
    }

    report
}

/// Replace every cell of `col` with its numeric form. Returns how many
/// non-empty cells could not be parsed.
pub(crate) fn coerce_column(table: &mut Table, col: usize) -> usize {
    let mut failures = 0;
    for cell in table.rows.iter_mut().filter_map(|row| row.get_mut(col)) {
        let coerced = Value::from(cell.as_number());
        if coerced.is_empty() && !cell.is_empty() {
            failures += 1;
        }
        *cell = coerced;
    }
    failures
}

/// Divide the column by 100 when any value exceeds 1. Expects a column that
/// `coerce_column` already processed.
fn rescale_column(table: &mut Table, col: usize) -> bool {
    let needs_rescale = table.column(col).any(|v| matches!(v, Value::Number(n) if *n > 1.0));
    if !needs_rescale {
        return false;
    }
    for cell in table.rows.iter_mut().filter_map(|row| row.get_mut(col)) {
        if let Value::Number(n) = cell {
            *n /= 100.0;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(values: Vec<Value>) -> Table {
        Table::from_rows(
            vec!["Disponibilidade".into()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
    }

    fn column(t: &Table) -> Vec<Option<f64>> {
        t.column(0).map(|v| v.as_number()).collect()
    }

    fn percent() -> Vec<String> {
        vec!["Disponibilidade".into()]
    }

    #[test]
    fn trims_labels() {
        let mut t = Table::new(vec![" Circuito ".into(), "SLA disponibilidade\t".into(), "ok".into()]);
        trim_labels(&mut t);
        assert_eq!(t.columns, vec!["Circuito", "SLA disponibilidade", "ok"]);
    }

    #[test]
    fn whole_column_rescaled_when_any_value_above_one() {
        let mut t = table(vec![99.0.into(), 0.5.into(), 100.0.into()]);
        let report = normalize_percent_columns(&mut t, &percent());
        assert_eq!(report.rescaled, vec!["Disponibilidade".to_string()]);
        assert_eq!(column(&t), vec![Some(0.99), Some(0.005), Some(1.0)]);
    }

    #[test]
    fn fractional_column_untouched() {
        let mut t = table(vec![0.99.into(), 1.0.into(), 0.0.into()]);
        let report = normalize_percent_columns(&mut t, &percent());
        assert!(report.rescaled.is_empty());
        assert_eq!(column(&t), vec![Some(0.99), Some(1.0), Some(0.0)]);
    }

    #[test]
    fn idempotent_on_fractions() {
        let mut t = table(vec![99.5.into(), 97.0.into()]);
        normalize_percent_columns(&mut t, &percent());
        let once = t.clone();
        let report = normalize_percent_columns(&mut t, &percent());
        assert!(report.rescaled.is_empty());
        assert_eq!(t, once);
    }

    #[test]
    fn unparseable_values_become_missing() {
        let mut t = table(vec![Value::text("99,5"), Value::text("sem leitura"), Value::Empty, Value::text("98")]);
        let report = normalize_percent_columns(&mut t, &percent());
        assert_eq!(report.coercion_failures, vec![("Disponibilidade".to_string(), 1)]);
        assert_eq!(column(&t), vec![Some(0.995), None, None, Some(0.98)]);
        assert!(t.get(1, 0).is_empty());
    }

    #[test]
    fn absent_column_reported() {
        let mut t = table(vec![0.9.into()]);
        let report = normalize_percent_columns(&mut t, &["SLA disponibilidade".to_string()]);
        assert_eq!(report.absent, vec!["SLA disponibilidade".to_string()]);
        assert_eq!(column(&t), vec![Some(0.9)]);
    }
}
