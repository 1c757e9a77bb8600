use std::collections::BTreeSet;

use crate::model::Table;

/// Identifier differences between the two datasets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetDiff {
    /// In the preview, not in the base.
    pub extra_in_preview: BTreeSet<String>,
    /// In the base, not in the preview.
    pub missing_from_preview: BTreeSet<String>,
}

/// Distinct normalized identifiers of one column. Empty and blank cells are
/// dropped.
pub fn identifier_set(table: &Table, col: usize) -> BTreeSet<String> {
    table.column(col).filter_map(|v| v.key()).collect()
}

pub fn reconcile_sets(preview: &BTreeSet<String>, base: &BTreeSet<String>) -> SetDiff {
    SetDiff {
        extra_in_preview: preview.difference(base).cloned().collect(),
        missing_from_preview: base.difference(preview).cloned().collect(),
    }
}
