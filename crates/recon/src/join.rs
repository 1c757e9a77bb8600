//! Left join of base columns onto the preview table.
//!
//! Keys compare in normalized form (`Value::key`). Every preview row appears
//! in the output; a preview circuit matching several base rows is handled per
//! `DuplicatePolicy`.

use std::collections::HashMap;

use log::{debug, warn};

use crate::config::DuplicatePolicy;
use crate::error::ReconError;
use crate::model::{Table, Value};

/// Base columns carried into the preview, as base column indices.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseSelection {
    pub columns: Vec<usize>,
    /// Base index of the contracted-value column, when the base has one.
    pub contracted: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub table: Table,
    /// Preview row index of each output row.
    pub source_rows: Vec<usize>,
    /// Output column holding the joined contracted value.
    pub contracted_col: Option<usize>,
    /// Preview circuits that matched more than one base row.
    pub duplicate_keys: usize,
}

/// Resolve the base columns to join: the configured positions (skipping the
/// identifier column) followed by the contracted-value column if present and
/// not already selected.
pub fn select_base_columns(
    base: &Table,
    base_key: usize,
    positions: &[usize],
    contracted_label: &str,
) -> Result<BaseSelection, ReconError> {
    let mut columns = Vec::with_capacity(positions.len() + 1);
    for &pos in positions {
        if pos >= base.width() {
            return Err(ReconError::MissingPosition {
                position: pos,
                width: base.width(),
            });
        }
        if pos != base_key {
            columns.push(pos);
        }
    }

    let contracted = base.column_index(contracted_label);
    match contracted {
        Some(idx) if idx != base_key && !columns.contains(&idx) => columns.push(idx),
        Some(_) => {}
        None => debug!("base has no '{contracted_label}' column; penalties will be zero"),
    }

    Ok(BaseSelection { columns, contracted })
}

pub fn left_join(
    preview: &Table,
    preview_key: usize,
    base: &Table,
    base_key: usize,
    selection: &BaseSelection,
    policy: DuplicatePolicy,
    suffix: &str,
) -> Result<JoinOutput, ReconError> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, value) in base.column(base_key).enumerate() {
        if let Some(key) = value.key() {
            index.entry(key).or_default().push(i);
        }
    }

    let mut table = Table::new(preview.columns.clone());
    let mut contracted_col = None;
    for &col in &selection.columns {
        let label = table.free_label(&base.columns[col], suffix);
        table.columns.push(label);
        if selection.contracted == Some(col) {
            contracted_col = Some(table.columns.len() - 1);
        }
    }
    // The contracted column may coincide with the identifier column.
    if contracted_col.is_none() && selection.contracted == Some(base_key) {
        contracted_col = Some(preview_key);
    }

    let mut source_rows = Vec::with_capacity(preview.len());
    let mut duplicate_keys = 0;

    for (i, row) in preview.rows.iter().enumerate() {
        let key = preview.get(i, preview_key).key();
        let matches: &[usize] = key
            .as_ref()
            .and_then(|k| index.get(k))
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        if matches.len() > 1 {
            duplicate_keys += 1;
            let key = key.clone().unwrap_or_default();
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(ReconError::DuplicateKey {
                        key,
                        count: matches.len(),
                    });
                }
                DuplicatePolicy::FanOut => {
                    warn!("circuit '{key}' matches {} base rows; fanning out", matches.len());
                }
                DuplicatePolicy::FirstMatch => {
                    debug!("circuit '{key}' matches {} base rows; keeping the first", matches.len());
                }
            }
        }

        let used: &[usize] = match policy {
            DuplicatePolicy::FirstMatch => &matches[..matches.len().min(1)],
            _ => matches,
        };

        if used.is_empty() {
            let mut out = row.clone();
            out.resize(table.width(), Value::Empty);
            table.rows.push(out);
            source_rows.push(i);
            continue;
        }

        for &b in used {
            let mut out = row.clone();
            out.resize(preview.width(), Value::Empty);
            out.extend(selection.columns.iter().map(|&c| base.get(b, c).clone()));
            table.rows.push(out);
            source_rows.push(i);
        }
    }

    Ok(JoinOutput {
        table,
        source_rows,
        contracted_col,
        duplicate_keys,
    })
}
