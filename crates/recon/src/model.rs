use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::config::DuplicatePolicy;

/// Labels of the columns the engine appends to the preview table.
pub const SLA_STATUS_COLUMN: &str = "SLA_Status";
pub const CIRCUIT_STATUS_COLUMN: &str = "Status_Circuito";
pub const PENALTY_COLUMN: &str = "Penalidade";
pub const ALTERNATIVE_DISCOUNT_COLUMN: &str = "Desconto_Alternativo";

// ---------------------------------------------------------------------------
// Cells + tables
// ---------------------------------------------------------------------------

/// A single cell. `Empty` is "missing".
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

static EMPTY: Value = Value::Empty;

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric view of the cell. Unparseable text, booleans and non-finite
    /// numbers are `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Identifier form: trimmed string, integral numbers without decimals.
    /// `None` for empty cells and blank text.
    pub fn key(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Self::Number(n) => Some(format_number(*n)),
            Self::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map(Self::Number).unwrap_or(Self::Empty)
    }
}

/// Parse a numeric cell. Accepts a decimal comma when the text has no dot.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = match trimmed.parse::<f64>() {
        Ok(n) => Some(n),
        Err(_) if trimmed.contains(',') && !trimmed.contains('.') => {
            trimmed.replace(',', ".").parse::<f64>().ok()
        }
        Err(_) => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Column-labelled rows. Every row is kept exactly `columns.len()` wide.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn get(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| r.get(col).unwrap_or(&EMPTY))
    }

    /// Append a derived column. `values` shorter than the table are padded
    /// with `Empty`.
    pub fn push_column(&mut self, label: impl Into<String>, values: Vec<Value>) -> usize {
        debug_assert!(values.len() <= self.rows.len());
        self.columns.push(label.into());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().unwrap_or_default());
        }
        self.columns.len() - 1
    }

    /// `label`, or `label` + `suffix` (repeated) until it no longer collides.
    pub fn free_label(&self, label: &str, suffix: &str) -> String {
        let mut candidate = label.to_string();
        while self.column_index(&candidate).is_some() {
            candidate.push_str(suffix);
        }
        candidate
    }

    /// Stack several tables. Columns align by label and occurrence: the k-th
    /// column named `x` in one sheet lines up with the k-th `x` of another, so
    /// a repeated header keeps its own slot and later positions do not shift.
    /// The result carries the union of slots in first-seen order, with `Empty`
    /// where a sheet lacks a column.
    pub fn concat(tables: &[Table]) -> Table {
        let mut slots: Vec<(&str, usize)> = Vec::new();
        let mut seen: HashSet<(&str, usize)> = HashSet::new();
        for table in tables {
            for slot in label_slots(&table.columns) {
                if seen.insert(slot) {
                    slots.push(slot);
                }
            }
        }

        let mut out = Table::new(slots.iter().map(|(label, _)| label.to_string()).collect());
        for table in tables {
            let positions: HashMap<(&str, usize), usize> = label_slots(&table.columns)
                .into_iter()
                .enumerate()
                .map(|(i, slot)| (slot, i))
                .collect();
            let mapping: Vec<Option<usize>> =
                slots.iter().map(|slot| positions.get(slot).copied()).collect();
            for row in &table.rows {
                let merged = mapping
                    .iter()
                    .map(|src| src.and_then(|i| row.get(i)).cloned().unwrap_or_default())
                    .collect();
                out.rows.push(merged);
            }
        }
        out
    }
}

/// Each label paired with how many times it already appeared to its left.
fn label_slots(columns: &[String]) -> Vec<(&str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    columns
        .iter()
        .map(|label| {
            let n = counts.entry(label.as_str()).or_insert(0);
            let slot = (label.as_str(), *n);
            *n += 1;
            slot
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The two datasets of one run, already parsed.
#[derive(Debug, Clone)]
pub struct ReconInput {
    pub preview: Table,
    /// Every sheet of the base workbook, in workbook order.
    pub base_sheets: Vec<Table>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    Breached,
    WithinSla,
    MissingData,
}

impl SlaStatus {
    /// Label written into the reconciled sheet.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Breached => "Excedido",
            Self::WithinSla => "Não Excedido",
            Self::MissingData => "Dados faltando",
        }
    }
}

impl std::fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Breached => write!(f, "breached"),
            Self::WithinSla => write!(f, "within_sla"),
            Self::MissingData => write!(f, "missing_data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    MatchedInBase,
    ExtraInPreview,
    IdentifierAbsent,
}

impl CircuitStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MatchedInBase => "OK",
            Self::ExtraInPreview => "Extra na Prévia",
            Self::IdentifierAbsent => "Circuito ausente",
        }
    }
}

impl std::fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchedInBase => write!(f, "matched_in_base"),
            Self::ExtraInPreview => write!(f, "extra_in_preview"),
            Self::IdentifierAbsent => write!(f, "identifier_absent"),
        }
    }
}

/// Typed view of one reconciled row (one per row of the output table).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledRow {
    /// Index of the preview row this output row came from.
    pub preview_row: usize,
    pub circuit: Option<String>,
    pub availability: Option<f64>,
    pub sla_threshold: Option<f64>,
    pub contracted_value: Option<f64>,
    pub sla_status: SlaStatus,
    pub circuit_status: CircuitStatus,
    pub penalty: f64,
    pub alternative_discount: f64,
}

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingLine {
    pub circuit: String,
    pub circuit_status: CircuitStatus,
    pub sla_status: SlaStatus,
    pub availability: Option<f64>,
    pub sla_threshold: Option<f64>,
    pub contracted_value: Option<f64>,
    pub penalty: f64,
    pub alternative_discount: f64,
    /// `contracted_value + penalty`; `None` without a contracted value.
    pub net_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillingTotals {
    pub lines: usize,
    pub contracted_total: f64,
    pub penalty_total: f64,
    pub alternative_discount_total: f64,
    pub net_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillingSheet {
    pub lines: Vec<BillingLine>,
    pub totals: BillingTotals,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    /// Rows of the reconciled table (after any join fan-out).
    pub preview_rows: usize,
    /// Rows of the preview table as received.
    pub input_preview_rows: usize,
    /// Rows of the base table, all sheets combined.
    pub base_rows: usize,
    pub sla_breached: usize,
    pub sla_within: usize,
    pub sla_missing_data: usize,
    pub extra_in_preview: usize,
    pub missing_from_preview: usize,
    pub circuit_status_counts: BTreeMap<String, usize>,
    /// Preview rows whose circuit matched more than one base row.
    pub duplicate_circuits: usize,
    pub penalty_total: f64,
    pub alternative_discount_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    /// Circuits in the preview but not in the base.
    pub extra_in_preview: BTreeSet<String>,
    /// Circuits in the base but not in the preview.
    pub missing_from_preview: BTreeSet<String>,
    pub rows: Vec<ReconciledRow>,
    pub table: Table,
    pub billing: BillingSheet,
}
