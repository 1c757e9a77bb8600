// Excel import (every sheet as a table) and reconciled workbook export

use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use previa_recon::model::{
    BillingSheet, ReconResult, ReconSummary, Table, Value,
};

/// Sheet names of the exported workbook.
pub const SHEET_RECONCILED: &str = "Validação";
pub const SHEET_BILLING: &str = "Faturamento";
pub const SHEET_SUMMARY: &str = "Resumo";
pub const SHEET_CIRCUITS: &str = "Circuitos";

/// One worksheet read as a table.
#[derive(Debug, Clone)]
pub struct SheetTable {
    pub name: String,
    pub table: Table,
}

#[derive(Debug, Default)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub rows_exported: usize,
    pub export_duration_ms: u128,
}

impl ExportResult {
    pub fn summary(&self) -> String {
        format!(
            "{} sheet(s), {} row(s) in {}ms",
            self.sheets_exported, self.rows_exported, self.export_duration_ms
        )
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Read every sheet of an Excel/ODS file (xlsx, xlsm, xls, xlsb, ods).
///
/// The first row of each sheet's used range is the header row. Columns before
/// the used range are kept as unnamed empty columns so positions match the
/// sheet's letters (A = 0).
pub fn import(path: &Path) -> Result<Vec<SheetTable>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

        let (height, width) = range.get_size();
        if height == 0 || width == 0 {
            log::debug!("sheet '{sheet_name}' is empty; skipped");
            continue;
        }

        let col_offset = range.start().map(|(_, c)| c as usize).unwrap_or(0);
        let mut rows = range.rows();

        let mut columns: Vec<String> = (0..col_offset).map(unnamed).collect();
        if let Some(header) = rows.next() {
            for (i, cell) in header.iter().enumerate() {
                columns.push(header_label(cell, col_offset + i));
            }
        }

        let mut table = Table::new(columns);
        for row in rows {
            if row.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            let mut values: Vec<Value> = vec![Value::Empty; col_offset];
            values.extend(row.iter().map(cell_value));
            table.push_row(values);
        }

        log::debug!("sheet '{sheet_name}': {} row(s), {} column(s)", table.len(), table.width());
        sheets.push(SheetTable {
            name: sheet_name.clone(),
            table,
        });
    }

    Ok(sheets)
}

fn unnamed(col: usize) -> String {
    format!("Unnamed: {col}")
}

fn header_label(cell: &Data, col: usize) -> String {
    match cell_value(cell).key() {
        Some(label) => label,
        None => unnamed(col),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        // #N/A, #DIV/0! and friends carry no usable value
        Data::Error(_) => Value::Empty,
        // Serial date number (1900 system)
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write the reconciled table, billing sheet, summary and circuit lists.
pub fn export(result: &ReconResult, path: &Path) -> Result<ExportResult, String> {
    let start_time = Instant::now();
    let mut export = ExportResult::default();
    let mut xlsx_workbook = XlsxWorkbook::new();

    let header = Format::new().set_bold();

    {
        let worksheet = add_sheet(&mut xlsx_workbook, SHEET_RECONCILED)?;
        write_table(worksheet, &result.table, &header)?;
        export.rows_exported += result.table.len();
    }
    {
        let worksheet = add_sheet(&mut xlsx_workbook, SHEET_BILLING)?;
        write_billing(worksheet, &result.billing, &header)?;
        export.rows_exported += result.billing.lines.len();
    }
    {
        let worksheet = add_sheet(&mut xlsx_workbook, SHEET_SUMMARY)?;
        write_summary(worksheet, &result.summary, &header)?;
    }
    {
        let worksheet = add_sheet(&mut xlsx_workbook, SHEET_CIRCUITS)?;
        write_circuits(worksheet, result, &header)?;
    }
    export.sheets_exported = 4;

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;

    export.export_duration_ms = start_time.elapsed().as_millis();
    Ok(export)
}

fn add_sheet<'a>(workbook: &'a mut XlsxWorkbook, name: &str) -> Result<&'a mut Worksheet, String> {
    workbook
        .add_worksheet()
        .set_name(name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))
}

fn cell_err(row: u32, col: u16, e: impl std::fmt::Display) -> String {
    format!("Failed to write cell ({}, {}): {}", row, col, e)
}

fn write_header(worksheet: &mut Worksheet, labels: &[&str], format: &Format) -> Result<(), String> {
    for (col, label) in labels.iter().enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, *label, format)
            .map_err(|e| cell_err(0, col, e))?;
    }
    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to freeze header: {}", e))?;
    Ok(())
}

fn write_value(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), String> {
    match value {
        Value::Empty => return Ok(()),
        Value::Number(n) => worksheet.write_number(row, col, *n),
        Value::Text(s) => worksheet.write_string(row, col, s),
        Value::Bool(b) => worksheet.write_boolean(row, col, *b),
    }
    .map_err(|e| cell_err(row, col, e))?;
    Ok(())
}

fn write_optional(worksheet: &mut Worksheet, row: u32, col: u16, value: Option<f64>) -> Result<(), String> {
    write_value(worksheet, row, col, &Value::from(value))
}

fn write_table(worksheet: &mut Worksheet, table: &Table, header: &Format) -> Result<(), String> {
    let labels: Vec<&str> = table.columns.iter().map(|s| s.as_str()).collect();
    write_header(worksheet, &labels, header)?;

    for (r, row) in table.rows.iter().enumerate() {
        let row32 = r as u32 + 1;
        for (c, value) in row.iter().enumerate() {
            write_value(worksheet, row32, c as u16, value)?;
        }
    }

    if !table.is_empty() && table.width() > 0 {
        worksheet
            .autofilter(0, 0, table.len() as u32, table.width() as u16 - 1)
            .map_err(|e| format!("Failed to set autofilter: {}", e))?;
    }
    Ok(())
}

fn write_billing(worksheet: &mut Worksheet, billing: &BillingSheet, header: &Format) -> Result<(), String> {
    write_header(
        worksheet,
        &[
            "Circuito",
            "Status_Circuito",
            "SLA_Status",
            "Disponibilidade",
            "SLA disponibilidade",
            "Valor Contratado",
            "Penalidade",
            "Desconto_Alternativo",
            "Valor Líquido",
        ],
        header,
    )?;

    let mut row = 1u32;
    for line in &billing.lines {
        worksheet
            .write_string(row, 0, &line.circuit)
            .map_err(|e| cell_err(row, 0, e))?;
        worksheet
            .write_string(row, 1, line.circuit_status.label())
            .map_err(|e| cell_err(row, 1, e))?;
        worksheet
            .write_string(row, 2, line.sla_status.label())
            .map_err(|e| cell_err(row, 2, e))?;
        write_optional(worksheet, row, 3, line.availability)?;
        write_optional(worksheet, row, 4, line.sla_threshold)?;
        write_optional(worksheet, row, 5, line.contracted_value)?;
        write_optional(worksheet, row, 6, Some(line.penalty))?;
        write_optional(worksheet, row, 7, Some(line.alternative_discount))?;
        write_optional(worksheet, row, 8, line.net_value)?;
        row += 1;
    }

    let totals = &billing.totals;
    worksheet
        .write_string_with_format(row, 0, "Total", header)
        .map_err(|e| cell_err(row, 0, e))?;
    for (col, value) in [
        (5u16, totals.contracted_total),
        (6, totals.penalty_total),
        (7, totals.alternative_discount_total),
        (8, totals.net_total),
    ] {
        worksheet
            .write_number_with_format(row, col, value, header)
            .map_err(|e| cell_err(row, col, e))?;
    }
    Ok(())
}

fn write_summary(worksheet: &mut Worksheet, summary: &ReconSummary, header: &Format) -> Result<(), String> {
    write_header(worksheet, &["Métrica", "Valor"], header)?;

    let mut entries: Vec<(String, f64)> = vec![
        ("Total linhas prévia".into(), summary.preview_rows as f64),
        ("Total linhas base (todas abas)".into(), summary.base_rows as f64),
        ("SLA Excedido".into(), summary.sla_breached as f64),
        ("SLA Não Excedido".into(), summary.sla_within as f64),
        ("SLA Dados faltando/erro".into(), summary.sla_missing_data as f64),
        ("Circuitos extras na prévia".into(), summary.extra_in_preview as f64),
        ("Circuitos faltando na prévia".into(), summary.missing_from_preview as f64),
        ("Circuitos com duplicata na base".into(), summary.duplicate_circuits as f64),
        ("Total Penalidade".into(), summary.penalty_total),
        ("Total Desconto_Alternativo".into(), summary.alternative_discount_total),
    ];
    for (status, count) in &summary.circuit_status_counts {
        entries.push((format!("Status {status}"), *count as f64));
    }

    for (i, (label, value)) in entries.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet
            .write_string(row, 0, label)
            .map_err(|e| cell_err(row, 0, e))?;
        worksheet
            .write_number(row, 1, *value)
            .map_err(|e| cell_err(row, 1, e))?;
    }
    Ok(())
}

fn write_circuits(worksheet: &mut Worksheet, result: &ReconResult, header: &Format) -> Result<(), String> {
    write_header(worksheet, &["Extras na Prévia", "Faltando na Prévia"], header)?;

    for (col, ids) in [(0u16, &result.extra_in_preview), (1, &result.missing_from_preview)] {
        for (i, id) in ids.iter().enumerate() {
            let row = i as u32 + 1;
            worksheet
                .write_string(row, col, id)
                .map_err(|e| cell_err(row, col, e))?;
        }
    }
    Ok(())
}
