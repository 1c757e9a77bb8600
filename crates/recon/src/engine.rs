use log::{debug, info, warn};

use crate::billing::build_billing_sheet;
use crate::classify::{classify_circuit, classify_sla};
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::join::{left_join, select_base_columns};
use crate::model::{
    CircuitStatus, ReconInput, ReconMeta, ReconResult, ReconciledRow, SlaStatus, Table, Value,
    ALTERNATIVE_DISCOUNT_COLUMN, CIRCUIT_STATUS_COLUMN, PENALTY_COLUMN, SLA_STATUS_COLUMN,
};
use crate::normalize::{coerce_column, normalize_percent_columns, trim_labels};
use crate::penalty::compute_penalty;
use crate::reconcile::{identifier_set, reconcile_sets};
use crate::summary::compute_summary;

/// Per preview row, before the join.
struct PreviewOutcome {
    circuit: Option<String>,
    availability: Option<f64>,
    sla_threshold: Option<f64>,
    sla_status: SlaStatus,
    circuit_status: CircuitStatus,
}

/// Run one reconciliation. Returns the reconciled table, typed rows, summary
/// and billing sheet, or the single error that stopped the run.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    let mut preview = input.preview.clone();
    trim_labels(&mut preview);
    let base = combine_base_sheets(&input.base_sheets);

    let cols = &config.columns;
    let circuit_col = require_column(&preview, "preview", &cols.circuit)?;
    let availability_col = require_column(&preview, "preview", &cols.availability)?;
    let threshold_col = require_column(&preview, "preview", &cols.sla_threshold)?;
    let base_circuit_col = require_column(&base, "base", cols.base_circuit())?;

    let report = normalize_percent_columns(&mut preview, &config.percent_columns());
    debug!(
        "normalized: rescaled {:?}, coercion failures {:?}, not in preview {:?}",
        report.rescaled, report.coercion_failures, report.absent
    );

    let base_ids = identifier_set(&base, base_circuit_col);
    let diff = reconcile_sets(&identifier_set(&preview, circuit_col), &base_ids);
    debug!(
        "identifiers: {} extra in preview, {} missing from preview",
        diff.extra_in_preview.len(),
        diff.missing_from_preview.len()
    );

    let outcomes: Vec<PreviewOutcome> = (0..preview.len())
        .map(|i| {
            let circuit = preview.get(i, circuit_col).key();
            let availability = preview.get(i, availability_col).as_number();
            let sla_threshold = preview.get(i, threshold_col).as_number();
            PreviewOutcome {
                sla_status: classify_sla(availability, sla_threshold),
                circuit_status: classify_circuit(circuit.as_deref(), &base_ids),
                circuit,
                availability,
                sla_threshold,
            }
        })
        .collect();

    preview.push_column(
        SLA_STATUS_COLUMN,
        outcomes.iter().map(|o| Value::text(o.sla_status.label())).collect(),
    );
    preview.push_column(
        CIRCUIT_STATUS_COLUMN,
        outcomes.iter().map(|o| Value::text(o.circuit_status.label())).collect(),
    );

    let selection = select_base_columns(
        &base,
        base_circuit_col,
        &config.base.carry_positions,
        cols.contracted_value.trim(),
    )?;
    let joined = left_join(
        &preview,
        circuit_col,
        &base,
        base_circuit_col,
        &selection,
        config.base.duplicates,
        &config.base.join_suffix,
    )?;

    let mut table = joined.table;
    if let Some(c) = joined.contracted_col.filter(|&c| c != circuit_col) {
        let failures = coerce_column(&mut table, c);
        if failures > 0 {
            warn!("contracted value: {failures} value(s) not numeric, treated as missing");
        }
    }
    let mut rows = Vec::with_capacity(table.len());
    for (out_row, &src) in joined.source_rows.iter().enumerate() {
        let o = &outcomes[src];
        let contracted_value = joined
            .contracted_col
            .and_then(|c| table.get(out_row, c).as_number());
        let penalty = compute_penalty(o.sla_status, contracted_value, o.availability);

        rows.push(ReconciledRow {
            preview_row: src,
            circuit: o.circuit.clone(),
            availability: o.availability,
            sla_threshold: o.sla_threshold,
            contracted_value,
            sla_status: o.sla_status,
            circuit_status: o.circuit_status,
            penalty: penalty.contractual,
            alternative_discount: penalty.alternative,
        });
    }

    table.push_column(PENALTY_COLUMN, rows.iter().map(|r| Value::Number(r.penalty)).collect());
    table.push_column(
        ALTERNATIVE_DISCOUNT_COLUMN,
        rows.iter().map(|r| Value::Number(r.alternative_discount)).collect(),
    );

    let mut summary = compute_summary(&rows, input.preview.len(), base.len(), &diff);
    summary.duplicate_circuits = joined.duplicate_keys;
    let billing = build_billing_sheet(&rows);

    info!(
        "reconciled {} row(s): {} breached, {} within SLA, {} missing data; penalty total {:.2}",
        summary.preview_rows,
        summary.sla_breached,
        summary.sla_within,
        summary.sla_missing_data,
        summary.penalty_total,
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            duplicates: config.base.duplicates,
        },
        summary,
        extra_in_preview: diff.extra_in_preview,
        missing_from_preview: diff.missing_from_preview,
        rows,
        table,
        billing,
    })
}

/// Trim each sheet's labels and stack the sheets into one table.
pub fn combine_base_sheets(sheets: &[Table]) -> Table {
    let trimmed: Vec<Table> = sheets
        .iter()
        .map(|sheet| {
            let mut sheet = sheet.clone();
            trim_labels(&mut sheet);
            sheet
        })
        .collect();
    Table::concat(&trimmed)
}

fn require_column(table: &Table, name: &str, label: &str) -> Result<usize, ReconError> {
    table
        .column_index(label.trim())
        .ok_or_else(|| ReconError::MissingColumn {
            table: name.into(),
            column: label.trim().into(),
        })
}

/// Load CSV text into a table. The first record is the header row; empty
/// fields are `Empty` and everything else stays text until a stage coerces it.
pub fn load_csv_table(csv_data: &str) -> Result<Table, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Empty
                } else {
                    Value::text(field)
                }
            })
            .collect();
        table.push_row(row);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicatePolicy;

    const PREVIEW_CSV: &str = "\
Circuito ,Disponibilidade,SLA disponibilidade,Observação
C1,95,99,
C2,99,99,
C3,97,99,novo
,90,99,sem id
C5,,99,sem leitura
";

    const BASE_SHEET_1: &str = "\
Circuito,Cliente,UF,Cidade,Contrato,Velocidade,Tecnologia,Valor Contratado
C1,ACME,SP,Campinas,K-1,100M,Fibra,1000
C2,Beta,RJ,Niterói,K-2,50M,Rádio,400
";

    const BASE_SHEET_2: &str = "\
Circuito,Cliente,UF,Cidade,Contrato,Velocidade,Tecnologia,Valor Contratado
C4,Gama,MG,Uberaba,K-4,20M,Satélite,250
C5,Delta,PR,Londrina,K-5,10M,Fibra,300
";

    fn input() -> ReconInput {
        ReconInput {
            preview: load_csv_table(PREVIEW_CSV).unwrap(),
            base_sheets: vec![
                load_csv_table(BASE_SHEET_1).unwrap(),
                load_csv_table(BASE_SHEET_2).unwrap(),
            ],
        }
    }

    #[test]
    fn load_csv_basic() {
        let t = load_csv_table(PREVIEW_CSV).unwrap();
        assert_eq!(t.len(), 5);
        assert_eq!(t.columns[0], "Circuito ");
        assert_eq!(t.get(0, 1), &Value::text("95"));
        assert!(t.get(3, 0).is_empty());
        assert!(t.get(0, 3).is_empty());
    }

    #[test]
    fn load_csv_ragged_rows_padded() {
        let t = load_csv_table("a,b,c\n1\n1,2,3\n").unwrap();
        assert_eq!(t.len(), 2);
        assert!(t.get(0, 2).is_empty());
    }

    #[test]
    fn end_to_end() {
        let result = run(&ReconConfig::default(), &input()).unwrap();
        let s = &result.summary;

        assert_eq!(s.preview_rows, 5);
        assert_eq!(s.base_rows, 4);
        assert_eq!(s.sla_breached, 3);
        assert_eq!(s.sla_within, 1);
        assert_eq!(s.sla_missing_data, 1);
        assert_eq!(result.extra_in_preview.iter().collect::<Vec<_>>(), vec!["C3"]);
        assert_eq!(result.missing_from_preview.iter().collect::<Vec<_>>(), vec!["C4"]);

        let c1 = &result.rows[0];
        assert_eq!(c1.sla_status, SlaStatus::Breached);
        assert_eq!(c1.circuit_status, CircuitStatus::MatchedInBase);
        assert_eq!(c1.contracted_value, Some(1000.0));
        assert!((c1.penalty + 50.0).abs() < 1e-9);
        assert!((c1.alternative_discount - 50.0).abs() < 1e-9);

        let c2 = &result.rows[1];
        assert_eq!(c2.sla_status, SlaStatus::WithinSla);
        assert_eq!(c2.penalty, 0.0);

        // Extra circuit: breached but no contracted value
        let c3 = &result.rows[2];
        assert_eq!(c3.circuit_status, CircuitStatus::ExtraInPreview);
        assert_eq!(c3.sla_status, SlaStatus::Breached);
        assert_eq!(c3.contracted_value, None);
        assert_eq!(c3.penalty, 0.0);

        assert_eq!(result.rows[3].circuit_status, CircuitStatus::IdentifierAbsent);
        assert_eq!(result.rows[4].sla_status, SlaStatus::MissingData);
        assert_eq!(result.rows[4].contracted_value, Some(300.0));
        assert_eq!(result.rows[4].penalty, 0.0);
    }

    #[test]
    fn output_table_layout() {
        let result = run(&ReconConfig::default(), &input()).unwrap();
        let t = &result.table;
        assert_eq!(
            t.columns,
            vec![
                "Circuito",
                "Disponibilidade",
                "SLA disponibilidade",
                "Observação",
                SLA_STATUS_COLUMN,
                CIRCUIT_STATUS_COLUMN,
                "Velocidade",
                "Tecnologia",
                "Valor Contratado",
                PENALTY_COLUMN,
                ALTERNATIVE_DISCOUNT_COLUMN,
            ]
        );
        assert_eq!(t.get(0, 4), &Value::text("Excedido"));
        assert_eq!(t.get(1, 4), &Value::text("Não Excedido"));
        assert_eq!(t.get(4, 4), &Value::text("Dados faltando"));
        assert_eq!(t.get(0, 5), &Value::text("OK"));
        assert_eq!(t.get(2, 5), &Value::text("Extra na Prévia"));
        assert_eq!(t.get(3, 5), &Value::text("Circuito ausente"));
        assert_eq!(t.get(1, 1), &Value::Number(0.99));
        assert_eq!(t.get(2, 9), &Value::Number(0.0));
        // Contracted values joined from CSV text come out numeric
        assert_eq!(t.get(0, 8), &Value::Number(1000.0));
        assert!(t.get(2, 8).is_empty());
    }

    #[test]
    fn missing_required_preview_column() {
        let mut inp = input();
        inp.preview.columns[2] = "SLA".into();
        let err = run(&ReconConfig::default(), &inp).unwrap_err();
        assert!(matches!(
            err,
            ReconError::MissingColumn { ref table, ref column } if table == "preview" && column == "SLA disponibilidade"
        ));
    }

    #[test]
    fn missing_base_identifier() {
        let mut inp = input();
        for sheet in &mut inp.base_sheets {
            sheet.columns[0] = "ID".into();
        }
        let err = run(&ReconConfig::default(), &inp).unwrap_err();
        assert!(err.to_string().contains("base table"));
    }

    #[test]
    fn no_contracted_column_gives_zero_penalties() {
        let mut inp = input();
        for sheet in &mut inp.base_sheets {
            sheet.columns[7] = "Observações".into();
        }
        let result = run(&ReconConfig::default(), &inp).unwrap();
        assert_eq!(result.summary.sla_breached, 3);
        assert!(result.rows.iter().all(|r| r.penalty == 0.0 && r.alternative_discount == 0.0));
        assert_eq!(result.summary.penalty_total, 0.0);
    }

    #[test]
    fn duplicate_policy_recorded_in_meta() {
        let mut config = ReconConfig::default();
        config.base.duplicates = DuplicatePolicy::FirstMatch;
        let result = run(&config, &input()).unwrap();
        assert_eq!(result.meta.duplicates, DuplicatePolicy::FirstMatch);
        assert_eq!(result.billing.lines.len(), 4);
    }
}
