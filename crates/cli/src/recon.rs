//! `previa run` / `previa validate`: config-driven Prévia x Base reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use previa_recon::model::{ReconResult, Table};
use previa_recon::{ReconConfig, ReconInput};

use crate::exit_codes::{EXIT_ERROR, EXIT_RECON_MISMATCH};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile a preview report against one or more base files
    #[command(after_help = "\
Inputs may be CSV/TSV or Excel/ODS. Every sheet of every base file is stacked
into one base table.

Examples:
  previa run previa.xlsx base.xlsx
  previa run previa.csv base-sp.csv base-rj.csv --config marco.recon.toml
  previa run previa.xlsx base.xlsx --output validacao_completa.xlsx
  previa run previa.xlsx base.xlsx --json | jq .summary
  previa run previa.xlsx base.xlsx --strict")]
    Run {
        /// Preview report (the monthly SLA measurements)
        preview: PathBuf,

        /// Base file(s) with the contracted circuits
        #[arg(required = true, num_args = 1..)]
        base: Vec<PathBuf>,

        /// Path to a .recon.toml config file (defaults apply without one)
        #[arg(long, short = 'c', env = "PREVIA_CONFIG")]
        config: Option<PathBuf>,

        /// Write the reconciled workbook (.xlsx)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Output JSON to stdout in addition to the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        json_output: Option<PathBuf>,

        /// Exit 5 when any SLA breach or identifier mismatch is found
        #[arg(long)]
        strict: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  previa validate marco.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { preview, base, config, output, json, json_output, strict } => {
            cmd_recon_run(preview, base, config, output, json, json_output, strict)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

/// Config plus the directory its relative output paths resolve against.
struct LoadedConfig {
    config: ReconConfig,
    base_dir: PathBuf,
}

fn load_config(path: Option<&Path>) -> Result<LoadedConfig, CliError> {
    let Some(path) = path else {
        tracing::debug!("no config file; using defaults");
        return Ok(LoadedConfig {
            config: ReconConfig::default(),
            base_dir: PathBuf::from("."),
        });
    };

    let config_str = std::fs::read_to_string(path)
        .map_err(|e| CliError::args(format!("cannot read config {}: {e}", path.display())))?;
    let config = ReconConfig::from_toml(&config_str).map_err(CliError::recon)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    Ok(LoadedConfig { config, base_dir })
}

fn require_file(path: &Path, role: &str) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::args(format!("{role} file not found: {}", path.display()))
            .with_hint("pass the path to a .csv, .xlsx, .xls or .ods file"))
    }
}

fn read_preview(path: &Path) -> Result<Table, CliError> {
    require_file(path, "preview")?;
    previa_io::read_table(path).map_err(CliError::runtime)
}

fn read_base(paths: &[PathBuf]) -> Result<Vec<Table>, CliError> {
    let mut sheets = Vec::new();
    for path in paths {
        require_file(path, "base")?;
        for sheet in previa_io::read_tables(path).map_err(CliError::runtime)? {
            tracing::debug!(
                "base {}: sheet '{}' with {} row(s)",
                path.display(),
                sheet.name,
                sheet.table.len()
            );
            sheets.push(sheet.table);
        }
    }

    if sheets.is_empty() {
        return Err(CliError::runtime("base files contain no sheet with data"));
    }
    Ok(sheets)
}

fn cmd_recon_run(
    preview_path: PathBuf,
    base_paths: Vec<PathBuf>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    json_output: bool,
    json_file: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let LoadedConfig { config, base_dir } = load_config(config_path.as_deref())?;

    let input = ReconInput {
        preview: read_preview(&preview_path)?,
        base_sheets: read_base(&base_paths)?,
    };

    let result = previa_recon::run(&config, &input).map_err(CliError::recon)?;

    // Flags resolve against the working directory, config paths against the config file
    let xlsx_path = output.or_else(|| config.output.xlsx.as_ref().map(|p| base_dir.join(p)));
    let json_path = json_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));

    if let Some(ref path) = xlsx_path {
        let export = previa_io::xlsx::export(&result, path).map_err(CliError::runtime)?;
        tracing::info!("xlsx export: {}", export.summary());
        eprintln!("wrote {}", path.display());
    }

    if json_output || json_path.is_some() {
        let json_str = serde_json::to_string_pretty(&result).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;

        if let Some(ref path) = json_path {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }

        if json_output {
            println!("{json_str}");
        }
    }

    print_summary(&result);

    if strict {
        let s = &result.summary;
        if s.sla_breached > 0 || s.extra_in_preview > 0 || s.missing_from_preview > 0 {
            return Err(CliError {
                code: EXIT_RECON_MISMATCH,
                message: format!(
                    "strict: {} breach(es), {} extra, {} missing",
                    s.sla_breached, s.extra_in_preview, s.missing_from_preview
                ),
                hint: None,
            });
        }
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "'{}': {} row(s) reconciled ({} preview, {} base)",
        result.meta.config_name, s.preview_rows, s.input_preview_rows, s.base_rows,
    );
    eprintln!(
        "SLA: {} breached, {} within, {} missing data",
        s.sla_breached, s.sla_within, s.sla_missing_data,
    );

    let statuses: Vec<String> = s
        .circuit_status_counts
        .iter()
        .map(|(status, count)| format!("{status}={count}"))
        .collect();
    eprintln!("circuit status: {}", statuses.join(", "));

    eprintln!("{}", id_list("extra in preview", &result.extra_in_preview));
    eprintln!("{}", id_list("missing from preview", &result.missing_from_preview));
    if s.duplicate_circuits > 0 {
        eprintln!(
            "{} preview circuit(s) matched more than one base row (duplicates = {})",
            s.duplicate_circuits, result.meta.duplicates,
        );
    }

    let totals = &result.billing.totals;
    eprintln!(
        "penalty total: {:.2}; alternative discount total: {:.2}; net billing: {:.2} ({:.2}% withheld)",
        s.penalty_total,
        s.alternative_discount_total,
        totals.net_total,
        totals.discount_ratio() * 100.0,
    );
}

fn id_list<'a>(label: &str, ids: impl IntoIterator<Item = &'a String>) -> String {
    let ids: Vec<&str> = ids.into_iter().map(|s| s.as_str()).collect();
    if ids.is_empty() {
        format!("{label}: none")
    } else {
        format!("{label} ({}): {}", ids.len(), ids.join(", "))
    }
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::args(format!("cannot read config: {e}")))?;

    match ReconConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: recon '{}' keyed on '{}', carrying base position(s) {:?}, duplicates = {}",
                config.name,
                config.columns.circuit,
                config.base.carry_positions,
                config.base.duplicates,
            );
            Ok(())
        }
        Err(e) => Err(CliError::config(e.to_string())),
    }
}
