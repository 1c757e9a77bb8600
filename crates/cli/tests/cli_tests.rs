// Drive the built `previa` binary against the recon crate's CSV fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn previa() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_previa"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG").env_remove("PREVIA_CONFIG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../recon/tests/fixtures")
        .join(name)
}

fn run_previa(args: &[&str]) -> Output {
    previa().args(args).output().expect("failed to run previa")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn fixture_args(base: &[&str]) -> Vec<String> {
    let mut args = vec!["run".to_string(), fixture("previa.csv").display().to_string()];
    args.extend(base.iter().map(|b| fixture(b).display().to_string()));
    args
}

fn run_fixture(base: &[&str], extra: &[&str]) -> Output {
    let mut args = fixture_args(base);
    args.extend(extra.iter().map(|s| s.to_string()));
    previa().args(&args).output().expect("failed to run previa")
}

#[test]
fn run_prints_human_summary() {
    let out = run_fixture(&["base-sp.csv", "base-rj.csv"], &[]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let err = stderr(&out);
    assert!(err.contains("6 row(s) reconciled"), "{err}");
    assert!(err.contains("SLA: 2 breached, 2 within, 2 missing data"), "{err}");
    assert!(err.contains("extra in preview (1): C3"), "{err}");
    assert!(err.contains("missing from preview (1): C4"), "{err}");
    assert!(err.contains("penalty total: -50.00"), "{err}");
    assert!(out.stdout.is_empty());
}

#[test]
fn run_json_on_stdout() {
    let out = run_fixture(&["base-sp.csv", "base-rj.csv"], &["--json"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["summary"]["preview_rows"], 6);
    assert_eq!(json["summary"]["missing_from_preview"], 1);
    assert_eq!(json["extra_in_preview"], serde_json::json!(["C3"]));
    assert_eq!(json["meta"]["config_name"], "Prévia x Base");
    assert_eq!(json["rows"][0]["sla_status"], "breached");
}

#[test]
fn strict_exits_5_on_breaches() {
    let out = run_fixture(&["base-sp.csv", "base-rj.csv"], &["--strict"]);
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("strict: 2 breach(es), 1 extra, 1 missing"));
}

#[test]
fn writes_workbook_and_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let xlsx = dir.path().join("validacao_completa.xlsx");
    let json = dir.path().join("result.json");

    let out = run_fixture(
        &["base-sp.csv", "base-rj.csv"],
        &[
            "--output",
            xlsx.to_str().unwrap(),
            "--json-output",
            json.to_str().unwrap(),
        ],
    );
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(xlsx.is_file());

    let sheets = previa_io::xlsx::import(&xlsx).unwrap();
    assert_eq!(sheets.len(), 4);
    assert_eq!(sheets[0].name, "Validação");

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(written["billing"]["totals"]["lines"], 6);
}

#[test]
fn config_output_paths_resolve_against_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("march.recon.toml");
    fs::copy(fixture("march.recon.toml"), &config).unwrap();

    let out = run_fixture(&["base-sp.csv", "base-rj.csv"], &["--config", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(dir.path().join("validacao_completa.xlsx").is_file());
    assert!(stderr(&out).contains("'Fechamento Março'"));
}

#[test]
fn reject_duplicates_exits_4_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("reject.recon.toml");
    fs::write(&config, "[base]\nduplicates = \"reject\"\n").unwrap();

    let out = run_fixture(
        &["base-sp.csv", "base-rj.csv", "base-dup.csv"],
        &["--config", config.to_str().unwrap()],
    );
    assert_eq!(out.status.code(), Some(4));
    let err = stderr(&out);
    assert!(err.contains("circuit 'C1' appears 2 times"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn missing_column_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let preview = dir.path().join("previa.csv");
    fs::write(&preview, "Circuito,Disponibilidade\nC1,99\n").unwrap();

    let out = run_previa(&[
        "run",
        preview.to_str().unwrap(),
        fixture("base-sp.csv").to_str().unwrap(),
    ]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("missing column 'SLA disponibilidade'"));
}

#[test]
fn missing_input_file_is_usage_error() {
    let out = run_previa(&["run", "/nonexistent/previa.csv", fixture("base-sp.csv").to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("preview file not found"));
}

#[test]
fn validate_good_and_bad_configs() {
    let out = run_previa(&["validate", fixture("march.recon.toml").to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("valid: recon 'Fechamento Março'"));

    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.recon.toml");
    fs::write(&bad, "[base]\ncarry_positions = [5, 5]\n").unwrap();
    let out = run_previa(&["validate", bad.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("more than once"));

    fs::write(&bad, "[base]\nduplicates = \"sometimes\"\n").unwrap();
    let out = run_previa(&["validate", bad.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
}
