//! pipeline-runner: headless batch runner for the banking risk pipeline.
//!
//! Usage:
//!   pipeline-runner --input banking.csv --db risk.db --out ./exports
//!   pipeline-runner --db risk.db --out ./exports --export-only
//!   pipeline-runner --input banking.csv --json
//!   pipeline-runner --input banking.csv --reference-date 2025-06-30
//!
//! Engagement is measured against `--reference-date`, else the
//! `reference_date` in `{data-dir}/pipeline_config.json`, else today. Only a
//! pinned date makes two runs of the same extract on different days agree.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use bankrisk_core::{
    aggregation::{KpiValue, RiskDistribution},
    config::{PipelineConfig, CONFIG_FILE},
    export::{export_latest, ExportManifest},
    extract::read_csv,
    pipeline::{Pipeline, RunOutcome},
    store::SnapshotStore,
    types::RunId,
};
use std::env;
use std::path::{Path, PathBuf};

/// What `--json` prints on stdout.
#[derive(serde::Serialize)]
struct RunReport {
    run_id: Option<RunId>,
    source: Option<String>,
    reference_date: Option<String>,
    records_extracted: usize,
    records_loaded: usize,
    records_rejected: usize,
    kpi_summary: Vec<KpiValue>,
    risk_distribution: Option<RiskDistribution>,
    exported_files: Vec<String>,
}

impl RunReport {
    fn new(
        outcome: Option<&RunOutcome>,
        reference_date: Option<String>,
        risk_distribution: Option<RiskDistribution>,
        export: Option<&ExportManifest>,
    ) -> Self {
        Self {
            run_id: outcome.map(|o| o.run_id).or(export.map(|e| e.run_id)),
            source: outcome.map(|o| o.source.clone()),
            reference_date,
            records_extracted: outcome.map_or(0, |o| o.records_extracted),
            records_loaded: outcome.map_or(0, |o| o.records_loaded),
            records_rejected: outcome.map_or(0, |o| o.records_rejected),
            kpi_summary: outcome.map(|o| o.kpi_summary.clone()).unwrap_or_default(),
            risk_distribution,
            exported_files: export
                .map(|e| e.files.iter().map(|f| f.display().to_string()).collect())
                .unwrap_or_default(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = string_arg(&args, "--input");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let out_dir = PathBuf::from(string_arg(&args, "--out").unwrap_or("./exports"));
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let export_only = args.iter().any(|a| a == "--export-only");
    let json = args.iter().any(|a| a == "--json");
    let reference_override = string_arg(&args, "--reference-date")
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .context("--reference-date must be YYYY-MM-DD")?;

    if input.is_none() && !export_only {
        bail!("--input <csv> is required unless --export-only is given");
    }

    if !json {
        println!("Banking risk pipeline: pipeline-runner");
        println!("  input:     {}", input.unwrap_or("-"));
        println!("  db:        {db}");
        println!("  out:       {}", out_dir.display());
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let mut store = SnapshotStore::open(db).with_context(|| format!("opening store {db}"))?;
    store.migrate()?;

    let mut outcome = None;
    let mut reference_date = None;
    if let (Some(input), false) = (input, export_only) {
        let mut config = load_config(data_dir)?;
        if reference_override.is_some() {
            config.reference_date = reference_override;
        }
        if config.reference_date.is_none() {
            log::warn!("No reference date pinned, engagement is measured against today");
        }
        let pipeline = Pipeline::new(config)?;
        reference_date = Some(pipeline.reference_date().to_string());
        if !json {
            println!("  reference date: {}", pipeline.reference_date());
            println!();
        }

        let batch = read_csv(Path::new(input))?;
        let result = pipeline.run(&mut store, batch)?;
        log::info!("run={} committed", result.run_id);
        outcome = Some(result);
    }

    let export = export_latest(&store, &out_dir)?;
    let distribution = store.latest_risk_distribution()?;

    if json {
        let report = RunReport::new(outcome.as_ref(), reference_date, distribution, export.as_ref());
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(outcome.as_ref(), distribution.as_ref(), export.as_ref());
    }
    Ok(())
}

/// `{data_dir}/pipeline_config.json` when present, built-in defaults otherwise.
/// A file that exists but does not parse or validate is an error.
fn load_config(data_dir: &str) -> Result<PipelineConfig> {
    if Path::new(data_dir).join(CONFIG_FILE).exists() {
        return Ok(PipelineConfig::load(data_dir)?);
    }
    log::warn!("No {CONFIG_FILE} in {data_dir}, using built-in defaults measured against today");
    let mut config = PipelineConfig::default_test();
    config.reference_date = None;
    Ok(config)
}

fn print_summary(
    outcome: Option<&RunOutcome>,
    distribution: Option<&RiskDistribution>,
    export: Option<&ExportManifest>,
) {
    if let Some(o) = outcome {
        println!("=== RUN SUMMARY ===");
        println!("  run_id:     {}", o.run_id);
        println!("  source:     {}", o.source);
        println!("  extracted:  {}", o.records_extracted);
        println!("  loaded:     {}", o.records_loaded);
        println!("  rejected:   {}", o.records_rejected);
        println!();
        println!("=== KPI SUMMARY ===");
        for k in &o.kpi_summary {
            println!("  {:<26} {}", k.kpi_name, k.formatted);
        }
        println!();
    }

    if let Some(d) = distribution {
        println!("=== RISK DISTRIBUTION ===");
        for (label, value) in d.rows() {
            println!("  {label:<26} {value:.2}");
        }
        println!();
    }

    match export {
        Some(e) => {
            println!("=== EXPORT (run {}) ===", e.run_id);
            for f in &e.files {
                println!("  {}", f.display());
            }
        }
        None => println!("  (No successful run to export yet)"),
    }
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
