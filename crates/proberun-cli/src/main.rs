//! proberun - composite-scoring test orchestrator CLI
//!
//! ## Commands
//!
//! - `run`: execute a probe suite, write reports, exit 0 on pass and 1 on fail
//! - `list`: print the built-in probe catalog

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use proberun_core::{
    init_tracing, Orchestrator, ProbeDescriptor, ProbeResult, ReportFormat, ReportSettings,
    RunConfig, RunOutcome, DEFAULT_SCORE_METRIC,
};
use proberun_probes::{BuiltinProbe, Suite};
use tracing::{info, warn, Level};

const ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];

#[derive(Parser)]
#[command(name = "proberun")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run quality probes and gate on a composite score", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a probe suite and write reports
    Run(RunArgs),

    /// List the built-in probes
    List,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Probe families to run: ai, ui or all
    #[arg(long, default_value = "all", value_parser = parse_suite)]
    suite: Suite,

    /// Skip a probe by name (repeatable)
    #[arg(long = "disable", value_name = "PROBE")]
    disable: Vec<String>,

    /// Root directory for reports
    #[arg(long, env = "OUTPUT_DIR", default_value = "reports")]
    output_dir: PathBuf,

    /// Comma-separated report formats (json, markdown, html)
    #[arg(long, default_value = "json,markdown")]
    format: String,

    /// Do not write any reports
    #[arg(long)]
    no_report: bool,

    /// Target environment: development, staging or production
    #[arg(long, env = "TEST_ENVIRONMENT")]
    environment: Option<String>,

    /// Base URL of the system under test
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Maximum probes in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Minimum passing overall score
    #[arg(long)]
    threshold: Option<f64>,

    /// Maximum tolerated critical issues
    #[arg(long)]
    critical_issue_limit: Option<usize>,

    /// Category floor as name=value (repeatable)
    #[arg(long = "category-min", value_name = "NAME=VALUE", value_parser = parse_category_min)]
    category_min: Vec<(String, f64)>,

    /// Pause between batches in milliseconds
    #[arg(long)]
    batch_delay_ms: Option<u64>,

    /// Seed for simulated probes
    #[arg(long)]
    seed: Option<u64>,

    /// TOML run configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_suite(raw: &str) -> std::result::Result<Suite, String> {
    raw.parse::<Suite>().map_err(|e| e.to_string())
}

fn parse_category_min(raw: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing category name in '{raw}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    Ok((name.to_string(), value))
}

/// `INCLUDE_<PROBE>` toggles default to enabled; only an explicit false turns a probe off.
fn toggle_enabled(value: Option<&str>) -> bool {
    !matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("false") | Some("0") | Some("no") | Some("off")
    )
}

fn sanitize_environment(raw: &str) -> Result<String> {
    let env = raw.trim().to_lowercase();
    if ENVIRONMENTS.contains(&env.as_str()) {
        Ok(env)
    } else {
        anyhow::bail!(
            "Invalid environment '{}'; expected one of {}",
            raw,
            ENVIRONMENTS.join(", ")
        )
    }
}

/// Merge the config file, suite defaults, environment toggles and flags.
fn build_config(args: &RunArgs, lookup: impl Fn(&str) -> Option<String>) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };

    for name in &args.disable {
        name.parse::<BuiltinProbe>()
            .with_context(|| format!("Cannot disable '{name}'"))?;
    }

    let from_file = std::mem::take(&mut config.enabled_probes);
    config.enabled_probes = args
        .suite
        .probes()
        .into_iter()
        .filter(|p| from_file.is_empty() || from_file.contains(p.name()))
        .filter(|p| toggle_enabled(lookup(&p.env_toggle()).as_deref()))
        .filter(|p| !args.disable.iter().any(|d| d == p.name()))
        .map(|p| p.name().to_string())
        .collect();

    let mut minimums = args.suite.category_minimums();
    minimums.append(&mut config.category_minimums);
    minimums.extend(args.category_min.iter().cloned());
    config.category_minimums = minimums;

    if let Some(environment) = &args.environment {
        config.target.environment = environment.clone();
    }
    config.target.environment = sanitize_environment(&config.target.environment)?;
    if let Some(base_url) = &args.base_url {
        config.target.base_url = base_url.clone();
    }
    if let Some(limit) = args.concurrency {
        config.concurrency_limit = limit;
    }
    if let Some(threshold) = args.threshold {
        config.overall_threshold = threshold;
    }
    if let Some(limit) = args.critical_issue_limit {
        config.critical_issue_limit = limit;
    }
    if let Some(delay) = args.batch_delay_ms {
        config.batch_delay_ms = Some(delay);
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    Ok(config)
}

/// `<output-dir>/<suite>-<environment>-<date>`
fn report_destination(root: &Path, suite: Suite, environment: &str, date: &str) -> PathBuf {
    root.join(format!("{suite}-{environment}-{date}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Int,
    Term,
}

impl Interrupt {
    fn exit_code(self) -> u8 {
        match self {
            Interrupt::Int => 130,
            Interrupt::Term => 143,
        }
    }
}

/// Resolves on SIGINT or SIGTERM. Never resolves if no handler could be installed.
#[cfg(unix)]
async fn interrupted() -> Interrupt {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => tokio::select! {
            signal = wait_ctrl_c() => signal,
            _ = term.recv() => Interrupt::Term,
        },
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            wait_ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn interrupted() -> Interrupt {
    wait_ctrl_c().await
}

async fn wait_ctrl_c() -> Interrupt {
    match tokio::signal::ctrl_c().await {
        Ok(()) => Interrupt::Int,
        Err(e) => {
            warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending().await
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => cmd_run(&args).await,
        Commands::List => {
            cmd_list();
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn cmd_run(args: &RunArgs) -> Result<ExitCode> {
    let config = build_config(args, |key| std::env::var(key).ok())?;
    let suite = args.suite;

    let mut orchestrator = Orchestrator::new()
        .with_probes(suite.build_probes())
        .with_category_weights(suite.category_weights())
        .with_test_type(suite.test_type());

    if !args.no_report {
        let formats = ReportFormat::parse_list(&args.format)?;
        let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let destination =
            report_destination(&args.output_dir, suite, &config.target.environment, &date);
        orchestrator =
            orchestrator.with_reporting(ReportSettings::new(destination).with_formats(formats));
    }

    println!("Running {} probes against {}", suite, config.target.base_url);
    println!("Environment: {}", config.target.environment);
    println!(
        "Probes: {}",
        config
            .enabled_probes
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    let descriptors = orchestrator.descriptors();
    tokio::select! {
        outcome = orchestrator.run(config) => {
            if print_outcome(&outcome, &descriptors) {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        signal = interrupted() => {
            warn!(?signal, "Interrupted; cleaning up probes");
            let failures = orchestrator.cleanup().await;
            for failure in &failures {
                eprintln!("  cleanup: {failure}");
            }
            Ok(ExitCode::from(signal.exit_code()))
        }
    }
}

/// The metric a probe declared as its headline score.
fn headline_score(probe: &ProbeResult, descriptors: &[ProbeDescriptor]) -> Option<f64> {
    let metric = descriptors
        .iter()
        .find(|d| d.name == probe.probe_name)
        .map_or(DEFAULT_SCORE_METRIC, |d| d.score_metric.as_str());
    probe.metric(metric)
}

/// Print the run summary; returns whether the run passed.
fn print_outcome(outcome: &RunOutcome, descriptors: &[ProbeDescriptor]) -> bool {
    let result = &outcome.result;

    println!("Run ID: {}", result.run_id);
    println!("Status: {}", if result.success { "✓ PASSED" } else { "✗ FAILED" });
    println!("Duration: {}ms", result.duration_ms());
    if let Some(error) = &result.error {
        println!("Error: {error}");
    }
    println!();

    for probe in &result.probe_results {
        let status = if probe.success { "✓" } else { "✗" };
        let score = headline_score(probe, descriptors)
            .map(|s| format!("{s:.1}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} ({}, score {}, {}ms)",
            status, probe.probe_name, probe.category, score, probe.duration_ms
        );
    }

    for name in &result.skipped_probes {
        println!("  - {name} (skipped)");
    }

    println!();
    println!("Overall: {:.1}/100", result.composite_score.overall);
    for (category, score) in &result.composite_score.per_category {
        println!("  {category}: {score:.1}");
    }

    if !result.violations.is_empty() {
        println!("Violations:");
        for violation in &result.violations {
            println!("  - {}", violation.reason);
        }
    }

    if !result.recommendations.is_empty() {
        println!("Recommendations:");
        for (i, line) in result.recommendations.iter().enumerate() {
            println!("  {}. {}", i + 1, line);
        }
    }

    for report in &outcome.reports {
        match &report.result {
            Ok(path) => println!("Report ({}): {}", report.format, path.display()),
            Err(e) => eprintln!("Report ({}) failed: {}", report.format, e),
        }
    }

    info!(success = result.success, "run complete");
    result.success
}

fn cmd_list() {
    let mut by_suite: BTreeMap<String, Vec<BuiltinProbe>> = BTreeMap::new();
    for probe in BuiltinProbe::ALL {
        by_suite
            .entry(probe.family().to_string())
            .or_default()
            .push(probe);
    }

    for (family, probes) in by_suite {
        println!("{family}:");
        for probe in probes {
            println!(
                "  {:<24} {:<16} weight {:.2}  ~{}ms  ({})",
                probe.name(),
                probe.category(),
                probe.weight(),
                probe.expected_latency().as_millis(),
                probe.env_toggle()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["proberun", "run"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            Commands::List => unreachable!(),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_enable_whole_suite() {
        let config = build_config(&args(&["--suite", "ui"]), no_env).unwrap();
        assert_eq!(config.enabled_probes.len(), 4);
        assert_eq!(config.category_minimums.get("accessibility"), Some(&85.0));
        assert_eq!(config.target.environment, "development");
    }

    #[test]
    fn test_env_toggle_and_disable_flag() {
        let env: HashMap<&str, &str> = [("INCLUDE_NOVA_MODEL", "false")].into_iter().collect();
        let config = build_config(
            &args(&["--suite", "ai", "--disable", "multimodal_input"]),
            |key| env.get(key).map(|v| v.to_string()),
        )
        .unwrap();
        let enabled: Vec<_> = config.enabled_probes.iter().map(String::as_str).collect();
        assert_eq!(enabled, vec!["japanese_accuracy", "streaming_response"]);
    }

    #[test]
    fn test_unknown_disable_rejected() {
        let err = build_config(&args(&["--disable", "ghost"]), no_env).unwrap_err();
        assert!(format!("{err:#}").contains("unknown probe 'ghost'"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = build_config(
            &args(&[
                "--environment",
                " Staging ",
                "--threshold",
                "70",
                "--concurrency",
                "4",
                "--category-min",
                "functionality=90",
                "--seed",
                "17",
            ]),
            no_env,
        )
        .unwrap();
        assert_eq!(config.target.environment, "staging");
        assert_eq!(config.overall_threshold, 70.0);
        assert_eq!(config.concurrency_limit, 4);
        assert_eq!(config.category_minimums.get("functionality"), Some(&90.0));
        assert_eq!(config.seed, Some(17));
    }

    #[test]
    fn test_invalid_environment_rejected() {
        assert!(build_config(&args(&["--environment", "qa"]), no_env).is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
                enabledProbes = ["accessibility", "realtime_chat"]
                overallThreshold = 80.0
                [categoryMinimums]
                accessibility = 90.0
            "#,
        )
        .unwrap();

        let config = build_config(
            &args(&["--suite", "ui", "--config", path.to_str().unwrap(), "--threshold", "75"]),
            no_env,
        )
        .unwrap();
        assert_eq!(config.enabled_probes.len(), 2);
        assert_eq!(config.category_minimums.get("accessibility"), Some(&90.0));
        assert_eq!(config.overall_threshold, 75.0);
    }

    #[test]
    fn test_toggle_values() {
        assert!(toggle_enabled(None));
        assert!(toggle_enabled(Some("true")));
        assert!(toggle_enabled(Some("")));
        assert!(!toggle_enabled(Some("false")));
        assert!(!toggle_enabled(Some(" FALSE ")));
        assert!(!toggle_enabled(Some("0")));
    }

    #[test]
    fn test_category_min_parser() {
        assert_eq!(
            parse_category_min("accessibility=85").unwrap(),
            ("accessibility".to_string(), 85.0)
        );
        assert!(parse_category_min("accessibility").is_err());
        assert!(parse_category_min("=85").is_err());
        assert!(parse_category_min("a=high").is_err());
    }

    #[test]
    fn test_report_destination() {
        let path = report_destination(Path::new("reports"), Suite::Ui, "staging", "2026-10-16");
        assert_eq!(path, PathBuf::from("reports/ui-staging-2026-10-16"));
    }

    #[test]
    fn test_headline_score_follows_declared_metric() {
        use proberun_core::{ProbeFamily, ProbeOutput};

        let custom = ProbeDescriptor::new("latency", ProbeFamily::Ui, "performance", 1.0)
            .with_score_metric("p95_score");
        let plain = ProbeDescriptor::new("wcag", ProbeFamily::Ui, "accessibility", 1.0);
        let metrics = |pairs: &[(&str, f64)]| -> BTreeMap<String, f64> {
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
        };
        let output = |m: BTreeMap<String, f64>| ProbeOutput {
            success: true,
            metrics: m,
            issues: Vec::new(),
            duration_ms: 5,
        };
        let descriptors = [custom.clone(), plain.clone()];

        let latency = ProbeResult::from_output(
            &custom,
            output(metrics(&[("score", 10.0), ("p95_score", 72.5)])),
        );
        assert_eq!(headline_score(&latency, &descriptors), Some(72.5));

        let wcag = ProbeResult::from_output(&plain, output(metrics(&[("score", 91.0)])));
        assert_eq!(headline_score(&wcag, &descriptors), Some(91.0));
        // unregistered names fall back to the default metric
        assert_eq!(headline_score(&wcag, &[]), Some(91.0));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Interrupt::Int.exit_code(), 130);
        assert_eq!(Interrupt::Term.exit_code(), 143);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_run_passes_with_lenient_gates() {
        let dir = tempfile::tempdir().unwrap();
        let run_args = args(&[
            "--suite",
            "ui",
            "--seed",
            "3",
            "--threshold",
            "0",
            "--critical-issue-limit",
            "10",
            "--category-min",
            "accessibility=0",
            "--output-dir",
            dir.path().to_str().unwrap(),
        ]);
        let config = build_config(&run_args, no_env).unwrap();
        let orchestrator = Orchestrator::new()
            .with_probes(Suite::Ui.build_probes())
            .with_category_weights(Suite::Ui.category_weights())
            .with_reporting(ReportSettings::new(dir.path()));

        let outcome = orchestrator.run(config).await;
        assert!(outcome.result.success, "{:?}", outcome.result.violations);
        assert!(print_outcome(&outcome, &orchestrator.descriptors()));
        assert!(dir.path().join("proberun-report.json").exists());
    }
}
