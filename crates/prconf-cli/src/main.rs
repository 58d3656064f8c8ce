//! PR Confidence CLI
//!
//! The `prconf` command runs the confidence workflow over JSON fixtures.
//!
//! ## Commands
//!
//! - `analyze`: Run the workflow for one trigger event and print the report
//! - `check-config`: Validate a pipeline configuration file
//! - `render`: Re-render a stored report as JSON or markdown

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use prconf_core::obs::RunSpan;
use prconf_core::{
    render_markdown, write_report_json, ConfidenceReport, DocumentationSet, FsReportStore,
    LogNotifier, OverallStatus, PipelineConfig, QualitySignals, RequirementSet,
    StaticDocumentationSource, StaticRequirementSource, StaticSignalProvider, WorkflowEngine,
};

#[derive(Parser)]
#[command(name = "prconf")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pull request confidence analysis", long_about = None)]
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
    /// Analyze one pull request event
    Analyze {
        /// Trigger event (JSON)
        #[arg(short, long)]
        event: PathBuf,

        /// Requirement set served to the workflow (JSON)
        #[arg(long)]
        requirements: Option<PathBuf>,

        /// Documentation set served to the workflow (JSON)
        #[arg(long)]
        docs: Option<PathBuf>,

        /// Quality signals (JSON)
        #[arg(long)]
        signals: Option<PathBuf>,

        /// Pipeline configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Persist the report under this directory
        #[arg(long)]
        store_dir: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a pipeline configuration file
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Render a stored report
    Render {
        /// Report JSON as written by `analyze --format json`
        #[arg(short, long)]
        report: PathBuf,

        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

struct AnalyzeArgs<'a> {
    event: &'a Path,
    requirements: Option<&'a Path>,
    docs: Option<&'a Path>,
    signals: Option<&'a Path>,
    config: Option<&'a Path>,
    store_dir: Option<&'a Path>,
    format: OutputFormat,
    output: Option<&'a Path>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    prconf_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Analyze {
            event,
            requirements,
            docs,
            signals,
            config,
            store_dir,
            format,
            output,
        } => {
            cmd_analyze(AnalyzeArgs {
                event: &event,
                requirements: requirements.as_deref(),
                docs: docs.as_deref(),
                signals: signals.as_deref(),
                config: config.as_deref(),
                store_dir: store_dir.as_deref(),
                format,
                output: output.as_deref(),
            })
            .await
        }
        Commands::CheckConfig { config } => cmd_check_config(&config),
        Commands::Render { report, format } => cmd_render(&report, format),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file: {:?}", what, path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid {} JSON: {:?}", what, path))
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config: {:?}", path)),
        None => Ok(PipelineConfig::default()),
    }
}

fn emit_report(report: &ConfidenceReport, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    match (format, output) {
        (OutputFormat::Json, Some(path)) => write_report_json(path, report)?,
        (OutputFormat::Markdown, Some(path)) => std::fs::write(path, render_markdown(report))
            .with_context(|| format!("Failed to write report to {:?}", path))?,
        (OutputFormat::Json, None) => println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize report")?
        ),
        (OutputFormat::Markdown, None) => print!("{}", render_markdown(report)),
    }
    Ok(())
}

/// Run one workflow over fixture files.
async fn cmd_analyze(args: AnalyzeArgs<'_>) -> Result<()> {
    let config = load_config(args.config)?;
    let payload: serde_json::Value = read_json(args.event, "event")?;

    let mut builder = WorkflowEngine::builder(config).notifier(Arc::new(LogNotifier));
    if let Some(path) = args.requirements {
        let set: RequirementSet = read_json(path, "requirements")?;
        builder = builder.requirement_source(Arc::new(StaticRequirementSource::new(set)));
    }
    if let Some(path) = args.docs {
        let set: DocumentationSet = read_json(path, "documentation")?;
        builder = builder.documentation_source(Arc::new(StaticDocumentationSource::new(set)));
    }
    if let Some(path) = args.signals {
        let signals: QualitySignals = read_json(path, "signals")?;
        builder = builder.signal_provider(Arc::new(StaticSignalProvider::new(signals)));
    }
    if let Some(dir) = args.store_dir {
        builder = builder.report_store(Arc::new(FsReportStore::new(dir)));
    }
    let engine = builder.build().context("Invalid pipeline configuration")?;

    let outcome = engine.run(payload).await;
    let _span = RunSpan::enter(outcome.state.run_id());
    let status = outcome.status();
    for entry in outcome.state.error_log() {
        info!(kind = ?entry.kind, node = ?entry.node, "{}", entry.message);
    }
    if let Some(id) = &outcome.report_id {
        info!(report_id = %id, "report stored");
    }

    let report = outcome
        .into_report()
        .with_context(|| format!("Workflow finished as {}", status))?;
    emit_report(&report, args.format, args.output)?;

    if let Some(path) = args.output {
        let partial = if status == OverallStatus::PartiallyCompleted {
            " (partial)"
        } else {
            ""
        };
        println!(
            "{} {}/100{} -> {:?}",
            report.recommendation(),
            report.score(),
            partial,
            path
        );
    }
    Ok(())
}

/// Validate a configuration file and print its effective runtime limits.
fn cmd_check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    println!("Configuration OK: {:?}", path);
    println!(
        "  retries: {}, call timeout: {}ms, budget: {}s, penalty mode: {:?}",
        config.runtime.max_retries,
        config.runtime.call_timeout_ms,
        config.runtime.workflow_budget_secs,
        config.penalty.mode
    );
    Ok(())
}

fn cmd_render(path: &Path, format: OutputFormat) -> Result<()> {
    let report: ConfidenceReport = read_json(path, "report")?;
    emit_report(&report, format, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn event_json() -> serde_json::Value {
        json!({
            "repository": "org/app",
            "prId": "12",
            "title": "Add invoice export",
            "description": "Exports invoices as CSV",
            "author": "dev",
            "fileChanges": [{"path": "src/invoice.rs", "additions": 30, "deletions": 2}],
            "linkedRequirementRefs": ["APP-12"]
        })
    }

    fn args<'a>(event: &'a Path, output: &'a Path, format: OutputFormat) -> AnalyzeArgs<'a> {
        AnalyzeArgs {
            event,
            requirements: None,
            docs: None,
            signals: None,
            config: None,
            store_dir: None,
            format,
            output: Some(output),
        }
    }

    #[tokio::test]
    async fn test_analyze_writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let event = write(dir.path(), "event.json", event_json());
        let reqs = write(
            dir.path(),
            "reqs.json",
            json!({"requirements": [{"ticketId": "APP-12", "title": "Invoice export"}]}),
        );
        let store = dir.path().join("store");
        let out = dir.path().join("report.json");

        let mut a = args(&event, &out, OutputFormat::Json);
        a.requirements = Some(&reqs);
        a.store_dir = Some(&store);
        cmd_analyze(a).await.unwrap();

        let report: ConfidenceReport = read_json(&out, "report").unwrap();
        assert_eq!(report.pr_id(), "12");
        assert!(report.score() <= 100);
        assert_eq!(std::fs::read_dir(&store).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_analyze_markdown_then_render() {
        let dir = tempfile::tempdir().unwrap();
        let event = write(dir.path(), "event.json", event_json());
        let md = dir.path().join("report.md");
        cmd_analyze(args(&event, &md, OutputFormat::Markdown))
            .await
            .unwrap();
        assert!(std::fs::read_to_string(&md)
            .unwrap()
            .starts_with("# PR Confidence: org/app #12"));

        let json_out = dir.path().join("report.json");
        cmd_analyze(args(&event, &json_out, OutputFormat::Json))
            .await
            .unwrap();
        cmd_render(&json_out, OutputFormat::Markdown).unwrap();
    }

    #[tokio::test]
    async fn test_analyze_rejects_invalid_event() {
        let dir = tempfile::tempdir().unwrap();
        let event = write(dir.path(), "event.json", json!({"repository": "org/app"}));
        let out = dir.path().join("report.json");
        let err = cmd_analyze(args(&event, &out, OutputFormat::Json))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed"), "{err:#}");
        assert!(!out.exists());
    }

    #[test]
    fn test_check_config() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[runtime]\nmax_retries = 1\n").unwrap();
        cmd_check_config(&good).unwrap();

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[weights.components]\ncode_quality = 0.9\n").unwrap();
        assert!(cmd_check_config(&bad).is_err());
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "prconf", "--json", "analyze", "--event", "e.json", "--format", "json",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Analyze {
                format: OutputFormat::Json,
                ..
            }
        ));
    }
}
