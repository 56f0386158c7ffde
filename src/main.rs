use anyhow::{Context, Result};
use quality_gate::cli::commands::{HistoryCommand, ListCommand, PresetArg, RunCommand, ValidateCommand};
use quality_gate::cli::output::*;
use quality_gate::cli::progress::ConsoleReporter;
use quality_gate::cli::{exit_code, run_exit_code, Cli, Command};
use quality_gate::core::config::{GateConfig, DEFAULT_CONFIG_FILE};
use quality_gate::core::{ConfigError, OverallStatus, RunMode, Scope};
use quality_gate::execution::{CancelHandle, ExecutionEngine, SchedulingStrategy};
use quality_gate::persistence::{create_record, InMemoryPersistence, PersistenceBackend};
use quality_gate::report::{summarize, summarize_with, Classifier, CoverageProbe, ReportOptions, RuleClassifier};
use quality_gate::runner::ProcessInvoker;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() {
    let cli = Cli::from_args();

    // Logs go to stderr so stdout stays clean for reports and --json
    let log_level = if cli.debug_logging() { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("{} Failed to set logging subscriber: {}", WARN, e);
    }

    let result = match &cli.command {
        Command::Run(cmd) => run_gate(cmd, &cli).await,
        Command::Validate(cmd) => validate_gate(cmd),
        Command::List(cmd) => list_pipelines(cmd).await,
        Command::History(cmd) => show_history(cmd).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            eprintln!("{} {}", CROSS, style(format!("Configuration error: {:#}", e)).red());
            exit_code::CONFIG_ERROR
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {}", CROSS, style(format!("{:#}", e)).red());
            exit_code::INTERNAL_ERROR
        }
    };

    std::process::exit(code);
}

/// Load the gate from `--preset`, `--file` or the default file, applying
/// `--var` overrides before validation
fn load_config(
    file: Option<&PathBuf>,
    preset: Option<PresetArg>,
    overrides: &[(String, String)],
) -> Result<GateConfig, ConfigError> {
    let mut config = match (preset, file) {
        (Some(preset), _) => GateConfig::preset(preset.into())?,
        (None, Some(path)) => GateConfig::parse_file(path)?,
        (None, None) => GateConfig::parse_file(DEFAULT_CONFIG_FILE)?,
    };
    for (key, value) in overrides {
        config.set_variable(key.clone(), value.clone());
    }
    config.validate()?;
    Ok(config)
}

/// History store for `run`; falls back to memory when the database is unusable
async fn open_store() -> Arc<dyn PersistenceBackend> {
    #[cfg(feature = "sqlite")]
    {
        match quality_gate::persistence::SqliteRunStore::with_default_path().await {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("History unavailable, continuing without it: {:#}", e),
        }
    }
    Arc::new(InMemoryPersistence::new())
}

/// History store for `history` and `list`; errors are fatal here
#[cfg(feature = "sqlite")]
async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    let store = quality_gate::persistence::SqliteRunStore::with_default_path()
        .await
        .context("Failed to open run history")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    Ok(Arc::new(InMemoryPersistence::new()))
}

async fn run_gate(cmd: &RunCommand, cli: &Cli) -> Result<i32> {
    let mode: RunMode = cmd.mode.into();
    let config = load_config(cmd.file.as_ref(), cmd.preset, &cmd.variables)?;
    let pipeline = config.to_pipeline()?;

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let base = match cmd.file.as_ref().and_then(|file| file.parent()) {
        Some(dir) if cmd.preset.is_none() && !dir.as_os_str().is_empty() => cwd.join(dir),
        _ => cwd,
    };
    let scope = Scope::resolve(&config.scope_root(&base), cmd.scope.as_deref(), &config.scope.paths)?;

    let coverage_probe = config
        .coverage
        .as_ref()
        .map(CoverageProbe::from_config)
        .transpose()?;
    let classifier = RuleClassifier::from_rules(&config.classifier)?;
    let report_options = ReportOptions {
        excerpt_lines: cmd.excerpt_lines.unwrap_or(config.report.excerpt_lines),
    };

    let store = open_store().await;

    let strategy: SchedulingStrategy = cmd.strategy.into();
    let reporter = Arc::new(ConsoleReporter::new(cli.streams_output(mode), !cmd.json));
    let mut engine = ExecutionEngine::new(ProcessInvoker::new(), strategy);
    {
        let reporter = reporter.clone();
        engine.add_event_handler(move |event| reporter.handle(event));
    }

    let (cancel_handle, cancel) = CancelHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            cancel_handle.cancel();
        }
    });

    if !cmd.json {
        eprintln!(
            "{} Mode {} on {}",
            INFO,
            style(mode.label()).cyan(),
            style(scope.display_paths().join(" ")).dim()
        );
    }

    let run = engine
        .execute(&pipeline, &scope, &mode.execution_options(), &cancel)
        .await;

    // The baseline is read before this run is stored
    let measured = coverage_probe.as_ref().and_then(|probe| probe.measure(&run));
    let coverage = match (&coverage_probe, measured) {
        (Some(probe), Some(current)) => {
            let baseline = match store.coverage_baseline(&run.pipeline_name, &run.scope).await {
                Ok(baseline) => baseline,
                Err(e) => {
                    warn!("Could not read coverage baseline: {:#}", e);
                    None
                }
            };
            Some(probe.compare(current, baseline))
        }
        _ => None,
    };

    let classifier_ref: Option<&dyn Classifier> = if classifier.is_empty() {
        None
    } else {
        Some(&classifier)
    };
    let report = summarize_with(&run, &report_options, classifier_ref).with_coverage(coverage);

    if !cmd.no_history {
        if let Err(e) = store.save_run(&create_record(&run, measured)).await {
            warn!("Failed to save run to history: {:#}", e);
        }
    }

    if cmd.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render());
        println!("\n{}", format_verdict(&report));
    }

    Ok(run_exit_code(&run, coverage.as_ref()))
}

fn validate_gate(cmd: &ValidateCommand) -> Result<i32> {
    match load_config(cmd.file.as_ref(), cmd.preset, &[]) {
        Ok(config) => {
            if cmd.json {
                let data = serde_json::json!({
                    "valid": true,
                    "name": config.name,
                    "setup": config.setup.iter().map(|s| &s.name).collect::<Vec<_>>(),
                    "steps": config.steps.iter().map(|s| &s.name).collect::<Vec<_>>(),
                    "coverage": config.coverage.as_ref().map(|c| &c.step),
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(exit_code::SUCCESS);
            }

            println!("{} Gate configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            if !config.setup.is_empty() {
                println!("  Setup: {}", style(config.setup.len()).cyan());
            }
            println!("  Steps: {}", style(config.steps.len()).cyan());
            for step in &config.steps {
                let required = if step.required { "" } else { " (optional)" };
                println!(
                    "    {} {}{}",
                    style(step.kind.label()).dim(),
                    style(&step.name).bold(),
                    required
                );
                if let Some(description) = &step.description {
                    println!("      {}", style(description).dim());
                }
            }
            println!("  Variables: {}", style(config.variables.len()).cyan());
            Ok(exit_code::SUCCESS)
        }
        Err(e) => {
            if cmd.json {
                let data = serde_json::json!({ "valid": false, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Validation failed:", CROSS);
                println!("  {}", style(&e).red());
            }
            Ok(exit_code::CONFIG_ERROR)
        }
    }
}

async fn list_pipelines(cmd: &ListCommand) -> Result<i32> {
    let store = open_history().await?;
    let pipelines = store.list_pipelines().await?;

    if cmd.json {
        let mut json_data = Vec::new();
        for pipeline in &pipelines {
            let mut entry = serde_json::json!({ "name": pipeline });
            if cmd.with_counts {
                let runs = store.list_runs(Some(pipeline), usize::MAX).await?;
                entry["run_count"] = serde_json::json!(runs.len());
                let failed = runs.iter().filter(|r| r.status == OverallStatus::Failed).count();
                entry["failed_count"] = serde_json::json!(failed);
            }
            json_data.push(entry);
        }
        let data = serde_json::json!({ "pipelines": json_data });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(exit_code::SUCCESS);
    }

    if pipelines.is_empty() {
        println!("{} No pipelines found in history", INFO);
        return Ok(exit_code::SUCCESS);
    }

    println!("{} Pipelines in history:", INFO);
    for pipeline_name in &pipelines {
        if cmd.with_counts {
            let runs = store.list_runs(Some(pipeline_name), usize::MAX).await?;
            let failed = runs.iter().filter(|r| r.status == OverallStatus::Failed).count();
            println!(
                "  {} ({} runs: {} passed, {} failed)",
                style(pipeline_name).bold(),
                style(runs.len()).cyan(),
                style(runs.len() - failed).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(pipeline_name).bold());
        }
    }

    Ok(exit_code::SUCCESS)
}

async fn show_history(cmd: &HistoryCommand) -> Result<i32> {
    let store = open_history().await?;

    // If a specific run is requested, show its full report
    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(record) if cmd.json => {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            Some(record) => {
                println!("{}", format_run_record(&record));
                println!("{}", separator());
                print!("{}", summarize(&record.run, &ReportOptions::default()).render());
            }
            None => {
                println!("{} Run not found", WARN);
            }
        }
        return Ok(exit_code::SUCCESS);
    }

    let runs = store.list_runs(cmd.pipeline.as_deref(), cmd.limit).await?;

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(exit_code::SUCCESS);
    }

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(exit_code::SUCCESS);
    }

    println!("{} Run history (showing latest {}):", INFO, runs.len());
    for record in &runs {
        println!("  {}", format_run_record(record));
    }

    Ok(exit_code::SUCCESS)
}
