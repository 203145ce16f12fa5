//! BarrierLab CLI: label, signal, evaluate and synthetic-data commands.
//!
//! Commands:
//! - `label` - triple-barrier labels for every bar of a feature frame
//! - `signals` - trading signals from the frame's `prob_long` column
//! - `evaluate` - settle history signals against labels, print metrics and
//!   optionally sweep confidence thresholds
//! - `synth` - write a seeded synthetic feature frame
//! - `config` - print the effective configuration and its fingerprint

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking;
use tracing_subscriber::{prelude::*, EnvFilter};

use barrierlab_core::{BarrierConfig, BarrierEngine};
use barrierlab_runner::{
    evaluate_signals, format_signals_report, generate_signals, history_window, label_universe,
    load_feature_frame, overall_stats, read_manifest, summarize_signals, sweep_thresholds,
    synthetic_frame, write_feature_csv, write_labels, write_manifest, write_signals, Evaluation,
    EvaluationConfig, LabelFormat, LabelStats, LoadOptions, LoadedUniverse, ManifestKind,
    RunManifest, SignalFile, SignalScope, SyntheticConfig, ThresholdResult, DEFAULT_THRESHOLDS,
};

#[derive(Parser)]
#[command(
    name = "barrierlab",
    about = "BarrierLab CLI: regime-aware triple-barrier labels and signals"
)]
struct Cli {
    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label every bar of a feature frame.
    Label {
        /// Feature frame (.csv or .parquet).
        #[arg(long)]
        input: PathBuf,

        /// Output directory for labels and manifest.
        #[arg(long, default_value = "labels")]
        output_dir: PathBuf,

        /// TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Label table format: csv or parquet.
        #[arg(long, default_value = "csv")]
        format: LabelFormat,

        /// Reject unsorted symbols instead of sorting them.
        #[arg(long, default_value_t = false)]
        no_sort: bool,
    },
    /// Generate signals from the frame's prob_long column.
    Signals {
        /// Feature frame (.csv or .parquet) with a prob_long column.
        #[arg(long)]
        input: PathBuf,

        /// Output directory for signals and manifest.
        #[arg(long, default_value = "signals")]
        output_dir: PathBuf,

        /// TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Score every bar instead of only the latest bar per symbol.
        #[arg(long, default_value_t = false)]
        history: bool,

        /// With --history, keep signals within this many days of the latest one.
        #[arg(long, requires = "history", value_parser = clap::value_parser!(i64).range(0..=36_500))]
        days_back: Option<i64>,

        /// Labels manifest; abort if it was produced with a different config.
        #[arg(long)]
        labels_manifest: Option<PathBuf>,

        /// Reject unsorted symbols instead of sorting them.
        #[arg(long, default_value_t = false)]
        no_sort: bool,
    },
    /// Settle history signals against labels and report performance.
    Evaluate {
        /// Feature frame (.csv or .parquet) with a prob_long column.
        #[arg(long)]
        input: PathBuf,

        /// TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 10_000.0)]
        initial_capital: f64,

        /// Fraction of equity risked per trade.
        #[arg(long, default_value_t = 0.01)]
        risk_per_trade: f64,

        /// Write trades, equity curve and metrics as JSON.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also evaluate at these confidence thresholds (comma separated).
        /// Without values, sweeps 0.55 to 0.80 in steps of 0.05.
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        thresholds: Option<Vec<f64>>,
    },
    /// Write a seeded synthetic feature frame as CSV.
    Synth {
        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,

        /// Symbols to generate.
        #[arg(long, num_args = 1.., default_values = ["EURUSD", "GBPUSD", "USDJPY"])]
        symbols: Vec<String>,

        /// Bars per symbol.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Print the effective configuration and its fingerprint.
    Config {
        /// TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(log_file: Option<PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| anyhow!("failed to create log directory {parent:?}: {err}"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| anyhow!("failed to open log file {path:?}: {err}"))?;
        let (writer, guard) = non_blocking(file);
        // The guard flushes on drop; keep it for the whole process.
        let _guard = Box::leak(Box::new(guard));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file)?;

    match cli.command {
        Commands::Label {
            input,
            output_dir,
            config,
            format,
            no_sort,
        } => run_label(&input, &output_dir, config.as_deref(), format, !no_sort),
        Commands::Signals {
            input,
            output_dir,
            config,
            history,
            days_back,
            labels_manifest,
            no_sort,
        } => run_signals(
            &input,
            &output_dir,
            config.as_deref(),
            history,
            days_back,
            labels_manifest.as_deref(),
            !no_sort,
        ),
        Commands::Evaluate {
            input,
            config,
            initial_capital,
            risk_per_trade,
            output,
            thresholds,
        } => run_evaluate(
            &input,
            config.as_deref(),
            EvaluationConfig {
                initial_capital,
                risk_per_trade,
            },
            output.as_deref(),
            thresholds,
        ),
        Commands::Synth {
            output,
            symbols,
            bars,
            seed,
        } => run_synth(&output, symbols, bars, seed),
        Commands::Config { config } => run_config(config.as_deref()),
    }
}

fn load_engine(config_path: Option<&Path>) -> Result<BarrierEngine> {
    let config = match config_path {
        Some(path) => BarrierConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BarrierConfig::default(),
    };
    let engine = BarrierEngine::new(config).context("invalid barrier configuration")?;
    info!(fingerprint = %engine.fingerprint().short(), "engine configured");
    Ok(engine)
}

fn load_universe(input: &Path, sort: bool) -> Result<LoadedUniverse> {
    let universe = load_feature_frame(input, &LoadOptions { sort })
        .with_context(|| format!("failed to load feature frame {}", input.display()))?;
    for failure in &universe.failures {
        warn!(symbol = %failure.symbol, error = %failure.error, "symbol not loaded");
    }
    if universe.series.is_empty() {
        bail!("no valid symbols in {}", input.display());
    }
    Ok(universe)
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))
}

fn run_label(
    input: &Path,
    output_dir: &Path,
    config_path: Option<&Path>,
    format: LabelFormat,
    sort: bool,
) -> Result<()> {
    let engine = load_engine(config_path)?;
    let universe = load_universe(input, sort)?;

    let labels = label_universe(&engine, &universe.series);
    let stats = overall_stats(&labels);

    create_dir(output_dir)?;
    let file_name = format!("labels.{}", format.extension());
    let labels_path = output_dir.join(&file_name);
    let rows = write_labels(&labels, &labels_path, format)
        .with_context(|| format!("failed to write {}", labels_path.display()))?;

    let mut manifest = RunManifest::new(
        ManifestKind::Labels,
        &engine,
        &universe.dataset_hash,
        universe.symbols(),
        &universe.failures,
    );
    manifest.label_stats = Some(stats.clone());
    manifest.artifacts = vec![file_name];
    let manifest_path = output_dir.join("manifest.json");
    write_manifest(&manifest, &manifest_path)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    print_label_summary(&universe, &stats);
    println!("Rows written:   {rows}");
    println!("Labels saved to: {}", labels_path.display());
    Ok(())
}

fn run_signals(
    input: &Path,
    output_dir: &Path,
    config_path: Option<&Path>,
    history: bool,
    days_back: Option<i64>,
    labels_manifest: Option<&Path>,
    sort: bool,
) -> Result<()> {
    let engine = load_engine(config_path)?;

    let training = match labels_manifest {
        Some(path) => {
            let manifest = read_manifest(path)
                .with_context(|| format!("failed to read labels manifest {}", path.display()))?;
            if !manifest.matches(&engine) {
                bail!(
                    "configuration fingerprint {} differs from labels manifest {} ({}); \
                     signals would use different barriers than the training labels",
                    engine.fingerprint().short(),
                    path.display(),
                    manifest.config_fingerprint,
                );
            }
            Some(manifest)
        }
        None => None,
    };

    let universe = load_universe(input, sort)?;
    if let Some(manifest) = &training {
        if manifest.dataset_hash != universe.dataset_hash {
            warn!("feature frame differs from the one the labels were built on");
        }
    }
    let Some(probabilities) = universe.probabilities.as_ref() else {
        bail!("{} has no prob_long column", input.display());
    };

    let scope = if history {
        SignalScope::History
    } else {
        SignalScope::Latest
    };
    let run = generate_signals(&engine, &universe.series, probabilities, scope);
    let signals = match days_back {
        Some(days) => history_window(&run.signals, days),
        None => run.signals,
    };

    create_dir(output_dir)?;
    let signals_path = output_dir.join("signals.json");
    write_signals(&SignalFile::new(&engine, signals.clone()), &signals_path)
        .with_context(|| format!("failed to write {}", signals_path.display()))?;

    let mut manifest = RunManifest::new(
        ManifestKind::Signals,
        &engine,
        &universe.dataset_hash,
        universe.symbols(),
        &universe.failures,
    );
    manifest.artifacts = vec!["signals.json".into()];
    let manifest_path = output_dir.join("manifest.json");
    write_manifest(&manifest, &manifest_path)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    println!("{}", format_signals_report(&signals));
    if !signals.is_empty() {
        let summary = summarize_signals(&signals);
        println!();
        println!("Average confidence: {:.1}%", summary.avg_confidence * 100.0);
        for (symbol, counts) in &summary.by_symbol {
            println!("  {symbol:<10} long {:>4}  short {:>4}", counts.long, counts.short);
        }
    }
    println!("Signals saved to: {}", signals_path.display());
    Ok(())
}

fn run_evaluate(
    input: &Path,
    config_path: Option<&Path>,
    eval_config: EvaluationConfig,
    output: Option<&Path>,
    thresholds: Option<Vec<f64>>,
) -> Result<()> {
    let engine = load_engine(config_path)?;
    let universe = load_universe(input, true)?;
    let Some(probabilities) = universe.probabilities.as_ref() else {
        bail!("{} has no prob_long column", input.display());
    };

    let run = generate_signals(&engine, &universe.series, probabilities, SignalScope::History);
    let labels = label_universe(&engine, &universe.series);
    let evaluation = evaluate_signals(&run.signals, &labels, &eval_config)
        .context("invalid evaluation settings")?;

    print_evaluation(&evaluation, &eval_config);

    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(&evaluation)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Evaluation saved to: {}", path.display());
    }

    if let Some(thresholds) = thresholds {
        let thresholds = if thresholds.is_empty() {
            DEFAULT_THRESHOLDS.to_vec()
        } else {
            thresholds
        };
        let results = sweep_thresholds(
            engine.config(),
            &thresholds,
            &universe.series,
            probabilities,
            &eval_config,
        )
        .context("threshold sweep failed")?;
        print_sweep(&results);
    }
    Ok(())
}

fn run_synth(output: &Path, symbols: Vec<String>, bars: usize, seed: u64) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be >= 1");
    }
    let config = SyntheticConfig {
        symbols,
        bars,
        seed,
        ..Default::default()
    };
    let mut df = synthetic_frame(&config).context("failed to build synthetic frame")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent)?;
    }
    write_feature_csv(&mut df, output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(rows = df.height(), path = %output.display(), "synthetic feature frame written");
    println!(
        "Wrote {} rows ({} symbols x {} bars) to {}",
        df.height(),
        config.symbols.len(),
        bars,
        output.display()
    );
    Ok(())
}

fn run_config(config_path: Option<&Path>) -> Result<()> {
    let engine = load_engine(config_path)?;
    let toml = engine.config().to_toml()?;
    println!("# fingerprint: {}", engine.fingerprint());
    print!("{toml}");
    Ok(())
}

fn print_label_summary(universe: &LoadedUniverse, stats: &LabelStats) {
    println!();
    println!("=== Label Summary ===");
    println!("Symbols:        {}", universe.series.len());
    println!("Failed symbols: {}", universe.failures.len());
    println!("Bars:           {}", stats.total);
    println!("Long:           {} ({:.1}%)", stats.long, stats.long_pct());
    println!("Short:          {} ({:.1}%)", stats.short, stats.short_pct());
    println!("Neutral:        {} ({:.1}%)", stats.neutral, stats.neutral_pct());
    println!("Skipped:        {}", stats.skipped);
    for (reason, count) in &stats.skip_reasons {
        println!("  {reason:<24}{count}");
    }
    println!(
        "Dataset hash:   {}",
        universe.dataset_hash.get(..12).unwrap_or_default()
    );
}

fn print_evaluation(evaluation: &Evaluation, config: &EvaluationConfig) {
    let m = &evaluation.metrics;
    println!();
    println!("=== Label-Outcome Evaluation ===");
    println!("Initial Capital: {:.2}", config.initial_capital);
    println!("Risk per Trade:  {:.2}%", config.risk_per_trade * 100.0);
    println!("Trades:          {}", m.trade_count);
    println!("Unmatched:       {}", evaluation.unmatched);
    println!("Neutral Bars:    {}", evaluation.neutral_skipped);
    println!();
    println!("--- Performance ---");
    println!("Win Rate:        {:.1}% ({} / {})", m.win_rate * 100.0, m.wins, m.trade_count);
    println!("Total P&L:       {:.2}", m.total_pnl);
    println!("Total Return:    {:.2}%", m.total_return * 100.0);
    println!("Profit Factor:   {:.2}", m.profit_factor);
    println!("Avg Win:         {:.2}", m.avg_win);
    println!("Avg Loss:        {:.2}", m.avg_loss);
    println!("Avg R:           {:.2}", m.avg_r);
    println!("Max Drawdown:    {:.2}%", m.max_drawdown * 100.0);
    println!("Sharpe:          {:.3}", m.sharpe);
    println!("Final Equity:    {:.2}", m.final_equity);
    println!("Max Consec Win:  {}", m.max_consecutive_wins);
    println!("Max Consec Loss: {}", m.max_consecutive_losses);

    if !evaluation.by_symbol.is_empty() {
        println!();
        println!("--- By Symbol ---");
        println!("{:<10} {:>7} {:>6} {:>9} {:>12}", "Symbol", "Trades", "Wins", "Win Rate", "P&L");
        for (symbol, p) in &evaluation.by_symbol {
            println!(
                "{symbol:<10} {:>7} {:>6} {:>8.1}% {:>12.2}",
                p.trades,
                p.wins,
                p.win_rate * 100.0,
                p.total_pnl
            );
        }
    }
}

fn print_sweep(results: &[ThresholdResult]) {
    println!();
    println!("=== Threshold Sweep ===");
    println!(
        "{:>9} {:>8} {:>7} {:>9} {:>10} {:>8} {:>8} {:>9}",
        "Threshold", "Signals", "Trades", "Win Rate", "Return", "PF", "Sharpe", "Max DD"
    );
    for r in results {
        let m = &r.metrics;
        println!(
            "{:>9.2} {:>8} {:>7} {:>8.1}% {:>9.2}% {:>8.2} {:>8.3} {:>8.2}%",
            r.threshold,
            r.signals,
            m.trade_count,
            m.win_rate * 100.0,
            m.total_return * 100.0,
            m.profit_factor,
            m.sharpe,
            m.max_drawdown * 100.0
        );
    }
}
