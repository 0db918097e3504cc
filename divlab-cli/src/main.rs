//! DivLab CLI — divergence backtests from the command line.
//!
//! Commands:
//! - `run` — backtest one TOML config, or one or more series CSVs with flag overrides
//! - `check-config` — validate a TOML config and the series it points at
//! - `synthetic` — write a deterministic synthetic series CSV for experiments

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use divlab_core::validate_series;
use divlab_runner::{
    export_records_csv, format_summary, generate_synthetic_series, load_series_csv, run_batch,
    save_artifacts, BacktestResult, RunConfig,
};

#[derive(Parser)]
#[command(
    name = "divlab",
    about = "DivLab CLI — oscillator divergence momentum-reversal backtester"
)]
struct Cli {
    /// Log level: trace, debug, info, warn, error.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run backtests from a TOML config or from series CSV files.
    Run {
        /// Path to a TOML config file.
        #[arg(long, conflicts_with = "series")]
        config: Option<PathBuf>,

        /// Series CSV files (one run each). The file stem is the default symbol.
        #[arg(long, num_args = 1..)]
        series: Vec<PathBuf>,

        /// Symbol name (single series only).
        #[arg(long)]
        symbol: Option<String>,

        /// Timestamp column name in the series CSV.
        #[arg(long)]
        timestamp_column: Option<String>,

        /// Close column name in the series CSV.
        #[arg(long)]
        close_column: Option<String>,

        /// Oscillator column name in the series CSV.
        #[arg(long)]
        oscillator_column: Option<String>,

        /// Trailing window for price/oscillator extrema.
        #[arg(long)]
        window: Option<usize>,

        /// Oversold threshold (entry requires the oscillator below it).
        #[arg(long)]
        oversold: Option<f64>,

        /// Overbought threshold (signal exit requires the oscillator above it).
        #[arg(long)]
        overbought: Option<f64>,

        /// Stop-loss distance below entry as a fraction (0.05 = 5%).
        #[arg(long)]
        stop_loss: Option<f64>,

        /// Starting cash balance.
        #[arg(long)]
        initial_balance: Option<f64>,

        /// Output directory for trade/series CSVs and the JSON summary.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Run one series at a time instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Validate a TOML config file and the series it references.
    CheckConfig {
        /// Path to a TOML config file.
        config: PathBuf,
    },
    /// Generate a deterministic synthetic series CSV.
    Synthetic {
        /// Symbol name (seeds the generator).
        #[arg(long)]
        symbol: String,

        /// Number of weekday periods.
        #[arg(long, default_value_t = 500)]
        periods: usize,

        /// First calendar date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,
    },
}

/// Strategy and column overrides given on the command line.
struct Overrides {
    timestamp_column: Option<String>,
    close_column: Option<String>,
    oscillator_column: Option<String>,
    window: Option<usize>,
    oversold: Option<f64>,
    overbought: Option<f64>,
    stop_loss: Option<f64>,
    initial_balance: Option<f64>,
}

impl Overrides {
    fn apply(&self, cfg: &mut RunConfig) {
        let columns = &mut cfg.series.columns;
        if let Some(c) = &self.timestamp_column {
            columns.timestamp_column = c.clone();
        }
        if let Some(c) = &self.close_column {
            columns.close_column = c.clone();
        }
        if let Some(c) = &self.oscillator_column {
            columns.oscillator_column = c.clone();
        }

        let strategy = &mut cfg.strategy;
        if let Some(v) = self.window {
            strategy.window = v;
        }
        if let Some(v) = self.oversold {
            strategy.oversold_threshold = v;
        }
        if let Some(v) = self.overbought {
            strategy.overbought_threshold = v;
        }
        if let Some(v) = self.stop_loss {
            strategy.stop_loss_fraction = v;
        }
        if let Some(v) = self.initial_balance {
            strategy.initial_balance = v;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Run {
            config,
            series,
            symbol,
            timestamp_column,
            close_column,
            oscillator_column,
            window,
            oversold,
            overbought,
            stop_loss,
            initial_balance,
            output_dir,
            sequential,
        } => {
            let overrides = Overrides {
                timestamp_column,
                close_column,
                oscillator_column,
                window,
                oversold,
                overbought,
                stop_loss,
                initial_balance,
            };
            let configs = build_run_configs(config, series, symbol, &overrides)?;
            run_cmd(&configs, &output_dir, !sequential)
        }
        Commands::CheckConfig { config } => check_config_cmd(&config),
        Commands::Synthetic {
            symbol,
            periods,
            start,
            output,
        } => synthetic_cmd(&symbol, periods, &start, &output),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => bail!("unknown log level '{other}'. Valid: trace, debug, info, warn, error"),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;
    Ok(())
}

fn build_run_configs(
    config_path: Option<PathBuf>,
    series: Vec<PathBuf>,
    symbol: Option<String>,
    overrides: &Overrides,
) -> Result<Vec<RunConfig>> {
    let mut configs = if let Some(path) = config_path {
        let mut cfg = RunConfig::from_file(&path)
            .with_context(|| format!("invalid config {}", path.display()))?;
        if let Some(sym) = symbol {
            cfg.backtest.symbol = sym;
        }
        vec![cfg]
    } else {
        if series.is_empty() {
            bail!("one of --config or --series is required");
        }
        if symbol.is_some() && series.len() > 1 {
            bail!("--symbol applies to a single --series file; got {}", series.len());
        }
        series
            .into_iter()
            .map(|path| -> Result<RunConfig> {
                let sym = match &symbol {
                    Some(s) => s.clone(),
                    None => symbol_from_path(&path)?,
                };
                Ok(RunConfig::new(sym, path))
            })
            .collect::<Result<Vec<_>>>()?
    };

    for cfg in &mut configs {
        overrides.apply(cfg);
        cfg.validate()
            .with_context(|| format!("invalid parameters for {}", cfg.symbol()))?;
    }
    Ok(configs)
}

fn symbol_from_path(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .with_context(|| format!("cannot derive a symbol from {}", path.display()))
}

fn run_cmd(configs: &[RunConfig], output_dir: &Path, parallel: bool) -> Result<()> {
    let results = run_batch(configs, parallel);

    let mut failed = 0;
    for (cfg, result) in configs.iter().zip(results) {
        match result {
            Ok(result) => {
                print_summary(&result);
                let written = save_artifacts(&result, output_dir)?;
                for path in written {
                    println!("  wrote {}", path.display());
                }
                println!();
            }
            Err(e) => {
                eprintln!("Error for {}: {e}", cfg.symbol());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} runs failed", configs.len());
    }
    Ok(())
}

fn check_config_cmd(path: &Path) -> Result<()> {
    let cfg =
        RunConfig::from_file(path).with_context(|| format!("invalid config {}", path.display()))?;
    let loaded = load_series_csv(&cfg.series.path, &cfg.series.columns)?;
    validate_series(&loaded.records)
        .with_context(|| format!("series {} failed validation", cfg.series.path.display()))?;

    let s = &cfg.strategy;
    println!("Config OK: {}", path.display());
    println!("  symbol:       {}", cfg.symbol());
    println!("  run id:       {}", cfg.run_id());
    println!("  window:       {}", s.window);
    println!(
        "  thresholds:   oversold < {} / overbought > {}",
        s.oversold_threshold, s.overbought_threshold
    );
    println!("  stop-loss:    {:.2}%", s.stop_loss_fraction * 100.0);
    println!("  balance:      {:.2}", s.initial_balance);
    println!(
        "  series:       {} ({} periods, {} leading rows skipped)",
        cfg.series.path.display(),
        loaded.records.len(),
        loaded.skipped_rows
    );
    println!("  dataset hash: {}", loaded.dataset_hash);
    Ok(())
}

fn synthetic_cmd(symbol: &str, periods: usize, start: &str, output: &Path) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start date '{start}'"))?;
    let loaded = generate_synthetic_series(symbol, periods, start);
    let csv = export_records_csv(&loaded.records)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(output, csv).with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Wrote {} synthetic periods for {symbol} to {}",
        loaded.records.len(),
        output.display()
    );
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let tag = if result.synthetic { " [SYNTHETIC]" } else { "" };
    println!("=== {}{tag} ===", result.symbol);
    println!(
        "Periods: {} ({} leading rows skipped) | window {}",
        result.series.len(),
        result.skipped_rows,
        result.config.window
    );
    println!("Run ID: {}", &result.run_id[..12.min(result.run_id.len())]);
    print!("{}", format_summary(&result.summary));
}
