//! CLI entry point for training and using sale-price models.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use estate_learning::estate_processing::dataset::read_dataset;
use estate_learning::estate_processing::DataProfiler;
use estate_learning::{BoosterFamily, Predictor, Trainer, TrainerConfig, TrainingOutcome};
use serde_json::json;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Housing sale-price prediction",
    long_about = "Profile housing data, train gradient-boosted sale-price models and predict \
                  with the promoted model.\n\n\
                  EXAMPLES:\n  \
                  # Summarise a dataset\n  \
                  estate overview train.csv\n\n  \
                  # Train one family with 20 search trials\n  \
                  estate --trials 20 train --family XGBRegressor train.csv\n\n  \
                  # Predict with the promoted model\n  \
                  estate predict --family XGBRegressor test.csv"
)]
struct Args {
    /// Directory holding pipeline state and models
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Number of cross-validation folds
    #[arg(long, global = true)]
    folds: Option<usize>,

    /// Number of hyperparameter trials
    #[arg(long, global = true)]
    trials: Option<usize>,

    /// JSON configuration file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON on stdout and disable logging
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shape, column types, missing and unique counts
    Overview { file: PathBuf },

    /// Missing-value summary and target correlations
    Visualize { file: PathBuf },

    /// Train a model family and promote its best fold
    Train {
        /// XGBRegressor, LGBMRegressor or CatBoostRegressor
        #[arg(long)]
        family: String,
        file: PathBuf,
    },

    /// Predict sale prices with a promoted model
    Predict {
        #[arg(long)]
        family: String,
        file: PathBuf,
    },
}

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence over the
/// verbosity flags; `--json` disables logging so stdout stays parseable.
fn init_logging(verbose: u8, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<TrainerConfig> {
    let mut config = match &args.config {
        Some(path) => TrainerConfig::from_json_file(path)?,
        None => TrainerConfig::default(),
    };
    if let Some(root) = &args.artifacts {
        config.artifact_root = root.clone();
    }
    if let Some(folds) = args.folds {
        config.n_folds = folds;
    }
    if let Some(trials) = args.trials {
        config.n_trials = trials;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet, args.json);
    let config = load_config(&args)?;

    match &args.command {
        Command::Overview { file } => run_overview(file, args.json),
        Command::Visualize { file } => run_visualize(file, &config, args.json),
        Command::Train { family, file } => {
            let family: BoosterFamily = family.parse()?;
            run_train(family, file, config, args.json)
        }
        Command::Predict { family, file } => {
            let family: BoosterFamily = family.parse()?;
            run_predict(family, file, &config, args.json)
        }
    }
}

/// Print a dataset overview.
///
/// Uses `println!` for the report itself; logging only carries progress.
fn run_overview(file: &Path, json_output: bool) -> Result<()> {
    let df = read_dataset(file)?;
    let overview = DataProfiler::overview(&df)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("DATASET OVERVIEW");
    println!("{}\n", "=".repeat(80));
    println!("  File: {}", file.display());
    println!("  Rows: {}", overview.shape.0);
    println!("  Columns: {}", overview.shape.1);
    println!("  Duplicate rows: {}", overview.duplicate_count);
    println!();

    println!(
        "{:<20} {:<10} {:<10} {:<10} {:<30}",
        "Column", "Type", "Missing %", "Unique", "Sample"
    );
    println!("{}", "-".repeat(80));
    for col in &overview.columns {
        println!(
            "{:<20} {:<10} {:<10.1} {:<10} {:<30}",
            truncate_str(&col.name, 19),
            truncate_str(&col.dtype, 9),
            col.null_percentage,
            col.unique_count,
            truncate_str(&col.sample_values.join(", "), 29)
        );
    }
    Ok(())
}

fn run_visualize(file: &Path, config: &TrainerConfig, json_output: bool) -> Result<()> {
    let df = read_dataset(file)?;
    let processing = &config.processing;
    let missing = DataProfiler::missing_summary(&df);
    let correlations = DataProfiler::target_correlations(
        &df,
        &processing.target_column,
        &[processing.id_column.as_str()],
    )?;

    if json_output {
        let report = json!({ "missing": missing, "target_correlations": correlations });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\nMISSING VALUES");
    println!("{}", "-".repeat(40));
    if missing.is_empty() {
        println!("  No missing values");
    }
    for entry in &missing {
        println!(
            "  {:<20} {:>6} {:>6.1}% {}",
            truncate_str(&entry.column, 19),
            entry.null_count,
            entry.null_percentage,
            bar(entry.null_percentage / 100.0)
        );
    }

    println!("\nCORRELATION WITH {}", processing.target_column);
    println!("{}", "-".repeat(40));
    for entry in &correlations {
        println!(
            "  {:<20} {:>7.3} {}",
            truncate_str(&entry.column, 19),
            entry.correlation,
            bar(entry.correlation.abs())
        );
    }
    Ok(())
}

fn run_train(family: BoosterFamily, file: &Path, config: TrainerConfig, json_output: bool) -> Result<()> {
    let mut trainer = Trainer::builder().config(config).build()?;
    let outcome = trainer
        .train(family, file)
        .with_context(|| format!("Training {family} on {}", file.display()))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &TrainingOutcome) {
    println!("\n{}", "=".repeat(80));
    println!("TRAINING SUMMARY - {}", outcome.family);
    println!("{}\n", "=".repeat(80));
    println!("  Selected features: {}", outcome.selected_features.len());
    println!("  Search trials: {}", outcome.trials.len());
    println!("  Best CV RMSE: {:.4}", outcome.best_value);
    println!("  Best parameters:");
    for (name, value) in &outcome.best_params {
        println!("    {name} = {value}");
    }
    println!();

    println!(
        "{:<6} {:>12} {:>12} {:>8} {:>8} {:>8}",
        "Fold", "RMSE", "MAE", "RMSLE", "R2", "Adj R2"
    );
    println!("{}", "-".repeat(60));
    for fold in &outcome.folds {
        let marker = if fold.fold_no == outcome.best_fold_no { " *" } else { "" };
        println!(
            "{:<6} {:>12.2} {:>12.2} {:>8.4} {:>8.4} {:>8.4}{}",
            fold.fold_no, fold.rmse, fold.mae, fold.rmsle, fold.r2, fold.adj_r2, marker
        );
    }
    println!("{}", "-".repeat(60));
    println!(
        "{:<6} {:>12.2} {:>12.2} {:>8.4} {:>8.4}",
        "mean",
        outcome.mean_of(|f| f.rmse),
        outcome.mean_of(|f| f.mae),
        outcome.mean_of(|f| f.rmsle),
        outcome.mean_of(|f| f.r2)
    );
    println!("\n  Promoted fold {} (*)", outcome.best_fold_no);
}

fn run_predict(family: BoosterFamily, file: &Path, config: &TrainerConfig, json_output: bool) -> Result<()> {
    let predictions = Predictor::new(config).predict(family, file)?;
    info!("Predicted {} rows", predictions.len());

    if json_output {
        println!("{}", serde_json::to_string(&predictions)?);
        return Ok(());
    }
    for value in &predictions {
        println!("{value:.2}");
    }
    Ok(())
}

/// Horizontal bar for a value in `[0, 1]`.
fn bar(fraction: f64) -> String {
    let width = (fraction.clamp(0.0, 1.0) * 30.0).round() as usize;
    "#".repeat(width)
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
