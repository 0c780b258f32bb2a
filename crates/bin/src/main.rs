//! Abode CLI binary.
//!
//! Trains the price model, serves it over HTTP and runs one-off or batch
//! predictions from the command line.

mod server;

use abode::{ServiceConfig, VERSION};
use abode_data::{
    CATEGORICAL_FEATURES, CleaningConfig, SplitConfig, load_listings, read_feature_frame,
    remove_outliers, stratified_split,
};
use abode_encoding::{PreprocessorConfig, UnknownPolicy};
use abode_model::training::{TrainingConfig, save_outcome, train};
use abode_model::{BoostingConfig, FeatureRecord, LoadedModel, ModelMetadata, migrate_legacy};
use abode_output::{
    BatchPredictionRow, ExportFormat, Exporter, PredictionResponse, ReportBuilder, RowCounts,
    SAMPLE_FILE_NAME, sample_csv,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "abode")]
#[command(about = "Abode: NYC housing price prediction", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where to find the model and how to serve it
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// JSON service config file
    #[arg(long, env = "ABODE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding dated model artifacts
    #[arg(long, env = "ABODE_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Model artifact (requires --metadata)
    #[arg(long, env = "ABODE_MODEL_PATH", requires = "metadata")]
    model: Option<PathBuf>,

    /// Metadata file (requires --model)
    #[arg(long, env = "ABODE_METADATA_PATH", requires = "model")]
    metadata: Option<PathBuf>,
}

impl ModelArgs {
    /// File config with command-line overrides applied.
    fn resolve(&self) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::load(path)?,
            None => ServiceConfig::default(),
        };
        if let Some(dir) = &self.models_dir {
            config.models_dir.clone_from(dir);
        }
        if let (Some(model), Some(metadata)) = (&self.model, &self.metadata) {
            config.model_path = Some(model.clone());
            config.metadata_path = Some(metadata.clone());
        }
        config.validate()?;
        Ok(config)
    }

    fn load(&self) -> Result<LoadedModel, Box<dyn std::error::Error>> {
        let config = self.resolve()?;
        Ok(LoadedModel::load(&config.model_paths(), config.load_options()?)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from a listings CSV
    Train {
        /// Listings CSV with BROKERTITLE, TYPE, BEDS, BATH, PROPERTYSQFT, SUBLOCALITY, PRICE
        data: PathBuf,

        /// Output directory for the model and metadata
        #[arg(long, env = "ABODE_MODELS_DIR")]
        models_dir: Option<PathBuf>,

        /// Number of boosting rounds
        #[arg(long, default_value = "50")]
        n_estimators: usize,

        /// Maximum tree depth
        #[arg(long, default_value = "6")]
        max_depth: u32,

        /// Shrinkage applied to each tree
        #[arg(long, default_value = "0.1")]
        learning_rate: f64,

        /// Cross-validation folds
        #[arg(long, default_value = "5")]
        cv_folds: usize,

        /// Seed for splitting and fold assignment
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Categoricals with more distinct values than this are frequency encoded
        #[arg(long, default_value = "50")]
        threshold: usize,

        /// Encoding for unseen categories (zero or rare)
        #[arg(long, default_value = "zero")]
        unknown: UnknownPolicy,

        /// Also write the training report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run the REST server
    Serve {
        #[command(flatten)]
        model: ModelArgs,

        /// Bind address
        #[arg(long, env = "ABODE_HOST")]
        host: Option<String>,

        /// Bind port
        #[arg(long, env = "ABODE_PORT")]
        port: Option<u16>,

        /// Disable the prediction cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Predict the price of one property
    Predict {
        #[command(flatten)]
        model: ModelArgs,

        /// Listing broker, e.g. "Brokered by COMPASS"
        #[arg(long)]
        broker: String,

        /// Property type, e.g. "Condo for sale"
        #[arg(long = "type")]
        property_type: String,

        /// Bedrooms
        #[arg(long)]
        beds: i64,

        /// Bathrooms
        #[arg(long)]
        bath: f64,

        /// Floor area in square feet
        #[arg(long, alias = "propertysqft")]
        sqft: f64,

        /// Borough or sublocality, e.g. "Manhattan"
        #[arg(long)]
        sublocality: String,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Predict every row of a CSV
    Batch {
        #[command(flatten)]
        model: ModelArgs,

        /// CSV with the six feature columns
        input: PathBuf,

        /// Write results here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format (csv, json or pretty-json)
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Show the model metadata
    Info {
        #[command(flatten)]
        model: ModelArgs,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Write the sample batch CSV
    Sample {
        /// Destination file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Convert legacy metadata to the current schema
    MigrateMetadata {
        /// Legacy metadata JSON
        input: PathBuf,

        /// Where to write the converted metadata
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            models_dir,
            n_estimators,
            max_depth,
            learning_rate,
            cv_folds,
            seed,
            threshold,
            unknown,
            report,
        } => {
            let config = TrainingConfig {
                preprocessing: PreprocessorConfig {
                    high_cardinality_threshold: threshold,
                    unknown_policy: unknown,
                },
                boosting: BoostingConfig {
                    n_estimators,
                    max_depth,
                    learning_rate,
                    ..BoostingConfig::default()
                },
                cv_folds,
                seed,
                ..TrainingConfig::default()
            };
            let models_dir = models_dir.unwrap_or_else(abode::config::default_models_dir);
            train_model(&data, &models_dir, &config, report.as_deref())?;
        }
        Commands::Serve {
            model,
            host,
            port,
            no_cache,
        } => {
            let mut config = model.resolve()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if no_cache {
                config.enable_caching = false;
            }
            server::serve(&config).await?;
        }
        Commands::Predict {
            model,
            broker,
            property_type,
            beds,
            bath,
            sqft,
            sublocality,
            format,
        } => {
            let record = FeatureRecord::new()
                .with("brokertitle", broker)
                .with("type", property_type)
                .with("beds", beds)
                .with("bath", bath)
                .with("propertysqft", sqft)
                .with("sublocality", sublocality);
            predict_one(&model, &record, &format)?;
        }
        Commands::Batch {
            model,
            input,
            output,
            format,
        } => {
            let format: ExportFormat = format.parse()?;
            predict_file(&model, &input, output.as_deref(), format)?;
        }
        Commands::Info { model, format } => {
            show_info(&model, &format)?;
        }
        Commands::Sample { output } => {
            let csv = sample_csv()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    println!("Wrote {} to {}", SAMPLE_FILE_NAME, path.display());
                }
                None => print!("{csv}"),
            }
        }
        Commands::MigrateMetadata { input, output } => {
            migrate_metadata(&input, &output)?;
        }
    }

    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("█▓░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn train_model(
    data: &Path,
    models_dir: &Path,
    config: &TrainingConfig,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", "ABODE MODEL TRAINING");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    print!("Loading listings from {}...", data.display());
    std::io::Write::flush(&mut std::io::stdout())?;
    let set = load_listings(data)?;
    println!(" ✓ ({} rows, {} incomplete)", set.rows_read, set.rows_dropped);

    print!("Removing price and size outliers...");
    std::io::Write::flush(&mut std::io::stdout())?;
    let cleaned = remove_outliers(set.listings, CleaningConfig::default())?;
    println!(
        " ✓ ({} → {} → {})",
        cleaned.initial_rows, cleaned.after_price, cleaned.after_sqft
    );

    print!("Splitting train / validation / test...");
    std::io::Write::flush(&mut std::io::stdout())?;
    let split = stratified_split(
        &cleaned.listings,
        SplitConfig {
            seed: config.seed,
            ..SplitConfig::default()
        },
    )?;
    let strata = split
        .stratified_by
        .map(|s| format!(", stratified by {s}"))
        .unwrap_or_default();
    println!(
        " ✓ ({}/{}/{}{strata})",
        split.train.len(),
        split.validation.len(),
        split.test.len(),
    );

    let pb = progress_bar(config.cv_folds as u64);
    pb.set_message("Cross-validating...");
    let outcome = match train(&split, config, |done, _| pb.set_position(done as u64)) {
        Ok(outcome) => {
            pb.finish_with_message("Cross-validation complete");
            outcome
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    print!("Saving artifacts to {}...", models_dir.display());
    std::io::Write::flush(&mut std::io::stdout())?;
    let paths = save_outcome(&outcome, models_dir)?;
    println!(" ✓");

    let frequency_encoded = outcome
        .pipeline
        .preprocessor()
        .plan()
        .map(|plan| plan.high_cardinality.clone())
        .unwrap_or_default();
    let report = ReportBuilder::new()
        .model_name(outcome.metadata.model_info.name.clone())
        .rows(RowCounts {
            loaded: set.rows_read,
            incomplete: set.rows_dropped,
            after_outliers: cleaned.after_sqft,
            train: split.train.len(),
            validation: split.validation.len(),
            test: split.test.len(),
        })
        .frequency_encoded(frequency_encoded)
        .cv_scores(outcome.cv_scores.clone())
        .evaluation(outcome.validation, outcome.test)
        .artifact(paths.model.display().to_string())
        .artifact(paths.metadata.display().to_string())
        .build()?;

    println!("{report}");
    if let Some(path) = report_path {
        report.export_to_file(path, ExportFormat::PrettyJson)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn predict_one(
    args: &ModelArgs,
    record: &FeatureRecord,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = args.load()?;
    let price = model.predict(record)?;
    let category = model.pipeline().categorize(price);
    let response = PredictionResponse::new(price, category, model.metadata());

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&response)?),
        "text" => {
            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║{:^62}║", "PRICE PREDICTION");
            println!("╚══════════════════════════════════════════════════════════════╝\n");
            for name in model.metadata().expected_features() {
                if let Some(value) = record.get(name) {
                    println!("  {:<16} {}", name, value);
                }
            }
            println!();
            println!("  Predicted price: {}", response.price_formatted);
            println!("  Category:        {}", response.price_category);
            println!("  Model:           {}", response.model_info);
            println!(
                "  Validation R²:   {:.4} (RMSE {:.0})",
                response.model_performance.validation_r2,
                response.model_performance.validation_rmse
            );
            println!();
        }
        other => return Err(format!("Unknown format '{}' (expected text or json)", other).into()),
    }
    Ok(())
}

fn predict_file(
    args: &ModelArgs,
    input: &Path,
    output: Option<&Path>,
    format: ExportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = args.load()?;
    let frame = read_feature_frame(std::fs::File::open(input)?)?;
    let prices = model.pipeline().batch_predict_frame(&frame)?;
    let rows = BatchPredictionRow::from_prices(&prices, |p| model.pipeline().categorize(p));

    match output {
        Some(path) => {
            rows.export_to_file(path, format)?;
            println!("Predicted {} rows → {}", rows.len(), path.display());
        }
        None => print!("{}", rows.export_to_string(format)?),
    }
    Ok(())
}

fn show_info(args: &ModelArgs, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let paths = config.model_paths();
    let metadata = ModelMetadata::load(&paths.metadata)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    let perf = &metadata.performance;
    println!("\nModel: {}", metadata.model_info.name);
    println!("{}", "=".repeat(64));
    println!("  Type:            {}", metadata.model_info.model_type);
    println!("  Framework:       {}", metadata.model_info.framework);
    println!(
        "  Created:         {}",
        metadata.model_info.created_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Target:          {}", metadata.model_info.target);
    println!("  Features:        {}", metadata.expected_features().join(", "));
    println!(
        "  Unknown policy:  {} (threshold {})",
        metadata.preprocessing.unknown_policy, metadata.preprocessing.high_cardinality_threshold
    );
    println!("{}", "-".repeat(64));
    if let (Some(mean), Some(std)) = (perf.cv_r2_mean, perf.cv_r2_std) {
        println!("  CV R²:           {:.4} (+/- {:.4})", mean, std);
    }
    println!("  Validation R²:   {:.4}", perf.val_r2);
    println!("  Validation RMSE: {:.0}", perf.val_rmse);
    println!("  Validation MAE:  {:.0}", perf.val_mae);
    if let (Some(r2), Some(rmse)) = (perf.test_r2, perf.test_rmse) {
        println!("  Test R²:         {:.4}", r2);
        println!("  Test RMSE:       {:.0}", rmse);
    }
    println!("{}", "-".repeat(64));
    println!("  Model file:      {}", paths.model.display());
    println!("  Metadata file:   {}", paths.metadata.display());
    println!("  abode {}\n", VERSION);
    Ok(())
}

fn migrate_metadata(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let legacy: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(input)?)?;
    let metadata = migrate_legacy(&legacy, &CATEGORICAL_FEATURES)?;
    metadata.save(output)?;
    println!(
        "Migrated {} ({} features) → {}",
        metadata.model_info.name,
        metadata.expected_features().len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_predict_arguments() {
        let cli = Cli::try_parse_from([
            "abode",
            "predict",
            "--broker",
            "Brokered by COMPASS",
            "--type",
            "Condo for sale",
            "--beds",
            "2",
            "--bath",
            "1.0",
            "--propertysqft",
            "800",
            "--sublocality",
            "Manhattan",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict {
                property_type,
                sqft,
                format,
                ..
            } => {
                assert_eq!(property_type, "Condo for sale");
                assert_eq!(sqft, 800.0);
                assert_eq!(format, "text");
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_model_paths_must_come_in_pairs() {
        let result = Cli::try_parse_from(["abode", "info", "--model", "m.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_model_args_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("abode.json");
        std::fs::write(&config_path, r#"{"port": 8000, "models_dir": "/srv/models"}"#).unwrap();

        let args = ModelArgs {
            config: Some(config_path),
            models_dir: Some(dir.path().to_path_buf()),
            model: None,
            metadata: None,
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.models_dir, dir.path());
    }

    #[test]
    fn test_migrate_metadata_command() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.json");
        let output = dir.path().join("metadata.json");
        std::fs::write(
            &legacy,
            r#"{
                "model_info": {"name": "XGBoost with Frequency Encoding", "created_timestamp": "20251025"},
                "data_info": {"selected_features": ["brokertitle", "type", "beds", "bath", "propertysqft", "sublocality"]},
                "performance": {"validation_r2": 0.67, "validation_rmse": 810000.0, "validation_mae": 400000.0}
            }"#,
        )
        .unwrap();

        migrate_metadata(&legacy, &output).unwrap();
        let metadata = ModelMetadata::load(&output).unwrap();
        assert_eq!(metadata.model_info.name, "XGBoost with Frequency Encoding");
        assert_eq!(metadata.features.categorical, ["brokertitle", "type", "sublocality"]);
        assert_eq!(metadata.performance.val_r2, 0.67);
    }
}
