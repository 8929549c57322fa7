//! CropGuard CLI
//!
//! Single-image prediction, batch evaluation against a labeled directory,
//! and a listing of the classes a checkpoint knows about.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cropguard::advice::AdviceRequest;
use cropguard::backend::{backend_name, default_device, InferenceBackend};
use cropguard::config::AppConfig;
use cropguard::evaluation::{Evaluator, EvaluatorOptions, ManifestLabels};
use cropguard::inference::{predict_file, ImageClassifier, LeafClassifier};
use cropguard::utils::logging::{init_logging, LogConfig};

/// CropGuard plant disease classification
///
/// Classifies plant-leaf images with a trained Burn model and measures
/// classifier accuracy on a labeled test set.
#[derive(Parser, Debug)]
#[command(name = "cropguard")]
#[command(version)]
#[command(about = "Plant-leaf disease inference and evaluation with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "CROPGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Checkpoint file (overrides the configuration)
    #[arg(long, global = true, env = "CROPGUARD_CHECKPOINT")]
    checkpoint: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a single image
    Predict {
        /// Path to a JPG, JPEG or PNG image
        #[arg(short, long)]
        image: PathBuf,

        /// Number of ranked predictions to show
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Evaluate the classifier on a directory of labeled images
    Evaluate {
        /// Directory of `<ClassName><digits>.<ext>` images
        #[arg(short = 'd', long, env = "CROPGUARD_TEST_DIR")]
        test_dir: Option<PathBuf>,

        /// Classify images in parallel
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// JSON object mapping file names to class names, instead of the file-name rule
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Write the report as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Write the confusion matrix as CSV
        #[arg(long, value_name = "FILE")]
        confusion_csv: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long, default_value = "false")]
        no_progress: bool,
    },

    /// List the classes stored in the checkpoint
    Classes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(checkpoint) = cli.checkpoint {
        config.checkpoint = checkpoint;
    }

    print_banner();

    match cli.command {
        Commands::Predict { image, top_k } => {
            let top_k = top_k.unwrap_or(config.top_k);
            cmd_predict(&config, &image, top_k)?;
        }

        Commands::Evaluate {
            test_dir,
            parallel,
            manifest,
            json,
            confusion_csv,
            no_progress,
        } => {
            let options = EvaluateArgs {
                test_dir: test_dir.unwrap_or_else(|| config.evaluation.test_dir.clone()),
                parallel: parallel || config.evaluation.parallel,
                manifest,
                json,
                confusion_csv,
                show_progress: !no_progress,
            };
            cmd_evaluate(&config, options)?;
        }

        Commands::Classes => {
            cmd_classes(&config)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════════════╗
 ║   🌱 CropGuard                                                   ║
 ║   Plant-Leaf Disease Classification with Burn + Rust             ║
 ╚══════════════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

/// Checkpoint loading is fatal: nothing runs without a valid model
fn load_classifier(config: &AppConfig) -> Result<LeafClassifier<InferenceBackend>> {
    println!("{}", "Loading model...".cyan());
    println!("  🧠 Checkpoint: {}", config.checkpoint.display());
    println!("  🖥️  Backend:    {}", backend_name());
    println!();

    let classifier = LeafClassifier::<InferenceBackend>::load(&config.checkpoint, &default_device())
        .with_context(|| format!("Failed to load checkpoint {}", config.checkpoint.display()))?;

    println!(
        "{} Model loaded with {} classes",
        "✓".green(),
        classifier.vocabulary().len()
    );
    println!();

    Ok(classifier)
}

fn cmd_predict(config: &AppConfig, image: &Path, top_k: usize) -> Result<()> {
    info!("Running inference on {:?}", image);

    let classifier = load_classifier(config)?;

    let result = predict_file(&classifier, image, top_k)
        .with_context(|| format!("Prediction failed for {}", image.display()))?;

    let advice = AdviceRequest::from_prediction(&result);

    println!("{}", "Prediction Result:".cyan().bold());
    println!("  📷 Image:   {}", image.display());
    println!("  🌿 Crop:    {}", advice.crop);
    println!("  🦠 Disease: {}", advice.display_name.bold());
    println!();
    print!("{}", result.display());

    Ok(())
}

struct EvaluateArgs {
    test_dir: PathBuf,
    parallel: bool,
    manifest: Option<PathBuf>,
    json: Option<PathBuf>,
    confusion_csv: Option<PathBuf>,
    show_progress: bool,
}

fn cmd_evaluate(config: &AppConfig, args: EvaluateArgs) -> Result<()> {
    info!("Evaluating on {:?}", args.test_dir);

    println!("{}", "Evaluation Configuration:".cyan().bold());
    println!("  📁 Test dir: {}", args.test_dir.display());
    println!("  ⚡ Parallel: {}", args.parallel);
    println!();

    let classifier: Arc<dyn ImageClassifier> = Arc::new(load_classifier(config)?);

    let mut evaluator = Evaluator::new(classifier).with_options(EvaluatorOptions {
        parallel: args.parallel,
        show_progress: args.show_progress,
    });

    if let Some(manifest) = &args.manifest {
        let labels = ManifestLabels::load(manifest)
            .with_context(|| format!("Failed to load label manifest {}", manifest.display()))?;
        info!("Using label manifest with {} entries", labels.len());
        evaluator = evaluator.with_labels(labels);
    }

    let report = evaluator
        .evaluate(&args.test_dir)
        .with_context(|| format!("Evaluation failed for {}", args.test_dir.display()))?;

    println!();
    println!("{}", report);
    println!();

    if report.total == 0 {
        println!(
            "{} No images with a known label were evaluated",
            "Warning:".yellow()
        );
    }

    if let Some(path) = &args.json {
        report
            .save_json(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Report saved to {}", "✓".green(), path.display());
    }

    if let Some(path) = &args.confusion_csv {
        report
            .confusion_matrix
            .save_csv(path, &report.class_names)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Confusion matrix saved to {}", "✓".green(), path.display());
    }

    Ok(())
}

fn cmd_classes(config: &AppConfig) -> Result<()> {
    let classifier = load_classifier(config)?;

    println!("{}", "Supported classes:".cyan().bold());
    for (idx, name) in classifier.vocabulary().iter() {
        println!("  {:>3}. {}", idx, name);
    }

    Ok(())
}
