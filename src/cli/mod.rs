//! churnpipe CLI Module
//!
//! Command-line interface for training, scoring and inspecting artifacts.

mod form;

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{DataLoader, RawRecord};
use crate::export::ArtifactStore;
use crate::inference::{InferenceConfig, InferenceEngine, Prediction, Verdict};
use crate::preprocessing::UnknownCategoryPolicy;
use crate::training::{TrainEngine, TrainingConfig, TrainingOutcome};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }
fn alert(s: &str) -> ColoredString { s.truecolor(240, 110, 100) }

fn kv(key: &str, val: &str) {
    println!("  {:<20} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "churnpipe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer churn prediction: train and serve with one frozen feature pipeline")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit the feature pipeline and classifier, evaluate and write artifacts
    Train {
        /// Customer CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name (overrides the config file)
        #[arg(short, long)]
        target: Option<String>,

        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: String,

        /// JSON training configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output artifact directory
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,
    },

    /// Score one customer record
    Predict {
        /// Artifact directory written by `train`
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Record as inline JSON or a path to a JSON file; prompts when absent
        #[arg(short, long)]
        record: Option<String>,

        /// Encode accepted values missing from the training vocabulary with their
        /// fallback instead of rejecting; values outside the accepted domain are
        /// still invalid
        #[arg(long)]
        fallback: bool,

        /// Churn probability threshold
        #[arg(long, default_value = "0.5")]
        threshold: f64,
    },

    /// Print the frozen vocabulary, scaler parameters, fill values and feature order
    Inspect {
        /// Artifact directory written by `train`
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    target: Option<&str>,
    delimiter: &str,
    config_path: Option<&Path>,
    artifacts: &Path,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = match config_path {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(target) = target {
        config = config.with_target(target);
    }
    config.validate()?;

    step_run("Loading data");
    let start = Instant::now();
    let loader = DataLoader::new().with_delimiter(DataLoader::parse_delimiter(delimiter)?);
    let df = loader.load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run(&format!("Training {}", "xgboost".cyan()));
    let start = Instant::now();
    let outcome = TrainEngine::new(config).train_frame(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", artifacts.display()));
    let manifest = ArtifactStore::new(artifacts).save(&outcome)?;
    step_done(&format!("{} files", manifest.files.len() + 1));

    print_evaluation(&outcome);
    Ok(())
}

fn print_evaluation(outcome: &TrainingOutcome) {
    let m = &outcome.metrics;

    section("Partition");
    kv("Train rows", &outcome.sizes.train.to_string());
    kv("Test rows", &outcome.sizes.test.to_string());
    kv("Features", &m.n_features.to_string());
    if !outcome.test_transform.unknown.is_empty() {
        kv(
            "Unseen categories",
            &format!("{} (fallback encoded)", outcome.test_transform.unknown.len()),
        );
    }

    section("Metrics");
    kv("Accuracy", &format!("{:.4}", m.accuracy));
    kv("Precision", &format!("{:.4}", m.precision));
    kv("Recall", &format!("{:.4}", m.recall));
    kv("F1", &format!("{:.4}", m.f1_score));
    kv("ROC AUC", &fmt_opt(m.auc_roc));
    kv("Log loss", &fmt_opt(m.log_loss));
    kv("Time", &format!("{:.3}s", m.training_time_secs));

    section("Confusion matrix");
    let cm = &m.confusion;
    println!("  {:<14} {:>12} {:>12}", "", muted("pred 0"), muted("pred 1"));
    println!("  {:<14} {:>12} {:>12}", muted("actual 0"), cm.true_negative, cm.false_positive);
    println!("  {:<14} {:>12} {:>12}", muted("actual 1"), cm.false_negative, cm.true_positive);

    section("Classification report");
    for line in outcome.report.to_string().lines() {
        println!("  {}", line);
    }

    section("Top features");
    for (name, weight) in outcome.model.feature_importances().iter().take(5) {
        kv(name, &format!("{:.3}", weight));
    }
    println!();
}

pub fn cmd_predict(
    artifacts: &Path,
    record: Option<&str>,
    fallback: bool,
    threshold: f64,
) -> anyhow::Result<()> {
    let engine = load_engine(artifacts, fallback, threshold)?;

    match record {
        Some(raw) => {
            let record = read_record(raw)?;
            let prediction = engine.predict_record(&record)?;
            print_prediction(&prediction);
            Ok(())
        }
        None => score_interactively(&engine),
    }
}

fn load_engine(artifacts: &Path, fallback: bool, threshold: f64) -> anyhow::Result<InferenceEngine> {
    let policy = if fallback {
        UnknownCategoryPolicy::Fallback
    } else {
        UnknownCategoryPolicy::Reject
    };
    let config = InferenceConfig::new()
        .with_threshold(threshold)
        .with_unknown_category(policy);
    Ok(InferenceEngine::load(config, &ArtifactStore::new(artifacts))?)
}

fn read_record(raw: &str) -> anyhow::Result<RawRecord> {
    let json = if raw.trim_start().starts_with('{') {
        raw.to_string()
    } else {
        std::fs::read_to_string(raw)?
    };
    Ok(RawRecord::from_json(&json)?)
}

fn score_interactively(engine: &InferenceEngine) -> anyhow::Result<()> {
    use dialoguer::Confirm;

    let theme = form::theme();
    section("Customer");
    loop {
        let record = form::prompt_record(&theme)?;
        match engine.predict_record(&record) {
            Ok(prediction) => print_prediction(&prediction),
            Err(e) if e.is_request_error() => {
                println!();
                println!("  {} {}", alert("✗"), e);
            }
            Err(e) => return Err(e.into()),
        }

        println!();
        let again = Confirm::with_theme(&theme)
            .with_prompt("Score another customer")
            .default(false)
            .interact()?;
        if !again {
            break;
        }
    }
    Ok(())
}

fn print_prediction(prediction: &Prediction) {
    section("Prediction");
    let verdict = prediction.verdict.to_string();
    let styled = match prediction.verdict {
        Verdict::Churn => alert(&verdict).bold(),
        Verdict::NotChurn => ok(&verdict).bold(),
    };
    println!("  {:<20} {}", muted("Verdict"), styled);
    kv("Churn probability", &format!("{:.4}", prediction.probability));
    for flag in &prediction.flags {
        println!(
            "  {} unknown {} '{}' encoded with fallback",
            alert("!"),
            flag.column,
            flag.value
        );
    }
    println!();
}

pub fn cmd_inspect(artifacts: &Path) -> anyhow::Result<()> {
    let store = ArtifactStore::new(artifacts);
    let manifest = store.load_manifest()?;
    let preprocessor = store.load_preprocessor()?;

    section("Artifacts");
    kv("Directory", &artifacts.display().to_string());
    kv("Created", &manifest.created_at.to_rfc3339());
    kv("Written by", &format!("churnpipe v{}", manifest.crate_version));
    kv("Test accuracy", &format!("{:.4}", manifest.metrics.accuracy));

    section("Feature order");
    for (i, name) in preprocessor.feature_names()?.iter().enumerate() {
        println!("  {:>3}  {}", dim(&i.to_string()), name.white());
    }

    if let Some(encoders) = preprocessor.encoders() {
        section("Vocabulary");
        for encoder in &encoders.onehot {
            kv(encoder.column(), &encoder.categories().join(", "));
        }
        for encoder in &encoders.binary {
            let pairs: Vec<String> = encoder
                .categories()
                .iter()
                .map(|(label, code)| format!("{}→{}", label, code))
                .collect();
            let fallback = encoder
                .fallback()
                .map_or_else(|| "reject".to_string(), |c| format!("fallback {}", c));
            kv(encoder.column(), &format!("{}  ({})", pairs.join(", "), fallback));
        }
    }

    if let Some(imputer) = preprocessor.imputer() {
        section("Imputation");
        for (column, strategy, fill) in imputer.fill_values() {
            kv(column, &format!("{:?} = {:.4}", strategy, fill));
        }
    }

    if let Some(scalers) = preprocessor.scalers() {
        section("Scaling");
        for scaler in [&scalers.robust, &scalers.minmax] {
            for column in scaler.columns() {
                if let Some(p) = scaler.params(column) {
                    kv(
                        column,
                        &format!(
                            "{:?}  center {:.4}  scale {:.4}  range [{}, {}]",
                            scaler.scaler_type(),
                            p.center,
                            p.scale,
                            p.data_min,
                            p.data_max
                        ),
                    );
                }
            }
        }
    }
    println!();
    Ok(())
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("       {}", "churnpipe".truecolor(120, 170, 255).bold());
    println!(
        "       {}",
        dim(&format!("churn prediction  ·  v{}  ·  rust", env!("CARGO_PKG_VERSION")))
    );
    println!();
}

fn show_help() {
    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("churnpipe", "Interactive launcher (default)"),
        ("churnpipe train -d churn.csv -t Exited", "Train and write artifacts"),
        ("churnpipe predict", "Score a customer interactively"),
        ("churnpipe predict -r record.json", "Score a JSON record"),
        ("churnpipe inspect", "Show frozen pipeline state"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<44} {}", cmd.white(), muted(desc));
    }
    println!();
}

pub fn cmd_interactive(artifacts: &Path) -> anyhow::Result<()> {
    use dialoguer::Select;

    print_banner();
    let theme = form::theme();

    loop {
        let items = &[
            "Score Customer        fill in the customer form",
            "Inspect Artifacts     frozen pipeline state",
            "Help                  commands",
            "Exit",
        ];

        println!();
        let sel = Select::with_theme(&theme)
            .with_prompt("What would you like to do")
            .items(items)
            .default(0)
            .interact_opt()?;

        match sel {
            Some(0) => match load_engine(artifacts, false, 0.5) {
                Ok(engine) => score_interactively(&engine)?,
                Err(e) => println!("  {} {}", alert("✗"), e),
            },
            Some(1) => {
                if let Err(e) = cmd_inspect(artifacts) {
                    println!("  {} {}", alert("✗"), e);
                }
            }
            Some(2) => show_help(),
            _ => {
                println!();
                println!("  {}", dim("goodbye"));
                println!();
                break;
            }
        }
    }

    step_ok("done");
    Ok(())
}
