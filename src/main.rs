use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

use seefood::app::{self, ConsoleSink, Dispatch};
use seefood::{ClassificationPipeline, RtenClassifier, Session, Settings};

#[derive(Parser)]
#[command(name = "seefood")]
#[command(about = "Tell whether a photo shows a hotdog")]
struct Cli {
    /// Paths to input image files
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// Settings file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretrained model file (.rten)
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Labels file, one label per line
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// Substring the top label must contain for a positive answer
    #[arg(long)]
    keyword: Option<String>,

    /// Treat keyword matches below this confidence as negative
    #[arg(long, value_name = "0.0-1.0")]
    min_confidence: Option<f32>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Start every image right away and only report the most recent one
    #[arg(long)]
    latest_only: bool,
}

impl Cli {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(model) = &self.model {
            settings.model.model_path = model.clone();
        }
        if let Some(labels) = &self.labels {
            settings.model.labels_path = labels.clone();
        }
        if let Some(keyword) = &self.keyword {
            settings.decision.keyword = keyword.clone();
        }
        if self.min_confidence.is_some() {
            settings.decision.min_confidence = self.min_confidence;
        }
        if self.verbose {
            settings.logging.level = "debug".to_string();
        }
    }
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply_to(&mut settings);
    settings.validate()?;

    init_logging(settings.log_level()?);

    let classifier = RtenClassifier::load(&settings.model).context("Failed to load classifier")?;

    let mut pipeline = ClassificationPipeline::new(Arc::new(classifier), settings.decision.clone())
        .with_resize(settings.preprocessing.resize);

    if let Some(debug_dir) = args.debug_out.clone() {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let session = Arc::new(Session::new(Arc::new(pipeline)));

    let dispatch = if args.latest_only {
        Dispatch::LatestWins
    } else {
        Dispatch::Sequential
    };

    let captures = app::spawn_file_source(args.images.clone());
    let mut sink = ConsoleSink {
        verbose: args.verbose,
    };
    let summary = app::run(session, captures, &mut sink, dispatch).await;

    if args.verbose {
        println!(
            "\n{} decided, {} failed, {} superseded",
            summary.decided, summary.failed, summary.superseded
        );
    }

    Ok(())
}
