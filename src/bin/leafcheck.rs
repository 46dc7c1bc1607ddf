//! leafcheck: classify a leaf photo from the command line.
//!
//! Thin presentation layer over [`InferencePipeline`](leafcheck::InferencePipeline):
//! acquires the image, prints the terminal label, optionally saves the preview.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::LazyLock;

use clap::Parser;
use image::DynamicImage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use leafcheck::config::{Config, Secrets};
use leafcheck::{GeminiLeafGate, InferencePipeline, LeafClassifier, LeafError, ModelStatus};

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| leafcheck::version::build_info().long_version());

/// Leafcheck CLI
#[derive(Parser)]
#[command(name = "leafcheck")]
#[command(version = leafcheck::PKG_VERSION)]
#[command(long_version = LONG_VERSION.as_str())]
#[command(about = "Check whether a photographed leaf is healthy")]
struct Args {
    /// Image file to classify
    image: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Classifier model artifact (overrides config)
    #[arg(short, long, env = "LEAFCHECK_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Write the display-resized preview image here
    #[arg(short, long)]
    preview: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "leafcheck=debug" } else { "leafcheck=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<ExitCode, LeafError> {
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    info!(version = leafcheck::version_string(), "leafcheck starting");

    let pipeline = build_pipeline(&config, &secrets, args.model.as_deref())?;
    if let ModelStatus::Failed { reason } = pipeline.model_status() {
        // Leaves will come back as "Error in Prediction"; say why up front.
        eprintln!("Error loading model: {reason}");
    }

    let outcome = pipeline.run(load_image(&args.image)).await;
    println!("{}", outcome.result);

    if let (Some(path), Some(preview)) = (args.preview.as_deref(), outcome.preview.as_ref()) {
        if let Err(e) = preview.save(path) {
            warn!(path = %path.display(), error = %e, "failed to write preview");
        }
    }

    pipeline.shutdown().await;

    Ok(if outcome.result.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Unreadable or undecodable files count as an absent image.
fn load_image(path: &Path) -> Option<DynamicImage> {
    match image::open(path) {
        Ok(image) => Some(image),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to load image");
            None
        }
    }
}

/// Build an [`InferencePipeline`] from configuration.
fn build_pipeline(
    config: &Config,
    secrets: &Secrets,
    model_override: Option<&Path>,
) -> Result<InferencePipeline, LeafError> {
    let api_key = secrets.gate_api_key().ok_or_else(|| {
        LeafError::Configuration(
            "No gate API key. Set LEAFCHECK_API_KEY or add [gate] api_key to ~/.leafcheck/secrets.toml"
                .to_string(),
        )
    })?;

    let gate = GeminiLeafGate::with_options(
        api_key,
        &config.gate.base_url,
        &config.gate.model,
        config.gate.timeout(),
    )?;

    let model_path = model_override.or(config.classifier.model_path.as_deref());
    let classifier = load_classifier(config, model_path)?;

    InferencePipeline::builder()
        .gate(gate)
        .classifier(classifier)
        .display_max_dimension(config.display.max_dimension)
        .build()
}

#[cfg(feature = "onnx")]
fn load_classifier(
    config: &Config,
    model_path: Option<&Path>,
) -> Result<LeafClassifier, LeafError> {
    let device = config.classifier.device()?;
    let path = leafcheck::providers::onnx::resolve_model_path(model_path);
    Ok(LeafClassifier::load_onnx(path, device))
}

#[cfg(not(feature = "onnx"))]
fn load_classifier(
    _config: &Config,
    _model_path: Option<&Path>,
) -> Result<LeafClassifier, LeafError> {
    Ok(LeafClassifier::unavailable(
        "leafcheck was built without the `onnx` feature",
    ))
}
