//! Predict command - classify one image file without starting the server

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::Prediction;
use crate::infrastructure::inference::LocalClassifier;
use crate::infrastructure::logging;

/// Arguments for the predict command
#[derive(Args, Clone, Debug)]
pub struct PredictArgs {
    /// Weights artifact (overrides inference.weights_path)
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// Image file to classify
    pub image: PathBuf,
}

/// Classify the image and print the prediction as JSON on stdout
pub async fn run(args: PredictArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let prediction = classify(&args, &config).await?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);

    Ok(())
}

async fn classify(args: &PredictArgs, config: &AppConfig) -> anyhow::Result<Prediction> {
    let weights = args
        .weights
        .clone()
        .unwrap_or_else(|| config.inference.weights_path.clone());
    let image = args.image.clone();

    info!(weights = %weights.display(), image = %image.display(), "Classifying image");

    let prediction = tokio::task::spawn_blocking(move || {
        LocalClassifier::load(&weights)?.predict_image(&image)
    })
    .await??;

    Ok(prediction)
}
