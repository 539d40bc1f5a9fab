//! CLI module for the MRI Inference Gateway
//!
//! Provides subcommands:
//! - `serve`: HTTP API server
//! - `predict`: classify a single image file and print the result

pub mod predict;
pub mod serve;

use clap::{Parser, Subcommand};

/// MRI Inference Gateway - brain MRI tumor classification
#[derive(Parser)]
#[command(name = "mri-inference-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Classify one image with the local model
    Predict(predict::PredictArgs),
}
