//! Weights artifact loading

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use std::path::Path;
use tracing::{debug, info};

use super::model::FusedClassifier;
use crate::domain::DomainError;

/// Supported weights artifact formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightsFormat {
    SafeTensors,
    PyTorch,
}

impl WeightsFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();

        match extension.as_str() {
            "safetensors" => Some(Self::SafeTensors),
            "pth" | "pt" => Some(Self::PyTorch),
            _ => None,
        }
    }
}

/// Build the fused classifier and bind the weights stored at `path`.
///
/// Any failure here is a configuration problem: the file is missing, has an
/// unknown extension, or holds tensors that do not match the network.
pub fn load_fused_classifier(path: &Path, device: &Device) -> Result<FusedClassifier, DomainError> {
    if !path.is_file() {
        return Err(DomainError::configuration(format!(
            "Model weights not found at {}",
            path.display()
        )));
    }

    let format = WeightsFormat::from_path(path).ok_or_else(|| {
        DomainError::configuration(format!(
            "Unsupported weights format for {} (expected .safetensors, .pth or .pt)",
            path.display()
        ))
    })?;

    debug!(path = %path.display(), format = ?format, "Loading model weights");

    let load_error = |e: candle_core::Error| {
        DomainError::configuration(format!(
            "Failed to load model weights from {}: {}",
            path.display(),
            e
        ))
    };

    let vb = match format {
        // SAFETY: the artifact is mapped read-only and must not be modified
        // while the process is running.
        WeightsFormat::SafeTensors => unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device).map_err(load_error)?
        },
        WeightsFormat::PyTorch => VarBuilder::from_pth(path, DType::F32, device).map_err(load_error)?,
    };

    let model = FusedClassifier::new(vb).map_err(load_error)?;

    info!(path = %path.display(), "Model weights loaded");

    Ok(model)
}
