//! Dual-branch classifier fusing CNN and ViT features

use candle_core::{Module, Result, Tensor, D};
use candle_nn::{linear, Linear, VarBuilder};

use super::resnet::{ResNet18Features, RESNET18_FEATURES};
use super::vit::{VisionTransformer, VitConfig};
use crate::domain::TumorClass;

/// Width of the fused feature vector fed to the classifier head
pub const FUSED_FEATURES: usize = RESNET18_FEATURES + VitConfig::tiny_patch16_224().embed_dim;

/// Output of a forward pass
#[derive(Debug, Clone)]
pub struct FusedOutput {
    /// Raw class scores, shape (B, 4)
    pub logits: Tensor,
    /// Deepest CNN feature map, shape (B, 512, 7, 7) for 224x224 inputs
    pub feature_map: Tensor,
}

/// ResNet-18 + ViT-Tiny/16 with a linear head over the concatenated features.
///
/// Parameters live under `cnn.*`, `vit.*` and `classifier.*`. The network is
/// inference-only: batch norm always uses its running statistics.
#[derive(Debug, Clone)]
pub struct FusedClassifier {
    cnn: ResNet18Features,
    vit: VisionTransformer,
    classifier: Linear,
}

impl FusedClassifier {
    /// Assemble the network and bind every parameter from `vb`.
    ///
    /// Fails if any tensor is missing or its shape differs from the topology.
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let cnn = ResNet18Features::new(vb.pp("cnn"))?;
        let vit = VisionTransformer::new(VitConfig::tiny_patch16_224(), vb.pp("vit"))?;
        let classifier = classifier_head(vb.pp("classifier"))?;

        Ok(Self {
            cnn,
            vit,
            classifier,
        })
    }

    /// Run both branches on a normalized (B, 3, 224, 224) batch
    pub fn forward(&self, xs: &Tensor) -> Result<FusedOutput> {
        let feature_map = self.cnn.forward(xs)?;
        let cnn_features = feature_map.mean(D::Minus1)?.mean(D::Minus1)?;
        let vit_features = self.vit.forward(xs)?;

        let fused = Tensor::cat(&[&cnn_features, &vit_features], 1)?;
        let logits = self.classifier.forward(&fused)?;

        Ok(FusedOutput {
            logits,
            feature_map,
        })
    }
}

/// Linear layer mapping fused features to one score per class
pub fn classifier_head(vb: VarBuilder) -> Result<Linear> {
    linear(FUSED_FEATURES, TumorClass::COUNT, vb)
}
