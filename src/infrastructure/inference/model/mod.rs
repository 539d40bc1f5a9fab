//! Network definitions for the fused ResNet/ViT brain MRI classifier

mod fused;
mod resnet;
mod vit;

pub use fused::{classifier_head, FusedClassifier, FusedOutput, FUSED_FEATURES};
pub use resnet::{ResNet18Features, RESNET18_FEATURES};
pub use vit::{VisionTransformer, VitConfig};
