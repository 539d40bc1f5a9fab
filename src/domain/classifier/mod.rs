//! Image classification domain: labels, predictions and the classifier trait

mod image_classifier;
mod label;
mod prediction;

pub use image_classifier::ImageClassifier;
pub use label::TumorClass;
pub use prediction::{softmax, Prediction};

#[cfg(test)]
pub use image_classifier::mock::StaticClassifier;
