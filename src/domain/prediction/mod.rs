//! Prediction history domain

mod entity;

pub use entity::{PredictionRecord, PredictionRecordId, StoredImage};
