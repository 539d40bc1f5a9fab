//! Infrastructure services

mod assistant_service;
mod prediction_service;

pub use assistant_service::{
    AssistantService, AssistantSettings, EMPTY_ANSWER, SYSTEM_PROMPT, UNAVAILABLE_ANSWER,
};
pub use prediction_service::{PredictionService, UploadedImage};
