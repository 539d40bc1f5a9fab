//! Brain MRI classification strategies

mod factory;
mod loader;
mod local;
pub mod model;
mod preprocess;
mod remote;

pub use factory::ClassifierFactory;
pub use loader::{load_fused_classifier, WeightsFormat};
pub use local::LocalClassifier;
pub use preprocess::{to_luma, ImagePreprocessor, INPUT_SIZE};
pub use remote::RemoteClassifier;

#[cfg(test)]
pub(crate) use loader::fixture as loader_fixture;
#[cfg(test)]
pub(crate) use preprocess::fixture as preprocess_fixture;
