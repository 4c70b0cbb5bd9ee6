pub mod error;
pub mod label;
pub mod schema;

pub use error::{ErrorKind, GENERIC_ERROR_MESSAGE, InferenceError};
pub use label::PredictionLabel;
pub use schema::{FeatureSchema, FeatureVector, ScaledFeatureVector, food_waste};
