//! Mapping from raw classifier output to the user-facing category.

use crate::error::InferenceError;

/// Binary food-waste category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionLabel {
    /// Class `0`.
    Low,
    /// Class `1`.
    High,
}

impl PredictionLabel {
    /// Map a classifier's discrete output to a label.
    ///
    /// Only `0` and `1` are part of the model's declared output domain; any
    /// other class means the loaded model is not the one this service expects.
    pub fn from_class(class: i64) -> Result<Self, InferenceError> {
        match class {
            0 => Ok(Self::Low),
            1 => Ok(Self::High),
            other => Err(InferenceError::UnsupportedClass(other)),
        }
    }

    pub fn class(&self) -> i64 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::High => "High",
        }
    }

    /// Sentence rendered back to the form on success.
    pub fn display_text(&self) -> String {
        format!("Predicted Food Waste Category: {}", self.as_str())
    }
}

impl std::fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
