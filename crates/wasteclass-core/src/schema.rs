//! Versioned feature schemas and the vectors assembled from them.
//!
//! The schema pins field order. Submitted forms are looked up by name, so the
//! order in which a client sends fields never reaches the model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InferenceError;

/// Named, fixed-order list of model inputs shared by training and inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub fields: Vec<String>,
}

/// Raw numeric inputs in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

/// Feature vector after standardization.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledFeatureVector(Vec<f64>);

/// Food-waste estimate schemas.
pub mod food_waste {
    use super::FeatureSchema;

    /// Version 1 field order, as used when the classifier was trained.
    pub const FIELDS_V1: [&str; 7] = [
        "combined_figures",
        "household_estimate_kg",
        "household_estimate_tonnes",
        "retail_estimate_kg",
        "retail_estimate_tonnes",
        "food_service_estimate_kg",
        "food_service_estimate_tonnes",
    ];

    pub fn schema_v1() -> FeatureSchema {
        FeatureSchema::new(1, FIELDS_V1)
    }
}

impl FeatureSchema {
    pub fn new<I, S>(version: u32, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Human-readable field caption, e.g. `household_estimate_kg` →
    /// `Household Estimate Kg`.
    pub fn caption(field: &str) -> String {
        field
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Convert submitted form values into a vector in schema order.
    ///
    /// Every schema field must be present and parse to a finite `f64`.
    /// Keys outside the schema are ignored.
    pub fn extract(&self, form: &HashMap<String, String>) -> Result<FeatureVector, InferenceError> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let raw = form
                .get(field)
                .ok_or_else(|| InferenceError::MissingField(field.clone()))?;
            let value: f64 = raw.trim().parse().map_err(|_| InferenceError::NotNumeric {
                field: field.clone(),
                value: raw.clone(),
            })?;
            if !value.is_finite() {
                return Err(InferenceError::NotFinite {
                    field: field.clone(),
                    value,
                });
            }
            values.push(value);
        }

        let extra = form.len().saturating_sub(values.len());
        if extra > 0 {
            debug!(extra, "ignoring form keys outside the feature schema");
        }

        Ok(FeatureVector(values))
    }
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ScaledFeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
