//! Inference layer: standard scaler, binary classifiers, and the request pipeline.

pub mod artifacts;
pub mod classifier;
pub mod pipeline;
pub mod scaler;

pub use artifacts::{ArtifactPaths, is_file, load_pipeline};
pub use classifier::{Classifier, DecisionTree, LinearModel, ModelArtifact, RandomForest, TreeNode};
pub use pipeline::{AssemblyError, InferencePipeline, Prediction};
pub use scaler::StandardScaler;
