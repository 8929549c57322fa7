//! Model module
//!
//! - `cnn`: the LeafNet architecture built with Burn
//! - `vocabulary`: ordered class names, index = model output position
//! - `checkpoint`: single-file persistence of {parameters, class names}

pub mod checkpoint;
pub mod cnn;
pub mod vocabulary;

// Re-export main types for convenience
pub use checkpoint::{load_checkpoint, save_checkpoint, CheckpointRecord};
pub use cnn::{LeafNet, LeafNetConfig};
pub use vocabulary::LabelVocabulary;
