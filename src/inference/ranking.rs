//! Top-K ranking over a probability distribution

use serde::{Deserialize, Serialize};

use crate::model::LabelVocabulary;

/// One entry of a ranked prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    /// Model output index
    pub index: usize,
    /// Class name from the vocabulary
    pub name: String,
    /// Probability in [0, 1]
    pub confidence: f32,
}

/// The `k` most probable classes, highest first.
///
/// Ties are broken by the lower class index. `k` is clamped to the
/// vocabulary size; `k == 0` yields an empty list. Probabilities beyond the
/// vocabulary are ignored.
pub fn top_k(probabilities: &[f32], vocabulary: &LabelVocabulary, k: usize) -> Vec<RankedClass> {
    let mut indexed: Vec<(usize, f32)> = probabilities
        .iter()
        .copied()
        .enumerate()
        .take(vocabulary.len())
        .collect();

    // Stable sort keeps ascending index order among equal probabilities
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

    indexed
        .into_iter()
        .take(k)
        .filter_map(|(index, confidence)| {
            vocabulary.name(index).map(|name| RankedClass {
                index,
                name: name.to_string(),
                confidence,
            })
        })
        .collect()
}
