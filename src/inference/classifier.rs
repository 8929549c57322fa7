//! Classifier service
//!
//! [`ImageClassifier`] is the seam the evaluation engine and the adapters
//! depend on. [`LeafClassifier`] is the burn-backed implementation. Burn
//! modules are `Send` but not `Sync`, so the network sits behind a mutex;
//! each call clones it under the lock and runs the forward pass on the clone.

use std::path::Path;
use std::sync::Mutex;

use burn::tensor::{activation::softmax, backend::Backend, Tensor, TensorData};
use tracing::info;

use crate::inference::preprocess::{ImageTensor, Preprocessor};
use crate::model::{load_checkpoint, LabelVocabulary, LeafNet};
use crate::utils::error::{CheckpointError, PredictionError};

/// Single-image classifier producing a full probability distribution
pub trait ImageClassifier: Send + Sync {
    /// Class names in model output order
    fn vocabulary(&self) -> &LabelVocabulary;

    /// Tensor shape accepted by [`ImageClassifier::infer`]
    fn input_shape(&self) -> [usize; 3];

    /// One probability per vocabulary entry, each in [0, 1], summing to 1
    fn infer(&self, tensor: &ImageTensor) -> Result<Vec<f32>, PredictionError>;

    /// Preprocessor producing tensors of [`ImageClassifier::input_shape`]
    fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new().with_image_size(self.input_shape()[1])
    }
}

/// LeafNet loaded from a checkpoint
#[derive(Debug)]
pub struct LeafClassifier<B: Backend> {
    model: Mutex<LeafNet<B>>,
    vocabulary: LabelVocabulary,
    device: B::Device,
    input_shape: [usize; 3],
}

impl<B: Backend> LeafClassifier<B> {
    /// Wrap an already built model. The head width must match the vocabulary.
    pub fn new(
        model: LeafNet<B>,
        vocabulary: LabelVocabulary,
        device: B::Device,
    ) -> Result<Self, CheckpointError> {
        if model.num_classes() != vocabulary.len() {
            return Err(CheckpointError::corrupt(
                "<in-memory model>",
                format!(
                    "classification head has {} outputs but the vocabulary has {} classes",
                    model.num_classes(),
                    vocabulary.len()
                ),
            ));
        }

        Ok(Self {
            model: Mutex::new(model),
            vocabulary,
            device,
            input_shape: Preprocessor::new().output_shape(),
        })
    }

    /// Load a checkpoint and build the classifier on `device`
    pub fn load(path: &Path, device: &B::Device) -> Result<Self, CheckpointError> {
        let (model, vocabulary) = load_checkpoint::<B>(path, device)?;
        let classifier = Self::new(model, vocabulary, device.clone())?;

        info!(
            "Classifier ready: {} classes, input {:?}",
            classifier.vocabulary.len(),
            classifier.input_shape
        );

        Ok(classifier)
    }

    /// Snapshot of the loaded network. Tensors are reference counted, so
    /// the clone shares parameter storage with the classifier.
    pub fn model(&self) -> Result<LeafNet<B>, PredictionError> {
        self.model
            .lock()
            .map(|model| model.clone())
            .map_err(|_| PredictionError::Inference("model lock poisoned".to_string()))
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: Backend> ImageClassifier for LeafClassifier<B>
where
    LeafNet<B>: Send,
    B::Device: Send + Sync,
{
    fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    fn input_shape(&self) -> [usize; 3] {
        self.input_shape
    }

    fn infer(&self, tensor: &ImageTensor) -> Result<Vec<f32>, PredictionError> {
        if tensor.shape() != self.input_shape {
            return Err(PredictionError::Inference(format!(
                "expected tensor of shape {:?}, got {:?}",
                self.input_shape,
                tensor.shape()
            )));
        }

        let [c, h, w] = self.input_shape;
        let data = TensorData::new(tensor.data().to_vec(), [1, c, h, w]);
        let input = Tensor::<B, 4>::from_data(data, &self.device);

        let logits = self.model()?.forward(input);
        let probabilities = softmax(logits, 1);

        let probabilities: Vec<f32> = probabilities
            .into_data()
            .to_vec()
            .map_err(|e| PredictionError::Inference(format!("cannot read model output: {:?}", e)))?;

        if probabilities.len() != self.vocabulary.len() {
            return Err(PredictionError::Inference(format!(
                "model produced {} probabilities for {} classes",
                probabilities.len(),
                self.vocabulary.len()
            )));
        }

        Ok(probabilities)
    }
}
