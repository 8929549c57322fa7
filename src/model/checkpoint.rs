//! Checkpoint persistence
//!
//! A checkpoint is a single named-MessagePack file holding two logical fields:
//! the LeafNet parameter record and the ordered class names. Loading validates
//! that both are present and that every parameter shape agrees with the
//! vocabulary before any parameter is bound.
//!
//! Files are read and written at exactly the given path, whatever its
//! extension.

use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Record, Recorder},
    tensor::backend::Backend,
};
use tracing::{debug, info};

use crate::model::cnn::{LeafNet, LeafNetConfig, LeafNetRecord};
use crate::model::vocabulary::LabelVocabulary;
use crate::utils::error::CheckpointError;

/// Full precision keeps reloaded logits identical to the saved model's
pub type CheckpointRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

/// On-disk layout of a checkpoint
#[derive(Record)]
pub struct CheckpointRecord<B: Backend> {
    pub model: LeafNetRecord<B>,
    pub class_names: Vec<String>,
}

/// Load and validate a checkpoint.
///
/// # Errors
/// * [`CheckpointError::NotFound`] if `path` does not exist
/// * [`CheckpointError::Corrupt`] if the file cannot be decoded, the class
///   names are empty or duplicated, or any layer shape disagrees with the
///   vocabulary
pub fn load_checkpoint<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> Result<(LeafNet<B>, LabelVocabulary), CheckpointError> {
    if !path.exists() {
        return Err(CheckpointError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(CheckpointError::corrupt(path, "path is not a regular file"));
    }

    info!("Loading checkpoint from {:?}", path);

    let bytes = std::fs::read(path)
        .map_err(|e| CheckpointError::corrupt(path, format!("cannot read file: {}", e)))?;

    let record: CheckpointRecord<B> = CheckpointRecorder::new()
        .load(bytes, device)
        .map_err(|e| CheckpointError::corrupt(path, format!("failed to decode record: {}", e)))?;

    let vocabulary =
        LabelVocabulary::new(record.class_names).map_err(|e| CheckpointError::corrupt(path, e))?;

    let config = LeafNetConfig::from_record(&record.model)
        .map_err(|e| CheckpointError::corrupt(path, e))?;

    if config.num_classes != vocabulary.len() {
        return Err(CheckpointError::corrupt(
            path,
            format!(
                "classification head has {} outputs but the vocabulary has {} classes",
                config.num_classes,
                vocabulary.len()
            ),
        ));
    }

    debug!(
        "Checkpoint architecture: base_filters={}, hidden_units={}, classes={}",
        config.base_filters, config.hidden_units, config.num_classes
    );

    let model = LeafNet::new(&config, device).load_record(record.model);

    info!("Model loaded with {} classes", vocabulary.len());

    Ok((model, vocabulary))
}

/// Write a checkpoint. Refuses to persist a model whose head width does not
/// match the vocabulary.
pub fn save_checkpoint<B: Backend>(
    model: &LeafNet<B>,
    vocabulary: &LabelVocabulary,
    path: &Path,
) -> Result<PathBuf, CheckpointError> {
    if model.num_classes() != vocabulary.len() {
        return Err(CheckpointError::corrupt(
            path,
            format!(
                "refusing to save: head has {} outputs, vocabulary has {} classes",
                model.num_classes(),
                vocabulary.len()
            ),
        ));
    }

    let record = CheckpointRecord {
        model: model.clone().into_record(),
        class_names: vocabulary.names().to_vec(),
    };

    write_record(record, path)
}

/// Persist a raw record at `path`, returning that path
pub(crate) fn write_record<B: Backend>(
    record: CheckpointRecord<B>,
    path: &Path,
) -> Result<PathBuf, CheckpointError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CheckpointError::corrupt(path, format!("cannot create directory: {}", e)))?;
    }

    let bytes = CheckpointRecorder::new()
        .record(record, ())
        .map_err(|e| CheckpointError::corrupt(path, format!("failed to encode record: {}", e)))?;

    std::fs::write(path, bytes)
        .map_err(|e| CheckpointError::corrupt(path, format!("failed to write record: {}", e)))?;

    info!("Checkpoint saved to {:?}", path);
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceBackend;
    use burn::module::Param;
    use burn::tensor::Tensor;
    use tempfile::TempDir;

    type TestBackend = InferenceBackend;

    fn vocab(names: &[&str]) -> LabelVocabulary {
        LabelVocabulary::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn small_model(num_classes: usize) -> LeafNet<TestBackend> {
        let config = LeafNetConfig::new(num_classes)
            .with_base_filters(4)
            .with_hidden_units(8);
        LeafNet::new(&config, &Default::default())
    }

    #[test]
    fn test_missing_checkpoint_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.mpk");

        let err = load_checkpoint::<TestBackend>(&path, &Default::default()).unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[test]
    fn test_save_then_load_keeps_vocabulary_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("leafnet.mpk");
        let vocabulary = vocab(&["TomatoHealthy", "AppleScab", "CornCommonRust", "PotatoEarlyBlight"]);

        let written = save_checkpoint(&small_model(4), &vocabulary, &path).unwrap();
        assert_eq!(written, path);

        let (model, loaded) = load_checkpoint::<TestBackend>(&path, &Default::default()).unwrap();
        assert_eq!(loaded, vocabulary);
        assert_eq!(model.num_classes(), 4);
    }

    #[test]
    fn test_head_wider_than_vocabulary_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mismatch.mpk");

        // 5 outputs, 4 names
        let record = CheckpointRecord {
            model: small_model(5).into_record(),
            class_names: vec![
                "AppleScab".to_string(),
                "CornCommonRust".to_string(),
                "PotatoEarlyBlight".to_string(),
                "TomatoHealthy".to_string(),
            ],
        };
        write_record(record, &path).unwrap();

        let err = load_checkpoint::<TestBackend>(&path, &Default::default()).unwrap_err();
        match err {
            CheckpointError::Corrupt { reason, .. } => {
                assert!(reason.contains("5 outputs"), "unexpected reason: {}", reason);
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_hidden_bias_is_corrupt_at_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("short_bias.mpk");
        let device = Default::default();

        // Hidden width is 8, bias has 5 entries
        let mut model = small_model(3);
        model.hidden.bias = Some(Param::from_tensor(Tensor::zeros([5], &device)));
        let record = CheckpointRecord {
            model: model.into_record(),
            class_names: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        };
        write_record(record, &path).unwrap();

        let err = load_checkpoint::<TestBackend>(&path, &device).unwrap_err();
        match err {
            CheckpointError::Corrupt { reason, .. } => {
                assert!(reason.contains("hidden layer bias"), "unexpected reason: {}", reason);
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_vocabulary_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.mpk");

        let record = CheckpointRecord {
            model: small_model(2).into_record(),
            class_names: Vec::new(),
        };
        write_record(record, &path).unwrap();

        let err = load_checkpoint::<TestBackend>(&path, &Default::default()).unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt { .. }));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("garbage.mpk");
        std::fs::write(&path, b"definitely not messagepack").unwrap();

        let err = load_checkpoint::<TestBackend>(&path, &Default::default()).unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt { .. }));
    }

    #[test]
    fn test_checkpoint_path_is_used_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let vocabulary = vocab(&["AppleScab", "CornCommonRust", "PotatoHealthy"]);

        // Valid checkpoint under a non-mpk extension
        let bin = temp_dir.path().join("leafnet.bin");
        let written = save_checkpoint(&small_model(3), &vocabulary, &bin).unwrap();
        assert_eq!(written, bin);
        assert!(!temp_dir.path().join("leafnet.mpk").exists());

        let (_, loaded) = load_checkpoint::<TestBackend>(&bin, &Default::default()).unwrap();
        assert_eq!(loaded, vocabulary);

        // A broken file is not replaced by a valid sibling with the mpk extension
        let broken = temp_dir.path().join("model.bin");
        std::fs::write(&broken, b"definitely not messagepack").unwrap();
        save_checkpoint(&small_model(3), &vocabulary, &temp_dir.path().join("model.mpk")).unwrap();

        let err = load_checkpoint::<TestBackend>(&broken, &Default::default()).unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt { .. }));
    }

    #[test]
    fn test_save_refuses_mismatched_vocabulary() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("refused.mpk");

        let err = save_checkpoint(&small_model(3), &vocab(&["a", "b"]), &path).unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt { .. }));
        assert!(!path.exists());
    }
}
