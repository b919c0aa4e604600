/// Quadrant dataset loader for pre-tokenized classification data (.npy format)
///
/// Each of the four folds is stored as three NumPy files:
/// `fold{i}__input_ids.npy`, `fold{i}__attention_mask.npy`, and
/// `fold{i}__labels.npy`. Token ids and masks are [N, T] matrices, labels a
/// [N] vector, all saved as i64 the way the tokenization pipeline emits them.
use ndarray::{Array1, Array2};
use ndarray_npy::ReadNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use super::fold::NUM_FOLDS;

/// Metadata from dataset.json
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetMetadata {
    pub vocab_size: usize,
    pub num_classes: usize,
    #[serde(default)]
    pub seq_len: usize,
    #[serde(default)]
    pub description: String,
}

/// One fold of pre-tokenized, labeled examples
pub struct ClassificationDataset {
    input_ids: Array2<u32>,
    attention_mask: Array2<u32>,
    labels: Array1<u32>,
}

impl ClassificationDataset {
    /// Build a dataset from in-memory arrays, validating shapes
    pub fn from_arrays(
        input_ids: Array2<u32>,
        attention_mask: Array2<u32>,
        labels: Array1<u32>,
    ) -> crate::Result<Self> {
        if input_ids.shape() != attention_mask.shape() {
            return Err(crate::QuadTuneError::Data(format!(
                "Shape mismatch: input_ids {:?} != attention_mask {:?}",
                input_ids.shape(),
                attention_mask.shape()
            )));
        }

        if input_ids.nrows() != labels.len() {
            return Err(crate::QuadTuneError::Data(format!(
                "Shape mismatch: {} examples but {} labels",
                input_ids.nrows(),
                labels.len()
            )));
        }

        Ok(Self {
            input_ids,
            attention_mask,
            labels,
        })
    }

    /// Load one fold from its three .npy files
    pub fn from_files<P: AsRef<Path>>(
        input_ids_path: P,
        attention_mask_path: P,
        labels_path: P,
    ) -> crate::Result<Self> {
        let input_ids = read_matrix(input_ids_path.as_ref())?;
        let attention_mask = read_matrix(attention_mask_path.as_ref())?;
        let labels = read_vector(labels_path.as_ref())?;
        Self::from_arrays(input_ids, attention_mask, labels)
    }

    /// Get number of examples
    pub fn len(&self) -> usize {
        self.input_ids.nrows()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.input_ids.nrows() == 0
    }

    /// Get sequence length
    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }

    /// Token id matrix [N, T]
    pub fn input_ids(&self) -> &Array2<u32> {
        &self.input_ids
    }

    /// Attention mask matrix [N, T]
    pub fn attention_mask(&self) -> &Array2<u32> {
        &self.attention_mask
    }

    /// Label vector [N]
    pub fn labels(&self) -> &Array1<u32> {
        &self.labels
    }
}

fn read_matrix(path: &Path) -> crate::Result<Array2<u32>> {
    // Python saves as i64, cast down for Candle
    let raw = <Array2<i64> as ReadNpyExt>::read_npy(File::open(path)?).map_err(|e| {
        crate::QuadTuneError::Data(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(raw.mapv(|x| x as u32))
}

fn read_vector(path: &Path) -> crate::Result<Array1<u32>> {
    let raw = <Array1<i64> as ReadNpyExt>::read_npy(File::open(path)?).map_err(|e| {
        crate::QuadTuneError::Data(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(raw.mapv(|x| x as u32))
}

/// Load the four quadrant folds from a directory
///
/// Reads `dataset.json` for vocabulary/class metadata when present, falling
/// back to defaults otherwise, then loads the twelve fold files.
pub fn load_quadrants<P: AsRef<Path>>(
    dir: P,
) -> crate::Result<(Vec<ClassificationDataset>, DatasetMetadata)> {
    let dir = dir.as_ref();

    log::info!("Loading quadrant dataset from: {}", dir.display());

    let metadata_path = dir.join("dataset.json");
    let metadata: DatasetMetadata = if metadata_path.exists() {
        let file = File::open(&metadata_path)?;
        serde_json::from_reader(std::io::BufReader::new(file))?
    } else {
        log::warn!("dataset.json not found, using defaults");
        DatasetMetadata {
            vocab_size: 21128,
            num_classes: 2,
            seq_len: 0,
            description: "Unknown".to_string(),
        }
    };

    let mut datasets = Vec::with_capacity(NUM_FOLDS);
    for i in 0..NUM_FOLDS {
        let dataset = ClassificationDataset::from_files(
            dir.join(format!("fold{}__input_ids.npy", i)),
            dir.join(format!("fold{}__attention_mask.npy", i)),
            dir.join(format!("fold{}__labels.npy", i)),
        )?;

        if dataset.is_empty() {
            return Err(crate::QuadTuneError::Data(format!(
                "fold {} is empty",
                i
            )));
        }

        if metadata.seq_len > 0 && dataset.seq_len() != metadata.seq_len {
            return Err(crate::QuadTuneError::Data(format!(
                "fold {} has seq_len {} but dataset.json says {}",
                i,
                dataset.seq_len(),
                metadata.seq_len
            )));
        }

        log::info!("  fold {}: {} examples, seq_len={}", i, dataset.len(), dataset.seq_len());
        datasets.push(dataset);
    }

    Ok((datasets, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_metadata_deserialization() {
        let json = r#"{
            "vocab_size": 21128,
            "num_classes": 2,
            "seq_len": 128,
            "description": "quadrant folds"
        }"#;

        let metadata: DatasetMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.vocab_size, 21128);
        assert_eq!(metadata.num_classes, 2);
        assert_eq!(metadata.seq_len, 128);
    }

    #[test]
    fn test_from_arrays_validates_mask_shape() {
        let ids = arr2(&[[1u32, 2, 3], [4, 5, 6]]);
        let mask = arr2(&[[1u32, 1], [1, 1]]);
        let labels = arr1(&[0u32, 1]);

        assert!(ClassificationDataset::from_arrays(ids, mask, labels).is_err());
    }

    #[test]
    fn test_from_arrays_validates_label_count() {
        let ids = arr2(&[[1u32, 2, 3], [4, 5, 6]]);
        let mask = arr2(&[[1u32, 1, 1], [1, 1, 1]]);
        let labels = arr1(&[0u32, 1, 0]);

        assert!(ClassificationDataset::from_arrays(ids, mask, labels).is_err());
    }

    #[test]
    fn test_accessors() {
        let ids = arr2(&[[1u32, 2, 3], [4, 5, 6]]);
        let mask = arr2(&[[1u32, 1, 1], [1, 1, 0]]);
        let labels = arr1(&[0u32, 1]);

        let dataset = ClassificationDataset::from_arrays(ids, mask, labels).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.seq_len(), 3);
        assert!(!dataset.is_empty());
        assert_eq!(dataset.labels()[1], 1);
    }
}
