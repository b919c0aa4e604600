/// Sequential fold batching for quadrant training
///
/// Batches are assembled once, in dataset order, with no shuffling and no
/// dropped trailing batch; re-iterating a fold replays the identical batch
/// sequence every epoch. Folds 0..=2 train, fold 3 evaluates.
use candle_core::{Device, Tensor};
use ndarray::s;

use super::npy::ClassificationDataset;

/// Number of quadrant folds
pub const NUM_FOLDS: usize = 4;

/// Index of the held-out evaluation fold
pub const EVAL_FOLD: usize = 3;

/// One batch of tokenized, labeled examples
///
/// All three tensors share the leading dimension B; ids and mask share the
/// sequence length T.
pub struct Batch {
    /// Token ids [B, T]
    pub input_ids: Tensor,
    /// Attention mask [B, T], 1 for real tokens and 0 for padding
    pub attention_mask: Tensor,
    /// Class labels [B]
    pub labels: Tensor,
}

impl Batch {
    /// Create a batch, validating tensor shapes
    pub fn new(input_ids: Tensor, attention_mask: Tensor, labels: Tensor) -> crate::Result<Self> {
        let (b, t) = input_ids.dims2()?;
        let (mask_b, mask_t) = attention_mask.dims2()?;
        let labels_b = labels.dims1()?;

        if mask_b != b || labels_b != b {
            return Err(crate::QuadTuneError::Data(format!(
                "Batch leading dimensions disagree: ids {} mask {} labels {}",
                b, mask_b, labels_b
            )));
        }

        if mask_t != t {
            return Err(crate::QuadTuneError::Data(format!(
                "Batch sequence lengths disagree: ids {} mask {}",
                t, mask_t
            )));
        }

        Ok(Self {
            input_ids,
            attention_mask,
            labels,
        })
    }

    /// Number of examples in the batch
    pub fn len(&self) -> usize {
        self.input_ids.dims()[0]
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the batch tensors onto a compute device
    pub fn to_device(&self, device: &Device) -> crate::Result<Batch> {
        Ok(Batch {
            input_ids: self.input_ids.to_device(device)?,
            attention_mask: self.attention_mask.to_device(device)?,
            labels: self.labels.to_device(device)?,
        })
    }
}

/// An ordered, restartable sequence of batches over one fold
pub struct Fold {
    batches: Vec<Batch>,
}

impl Fold {
    pub(crate) fn from_batches(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    /// Batches in fold order
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Number of batches
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Assembles the four quadrant folds into batch sequences
pub struct FoldScheduler;

impl FoldScheduler {
    /// Build the four folds: 0..=2 at the training batch size, fold 3 at
    /// the evaluation batch size
    pub fn build_folds(
        datasets: &[ClassificationDataset],
        train_batch_size: usize,
        eval_batch_size: usize,
        device: &Device,
    ) -> crate::Result<Vec<Fold>> {
        if datasets.len() != NUM_FOLDS {
            return Err(crate::QuadTuneError::Data(format!(
                "expected {} folds, got {}",
                NUM_FOLDS,
                datasets.len()
            )));
        }

        if train_batch_size == 0 || eval_batch_size == 0 {
            return Err(crate::QuadTuneError::Config(
                "batch sizes must be > 0".to_string(),
            ));
        }

        let mut folds = Vec::with_capacity(NUM_FOLDS);
        for (i, dataset) in datasets.iter().enumerate() {
            if dataset.is_empty() {
                return Err(crate::QuadTuneError::Data(format!("fold {} is empty", i)));
            }

            let batch_size = if i == EVAL_FOLD {
                eval_batch_size
            } else {
                train_batch_size
            };
            folds.push(Self::build_fold(dataset, batch_size, device)?);
        }

        Ok(folds)
    }

    /// Partition one dataset into sequential batches, keeping the trailing
    /// short batch
    fn build_fold(
        dataset: &ClassificationDataset,
        batch_size: usize,
        device: &Device,
    ) -> crate::Result<Fold> {
        let n = dataset.len();
        let t = dataset.seq_len();
        let mut batches = Vec::with_capacity((n + batch_size - 1) / batch_size);

        let mut start = 0;
        while start < n {
            let end = (start + batch_size).min(n);
            let b = end - start;

            let ids: Vec<u32> = dataset
                .input_ids()
                .slice(s![start..end, ..])
                .iter()
                .copied()
                .collect();
            let mask: Vec<u32> = dataset
                .attention_mask()
                .slice(s![start..end, ..])
                .iter()
                .copied()
                .collect();
            let labels: Vec<u32> = dataset
                .labels()
                .slice(s![start..end])
                .iter()
                .copied()
                .collect();

            batches.push(Batch::new(
                Tensor::from_vec(ids, (b, t), device)?,
                Tensor::from_vec(mask, (b, t), device)?,
                Tensor::from_vec(labels, b, device)?,
            )?);

            start = end;
        }

        Ok(Fold::from_batches(batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn dataset(n: usize, t: usize) -> ClassificationDataset {
        let ids = Array2::from_shape_fn((n, t), |(i, j)| (i * t + j) as u32);
        let mask = Array2::from_elem((n, t), 1u32);
        let labels = Array1::from_shape_fn(n, |i| (i % 2) as u32);
        ClassificationDataset::from_arrays(ids, mask, labels).unwrap()
    }

    fn quadrants(n: usize, t: usize) -> Vec<ClassificationDataset> {
        (0..NUM_FOLDS).map(|_| dataset(n, t)).collect()
    }

    #[test]
    fn test_batch_shape_validation() {
        let device = Device::Cpu;
        let ids = Tensor::zeros((4, 8), candle_core::DType::U32, &device).unwrap();
        let mask = Tensor::zeros((3, 8), candle_core::DType::U32, &device).unwrap();
        let labels = Tensor::zeros(4, candle_core::DType::U32, &device).unwrap();

        assert!(Batch::new(ids, mask, labels).is_err());
    }

    #[test]
    fn test_batch_seq_len_validation() {
        let device = Device::Cpu;
        let ids = Tensor::zeros((4, 8), candle_core::DType::U32, &device).unwrap();
        let mask = Tensor::zeros((4, 6), candle_core::DType::U32, &device).unwrap();
        let labels = Tensor::zeros(4, candle_core::DType::U32, &device).unwrap();

        assert!(Batch::new(ids, mask, labels).is_err());
    }

    #[test]
    fn test_fold_batch_count_and_trailing_batch() {
        // N = 10, K = 4 -> ceil(10/4) = 3 batches, last of size 10 mod 4 = 2
        let folds =
            FoldScheduler::build_folds(&quadrants(10, 5), 4, 4, &Device::Cpu).unwrap();

        for fold in &folds {
            assert_eq!(fold.num_batches(), 3);
            assert_eq!(fold.batches()[0].len(), 4);
            assert_eq!(fold.batches()[1].len(), 4);
            assert_eq!(fold.batches()[2].len(), 2);
        }
    }

    #[test]
    fn test_fold_exact_division_keeps_full_last_batch() {
        // N = 8, K = 4 -> 2 batches, last of size K
        let folds =
            FoldScheduler::build_folds(&quadrants(8, 5), 4, 4, &Device::Cpu).unwrap();
        assert_eq!(folds[0].num_batches(), 2);
        assert_eq!(folds[0].batches()[1].len(), 4);
    }

    #[test]
    fn test_fold_preserves_label_order() {
        let datasets = quadrants(10, 3);
        let expected: Vec<u32> = datasets[0].labels().iter().copied().collect();

        let folds = FoldScheduler::build_folds(&datasets, 4, 4, &Device::Cpu).unwrap();
        let mut seen = Vec::new();
        for batch in folds[0].batches() {
            seen.extend(batch.labels.to_vec1::<u32>().unwrap());
        }

        assert_eq!(seen, expected);
    }

    #[test]
    fn test_fold_replay_is_stable() {
        let folds = FoldScheduler::build_folds(&quadrants(7, 3), 3, 3, &Device::Cpu).unwrap();
        let fold = &folds[1];

        let first: Vec<Vec<u32>> = fold
            .batches()
            .iter()
            .map(|b| b.input_ids.flatten_all().unwrap().to_vec1::<u32>().unwrap())
            .collect();
        let second: Vec<Vec<u32>> = fold
            .batches()
            .iter()
            .map(|b| b.input_ids.flatten_all().unwrap().to_vec1::<u32>().unwrap())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_eval_fold_uses_eval_batch_size() {
        let folds = FoldScheduler::build_folds(&quadrants(8, 3), 4, 2, &Device::Cpu).unwrap();
        assert_eq!(folds[0].num_batches(), 2);
        assert_eq!(folds[EVAL_FOLD].num_batches(), 4);
    }

    #[test]
    fn test_wrong_fold_count_rejected() {
        let datasets = quadrants(8, 3).split_off(1);
        assert!(FoldScheduler::build_folds(&datasets, 4, 4, &Device::Cpu).is_err());
    }
}
