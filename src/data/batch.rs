use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::dataset::{Example, OnsetDataset};
use crate::math::Tensor;

/// Stacked examples ready for a forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// `[batch, channels, time]`
    pub inputs: Tensor,
    pub labels: Vec<usize>,
    pub weights: Vec<f32>,
}

impl Batch {
    /// # Panics
    /// Panics if `examples` is empty or their shapes differ.
    pub fn from_examples(examples: &[Example]) -> Batch {
        assert!(!examples.is_empty(), "cannot batch zero examples");
        let (channels, len) = examples[0].sequence.dim();

        let mut data = Vec::with_capacity(examples.len() * channels * len);
        for example in examples {
            assert_eq!(example.sequence.dim(), (channels, len), "examples differ in shape");
            data.extend(example.sequence.iter().copied());
        }

        Batch {
            inputs: Tensor::from_data(examples.len(), channels, len, data),
            labels: examples.iter().map(|e| e.label).collect(),
            weights: examples.iter().map(|e| e.weight[0]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Iterates a dataset in fixed-size batches.
pub struct BatchIter<'a> {
    dataset: &'a OnsetDataset,
    order: Vec<usize>,
    batch_size: usize,
    drop_last: bool,
    cursor: usize,
}

impl<'a> BatchIter<'a> {
    /// In index order, keeping a short final batch.
    pub fn sequential(dataset: &'a OnsetDataset, batch_size: usize) -> BatchIter<'a> {
        BatchIter::with_order(dataset, (0..dataset.len()).collect(), batch_size, false)
    }

    /// In an order shuffled by `rng`.
    pub fn shuffled<R: Rng + ?Sized>(
        dataset: &'a OnsetDataset,
        batch_size: usize,
        drop_last: bool,
        rng: &mut R,
    ) -> BatchIter<'a> {
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(rng);
        BatchIter::with_order(dataset, order, batch_size, drop_last)
    }

    fn with_order(dataset: &'a OnsetDataset, order: Vec<usize>, batch_size: usize, drop_last: bool) -> BatchIter<'a> {
        assert!(batch_size > 0, "batch_size must be at least 1");
        BatchIter { dataset, order, batch_size, drop_last, cursor: 0 }
    }

    pub fn num_batches(&self) -> usize {
        let n = self.order.len();
        if self.drop_last { n / self.batch_size } else { n.div_ceil(self.batch_size) }
    }
}

impl Iterator for BatchIter<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let remaining = self.order.len() - self.cursor;
        if remaining == 0 || (self.drop_last && remaining < self.batch_size) {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let examples: Vec<Example> = self.order[self.cursor..end]
            .iter()
            .map(|&i| self.dataset.get(i))
            .collect();
        self.cursor = end;

        Some(Batch::from_examples(&examples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array1};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn dataset(n: usize) -> OnsetDataset {
        let x = Array::from_shape_fn((n, 6, 10), |(i, _, _)| i as f32);
        let y = Array1::from_shape_fn(n, |i| (i % 2) as i64);
        OnsetDataset::new(x, y.into_dyn()).unwrap()
    }

    #[test]
    fn sequential_keeps_the_tail() {
        let ds = dataset(10);
        let batches: Vec<Batch> = BatchIter::sequential(&ds, 4).collect();

        assert_eq!(batches.iter().map(Batch::len).collect::<Vec<_>>(), vec![4, 4, 2]);
        assert_eq!(batches[0].inputs.shape(), (4, 10, 6));
        assert_eq!(batches[2].inputs.row(1, 0)[0], 9.0);
        assert_eq!(batches[0].labels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn shuffled_with_drop_last_is_seeded() {
        let ds = dataset(10);
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);

        let first: Vec<Vec<usize>> = BatchIter::shuffled(&ds, 4, true, &mut a)
            .map(|batch| (0..batch.len()).map(|i| batch.inputs.row(i, 0)[0] as usize).collect())
            .collect();
        let second: Vec<Vec<usize>> = BatchIter::shuffled(&ds, 4, true, &mut b)
            .map(|batch| (0..batch.len()).map(|i| batch.inputs.row(i, 0)[0] as usize).collect())
            .collect();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(BatchIter::shuffled(&ds, 4, true, &mut a).num_batches(), 2);
    }
}
