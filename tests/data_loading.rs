mod common;

use std::fs::File;

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3};
use ndarray_npy::WriteNpyExt;
use onset_resnet::data::{load_npy, load_splits, load_test, BatchIter, Labels, OnsetDataset};
use onset_resnet::OnsetError;

#[test]
fn splits_load_with_their_label_granularity() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_splits(dir.path(), 6, 16);

    let splits = load_splits(&paths).unwrap();

    assert_eq!(splits.train.len(), 6);
    assert_eq!(splits.train.sequence_len(), 16);
    assert_eq!(splits.train.channels(), 10);
    assert!(matches!(splits.train.labels(), Labels::PerTimestep(_)));
    assert!(matches!(splits.valid.labels(), Labels::PerSequence(_)));
    assert!(matches!(splits.test.labels(), Labels::PerSequence(_)));

    // Test inputs are stored channel-first and come back channel-first.
    let example = splits.test.get(0);
    assert_eq!(example.sequence.dim(), (10, 16));
    let stored = load_npy(&paths.test_inputs).unwrap();
    assert_eq!(example.sequence[[3, 5]], stored[[0, 3, 5]]);
}

#[test]
fn f32_splits_stay_mapped() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_splits(dir.path(), 5, 12);
    let splits = load_splits(&paths).unwrap();

    assert!(splits.train.is_mapped());
    assert!(splits.valid.is_mapped());
    // The test inputs are written as f64 and take the converting path.
    assert!(!splits.test.is_mapped());

    let stored = load_npy(&paths.train).unwrap();
    let example = splits.train.get(4);
    assert_eq!(example.sequence.dim(), (10, 12));
    for c in 0..10 {
        for t in 0..12 {
            assert_eq!(example.sequence[[c, t]], stored[[4, t, c + 1]]);
        }
    }
    let any_onset = (0..12).any(|t| stored[[4, t, 0]] == 1.0);
    assert_eq!(example.label, usize::from(any_onset));
}

#[test]
fn mapped_test_inputs_are_read_channel_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = common::write_splits(dir.path(), 3, 9);
    let inputs = Array3::from_shape_fn((3, 10, 9), |(i, c, t)| (i * 1000 + c * 10 + t) as f32);
    paths.test_inputs = dir.path().join("test_f32.npy");
    inputs.write_npy(File::create(&paths.test_inputs).unwrap()).unwrap();

    let test = load_test(&paths).unwrap();
    assert!(test.is_mapped());
    let example = test.get(2);
    assert_eq!(example.sequence.dim(), (10, 9));
    assert_eq!(example.sequence[[7, 4]], inputs[[2, 7, 4]]);
}

#[test]
fn validation_labels_reduce_to_any_onset() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_splits(dir.path(), 4, 8);
    let splits = load_splits(&paths).unwrap();

    let labels: Vec<usize> = (0..4).map(|i| splits.valid.get(i).label).collect();
    assert_eq!(labels, vec![0, 1, 0, 1]);
    assert_eq!(splits.valid.class_weights(), [1.0, 1.0]);
}

#[test]
fn wrong_column_count_is_a_shape_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = common::write_splits(dir.path(), 4, 8);
    paths.valid = dir.path().join("narrow.npy");
    Array3::<f32>::zeros((4, 8, 5))
        .write_npy(File::create(&paths.valid).unwrap())
        .unwrap();

    assert!(matches!(load_splits(&paths), Err(OnsetError::ShapeMismatch(_))));
}

#[test]
fn sparse_onset_is_discounted() {
    // 100 timesteps with 5 positives: m = 0.05 < 0.1, so the weight is
    // base * 10 * 0.05 * 1.1 = 0.55 * base.
    let sequences = Array3::<f32>::zeros((2, 100, 10));
    let mut labels = Array2::<i64>::zeros((2, 100));
    for t in 95..100 {
        labels[[1, t]] = 1;
    }
    let ds = OnsetDataset::new(sequences, labels.into_dyn()).unwrap();

    assert_eq!(ds.class_weights(), [1.0, 1.0]);
    assert_abs_diff_eq!(ds.get(1).weight[0], 0.55, epsilon = 1e-6);
    assert_eq!(ds.get(0).weight, [1.0]);
}

#[test]
fn split_without_onsets_is_rejected() {
    let sequences = Array3::<f32>::zeros((3, 4, 10));
    let labels = Array2::<i64>::zeros((3, 4));
    assert!(matches!(
        OnsetDataset::new(sequences, labels.into_dyn()),
        Err(OnsetError::DegenerateClassBalance { class: 1, total: 3 })
    ));
}

#[test]
fn batches_carry_labels_and_weights() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_splits(dir.path(), 6, 16);
    let splits = load_splits(&paths).unwrap();

    let batches: Vec<_> = BatchIter::sequential(&splits.train, 4).collect();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].inputs.shape(), (4, 10, 16));
    assert_eq!(batches[0].labels, vec![0, 1, 0, 1]);
    // Positives cover a quarter of the sequence: no discount, only the 1.1 factor.
    assert_abs_diff_eq!(batches[0].weights[1], 1.1, epsilon = 1e-6);
}
