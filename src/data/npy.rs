use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{s, Array1, Array2, Array3, ArrayD, Axis, Ix3};
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::data::dataset::OnsetDataset;
use crate::data::features::{Features, MappedNpy};
use crate::error::{OnsetError, Result};
use crate::network::INPUT_CHANNELS;

/// Locations of the three splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPaths {
    /// `[N, T, 1 + C]`: label column followed by the features.
    pub train: PathBuf,
    /// Same layout as `train`; labels are reduced to one per sequence.
    pub valid: PathBuf,
    /// `[N, C, T]` features.
    pub test_inputs: PathBuf,
    /// `[N]` sequence labels.
    pub test_labels: PathBuf,
}

impl DataPaths {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> DataPaths {
        let dir = dir.as_ref();
        DataPaths {
            train: dir.join("train.npy"),
            valid: dir.join("val.npy"),
            test_inputs: dir.join("test_inps.p"),
            test_labels: dir.join("test_labels.p"),
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths::in_dir("data")
    }
}

pub struct Splits {
    pub train: OnsetDataset,
    pub valid: OnsetDataset,
    pub test: OnsetDataset,
}

/// Reads a whole `.npy` file into memory as f32, whatever the stored
/// numeric type (f32, f64, i64 or i32, little-endian).
pub fn load_npy<P: AsRef<Path>>(path: P) -> Result<ArrayD<f32>> {
    let raw = fs::read(path.as_ref())?;
    let bytes: &[u8] = &raw;

    match ArrayD::<f32>::read_npy(bytes) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return Ok(other?),
    }
    match ArrayD::<f64>::read_npy(bytes) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return Ok(other?.mapv(|x| x as f32)),
    }
    match ArrayD::<i64>::read_npy(bytes) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return Ok(other?.mapv(|x| x as f32)),
    }
    Ok(ArrayD::<i32>::read_npy(bytes)?.mapv(|x| x as f32))
}

/// Splits an interleaved `[N, T, 1 + C]` file into features and
/// per-timestep labels `[N, T]`.
///
/// An f32 file stays mapped and only the label column is copied; other
/// dtypes are read and converted eagerly.
pub fn load_interleaved<P: AsRef<Path>>(path: P) -> Result<(Features, Array2<i64>)> {
    let path = path.as_ref();

    if let Some(mapped) = MappedNpy::open(path)? {
        check_width(mapped.shape().2, INPUT_CHANNELS + 1, "columns per timestep", path)?;
        let labels = mapped.view().slice_move(s![.., .., 0]).mapv(|v| v as i64);
        return Ok((Features::Interleaved(mapped), labels));
    }

    let array = expect_rank3(load_npy(path)?, path)?;
    check_width(array.len_of(Axis(2)), INPUT_CHANNELS + 1, "columns per timestep", path)?;
    let features = array.slice(s![.., .., 1..]).to_owned();
    let labels = array.slice(s![.., .., 0]).mapv(|v| v as i64);
    Ok((Features::Owned(features), labels))
}

/// Loads channel-first `[N, C, T]` features, mapped when stored as f32.
pub fn load_channel_first<P: AsRef<Path>>(path: P) -> Result<Features> {
    let path = path.as_ref();

    if let Some(mapped) = MappedNpy::open(path)? {
        check_width(mapped.shape().1, INPUT_CHANNELS, "channels", path)?;
        return Ok(Features::ChannelFirst(mapped));
    }

    let array = expect_rank3(load_npy(path)?, path)?;
    check_width(array.len_of(Axis(1)), INPUT_CHANNELS, "channels", path)?;
    let features = array.permuted_axes([0, 2, 1]).as_standard_layout().into_owned();
    Ok(Features::Owned(features))
}

fn check_width(found: usize, expected: usize, what: &str, path: &Path) -> Result<()> {
    if found == expected {
        return Ok(());
    }
    Err(OnsetError::ShapeMismatch(format!(
        "{}: expected {} {}, found {}",
        path.display(),
        expected,
        what,
        found
    )))
}

pub fn load_splits(paths: &DataPaths) -> Result<Splits> {
    let (x_train, y_train) = load_interleaved(&paths.train)?;
    let train = OnsetDataset::with_features(x_train, y_train.into_dyn())?;

    let (x_valid, y_valid) = load_interleaved(&paths.valid)?;
    let valid = OnsetDataset::with_features(x_valid, sequence_labels(&y_valid).into_dyn())?;

    let test = load_test(paths)?;

    info!(
        train = train.len(),
        valid = valid.len(),
        test = test.len(),
        mapped = train.is_mapped() && valid.is_mapped() && test.is_mapped(),
        "loaded splits"
    );
    Ok(Splits { train, valid, test })
}

/// Loads only the held-out split: `[N, C, T]` inputs and `[N]` labels.
pub fn load_test(paths: &DataPaths) -> Result<OnsetDataset> {
    let features = load_channel_first(&paths.test_inputs)?;
    let labels = load_npy(&paths.test_labels)?.mapv(|v| v as i64);
    OnsetDataset::with_features(features, labels)
}

fn expect_rank3(array: ArrayD<f32>, path: &Path) -> Result<Array3<f32>> {
    let shape = array.shape().to_vec();
    array.into_dimensionality::<Ix3>().map_err(|_| {
        OnsetError::ShapeMismatch(format!("{}: expected a 3-D array, found {:?}", path.display(), shape))
    })
}

/// Reduces `[N, T]` labels to the per-row maximum.
pub fn sequence_labels(labels: &Array2<i64>) -> Array1<i64> {
    labels.map_axis(Axis(1), |row| row.iter().copied().max().unwrap_or(0))
}
