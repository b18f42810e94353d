use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use ndarray::{s, Array3, ArrayView3};
use ndarray_npy::ViewNpyExt;
use tracing::debug;

use crate::error::Result;

/// A rank-3 little-endian f32 `.npy` file mapped read-only.
///
/// Values are read straight from the page cache; nothing is copied until
/// an example is fetched.
#[derive(Debug, Clone)]
pub struct MappedNpy {
    mmap: Arc<Mmap>,
    shape: (usize, usize, usize),
}

impl MappedNpy {
    /// Maps `path`. Returns `None` when the payload cannot be viewed in
    /// place (another dtype, another rank, or non-native byte order), in
    /// which case the caller falls back to an eager read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Option<MappedNpy>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only; the split files are not
        // modified while a run holds them.
        let mmap = unsafe { Mmap::map(&file)? };

        let shape = ArrayView3::<f32>::view_npy(&mmap).map(|view| view.dim());
        match shape {
            Ok(shape) => Ok(Some(MappedNpy { mmap: Arc::new(mmap), shape })),
            Err(err) => {
                debug!(path = %path.display(), %err, "cannot view in place, reading eagerly");
                Ok(None)
            }
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    /// # Panics
    /// Only if the file changed underneath the mapping after `open`.
    pub fn view(&self) -> ArrayView3<'_, f32> {
        ArrayView3::<f32>::view_npy(&self.mmap).expect("mapped file was validated by MappedNpy::open")
    }
}

/// Backing store for a split's feature values, seen as `[N, T, C]`.
#[derive(Debug, Clone)]
pub enum Features {
    /// Already in memory, `[N, T, C]`.
    Owned(Array3<f32>),
    /// `[N, T, 1 + C]` on disk; the label column is skipped.
    Interleaved(MappedNpy),
    /// `[N, C, T]` on disk.
    ChannelFirst(MappedNpy),
}

impl Features {
    /// `[N, T, C]`, without copying.
    pub fn view(&self) -> ArrayView3<'_, f32> {
        match self {
            Features::Owned(array) => array.view(),
            Features::Interleaved(mapped) => mapped.view().slice_move(s![.., .., 1..]),
            Features::ChannelFirst(mapped) => mapped.view().permuted_axes([0, 2, 1]),
        }
    }

    /// `(N, T, C)`
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            Features::Owned(array) => array.dim(),
            Features::Interleaved(mapped) => {
                let (n, t, cols) = mapped.shape();
                (n, t, cols.saturating_sub(1))
            }
            Features::ChannelFirst(mapped) => {
                let (n, c, t) = mapped.shape();
                (n, t, c)
            }
        }
    }

    pub fn is_mapped(&self) -> bool {
        !matches!(self, Features::Owned(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use ndarray_npy::WriteNpyExt;

    fn write<A: WriteNpyExt>(array: &A, path: &Path) {
        array.write_npy(File::create(path).unwrap()).unwrap();
    }

    #[test]
    fn f32_file_is_viewed_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.npy");
        let array = Array::from_shape_fn((3, 4, 11), |(i, t, c)| (i * 100 + t * 11 + c) as f32);
        write(&array, &path);

        let mapped = MappedNpy::open(&path).unwrap().expect("f32 payload maps");
        assert_eq!(mapped.shape(), (3, 4, 11));

        // The view points into the mapping rather than at a copy.
        let start = mapped.mmap.as_ptr() as usize;
        let end = start + mapped.mmap.len();
        let first = mapped.view().as_ptr() as usize;
        assert!((start..end).contains(&first));

        let features = Features::Interleaved(mapped);
        assert_eq!(features.dim(), (3, 4, 10));
        assert_eq!(features.view()[[2, 1, 0]], array[[2, 1, 1]]);
    }

    #[test]
    fn channel_first_is_presented_time_major() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.npy");
        let array = Array::from_shape_fn((2, 10, 5), |(i, c, t)| (i * 1000 + c * 10 + t) as f32);
        write(&array, &path);

        let features = Features::ChannelFirst(MappedNpy::open(&path).unwrap().unwrap());
        assert_eq!(features.dim(), (2, 5, 10));
        assert_eq!(features.view()[[1, 4, 3]], array[[1, 3, 4]]);
    }

    #[test]
    fn other_dtypes_are_left_to_the_eager_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.npy");
        write(&Array::<f64, _>::zeros((2, 3, 4)), &path);
        assert!(MappedNpy::open(&path).unwrap().is_none());

        write(&Array::<f32, _>::zeros((2, 3)), &path);
        assert!(MappedNpy::open(&path).unwrap().is_none());
    }
}
