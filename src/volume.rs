//! Reading and writing raw plane volumes.
//!
//! MRNet ships each plane as a `uint8` `.npy` stack laid out as
//! `(depth, height, width)`. NIfTI files are accepted as well; their
//! `(x, y, z)` layout is permuted so that depth comes first.

use ndarray::prelude::*;
use ndarray::{ArrayD, Ix3};
use ndarray_npy::{read_npy, write_npy, ReadNpyError, ReadableElement};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Npy,
    Nifti,
}

impl VolumeFormat {
    /// Guess the format from the file name, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".npy") {
            Some(VolumeFormat::Npy)
        } else if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Some(VolumeFormat::Nifti)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            VolumeFormat::Npy => "npy",
            VolumeFormat::Nifti => "nii",
        }
    }
}

type NpyReader = fn(&Path) -> std::result::Result<ArrayD<f64>, ReadNpyError>;

fn read_npy_as<T>(path: &Path) -> std::result::Result<ArrayD<f64>, ReadNpyError>
where
    T: ReadableElement + Copy + Into<f64>,
{
    let arr: ArrayD<T> = read_npy(path)?;
    Ok(arr.mapv(Into::into))
}

// tried in order until the header's dtype matches
const NPY_READERS: [NpyReader; 5] = [
    read_npy_as::<u8>,
    read_npy_as::<f64>,
    read_npy_as::<f32>,
    read_npy_as::<i16>,
    read_npy_as::<u16>,
];

fn read_npy_any(path: &Path) -> Result<ArrayD<f64>> {
    let mut last = None;
    for reader in NPY_READERS {
        match reader(path) {
            Ok(arr) => return Ok(arr),
            Err(ReadNpyError::WrongDescriptor(d)) => last = Some(ReadNpyError::WrongDescriptor(d)),
            Err(source) => {
                return Err(Error::Npy {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
    match last {
        Some(source) => Err(Error::Npy {
            path: path.to_path_buf(),
            source,
        }),
        None => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}

fn read_nifti(path: &Path) -> Result<Array3<f64>> {
    let wrap = |source| Error::Nifti {
        path: path.to_path_buf(),
        source,
    };
    let obj = ReaderOptions::new().read_file(path).map_err(wrap)?;
    let img = obj.into_volume().into_ndarray::<f64>().map_err(wrap)?;
    let img = into_3d(img, path)?;
    // (x, y, z) -> (z, x, y)
    Ok(img.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
}

fn into_3d(img: ArrayD<f64>, path: &Path) -> Result<Array3<f64>> {
    let ndim = img.ndim();
    img.into_dimensionality::<Ix3>()
        .map_err(|_| Error::WrongDimensionality {
            path: path.to_path_buf(),
            ndim,
        })
}

/// Loads one plane stack as `(depth, height, width)` samples.
pub fn read_volume<P: AsRef<Path>>(path: P) -> Result<Array3<f64>> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path) {
        Some(VolumeFormat::Npy) => into_3d(read_npy_any(path)?, path),
        Some(VolumeFormat::Nifti) => read_nifti(path),
        None => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Saves a stack in the format named by the path's extension.
///
/// NIfTI output undoes the permutation applied by [`read_volume`], so a
/// written file reads back with the same layout.
pub fn write_volume<P: AsRef<Path>>(path: P, volume: &Array3<f64>) -> Result<()> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path) {
        Some(VolumeFormat::Npy) => write_npy(path, volume).map_err(|source| Error::NpyWrite {
            path: path.to_path_buf(),
            source,
        }),
        Some(VolumeFormat::Nifti) => {
            let xyz = volume.view().permuted_axes([1, 2, 0]);
            WriterOptions::new(path)
                .write_nifti(&xyz.as_standard_layout())
                .map_err(|source| Error::Nifti {
                    path: path.to_path_buf(),
                    source,
                })
        }
        None => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}
