//! Error type shared by every part of the crate.

use std::path::PathBuf;
use thiserror::Error;

use crate::common::{FrameShape, Partition, Plane};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("case {case_id} not found in any partition")]
    NotFound { case_id: String },

    #[error("case {case_id}: {plane} file is in {found}, expected {expected}")]
    PartitionMismatch {
        case_id: String,
        plane: Plane,
        expected: Partition,
        found: Partition,
    },

    #[error("case {case_id}: no {plane} file in {partition} or any other partition")]
    MissingPlane {
        case_id: String,
        plane: Plane,
        partition: Partition,
    },

    #[error("shape mismatch: expected slices of {expected}, got volume {actual:?}")]
    ShapeMismatch {
        expected: FrameShape,
        actual: (usize, usize, usize),
    },

    #[error("insufficient depth: need at least {required} slices, got {actual}")]
    InsufficientDepth { required: usize, actual: usize },

    #[error("volume depth {actual} exceeds target depth {target}")]
    OversizeDepth { target: usize, actual: usize },

    #[error("center window width must be odd and non-zero, got {0}")]
    InvalidWindow(usize),

    #[error("channel count must be non-zero")]
    InvalidChannels,

    #[error("invalid case id `{0}`")]
    InvalidCaseId(String),

    #[error("dataset root {0} is not a directory")]
    RootNotDirectory(PathBuf),

    #[error("expected directory {0} is missing")]
    MissingDirectory(PathBuf),

    #[error("{path}: expected a 3D array, got {ndim} dimensions")]
    WrongDimensionality { path: PathBuf, ndim: usize },

    #[error("{0}: unsupported volume format")]
    UnsupportedFormat(PathBuf),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("npy read error at {path}: {source}")]
    Npy {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    #[error("npy write error at {path}: {source}")]
    NpyWrite {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    #[error("nifti error at {path}: {source}")]
    Nifti {
        path: PathBuf,
        #[source]
        source: nifti::error::NiftiError,
    },

    #[error("bad scan pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("config error at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("csv error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}:{line}: {msg}")]
    Labels {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    #[error("case {case_id}{}: {source}", plane_suffix(.plane))]
    Case {
        case_id: String,
        plane: Option<Plane>,
        #[source]
        source: Box<Error>,
    },
}

fn plane_suffix(plane: &Option<Plane>) -> String {
    match plane {
        Some(p) => format!(" ({p})"),
        None => String::new(),
    }
}

impl Error {
    /// Attach the case (and plane, when known) an error was raised for.
    pub fn in_case(self, case_id: &str, plane: Option<Plane>) -> Self {
        match self {
            // already carries the id
            e @ (Error::NotFound { .. }
            | Error::PartitionMismatch { .. }
            | Error::MissingPlane { .. }
            | Error::InvalidCaseId(_)
            | Error::Case { .. }) => e,
            e => Error::Case {
                case_id: case_id.to_string(),
                plane,
                source: Box::new(e),
            },
        }
    }

    /// The innermost error, skipping `Case` context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Case { source, .. } => source.root(),
            e => e,
        }
    }
}
