//! Loader configuration.
//!
//! Everything a loading session needs (dataset root, file extension, target
//! depth, frame shape, channel replication) lives in [`LoaderConfig`] and is
//! passed in explicitly. Values can come from a YAML file:
//!
//! ```yaml
//! root: /data/MRNet-v1.0
//! target_depth: 51
//! strict_partitions: true
//! oversize: truncate
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::FrameShape;
use crate::error::{Error, Result};
use crate::normalize::OversizePolicy;

pub const DEFAULT_EXTENSION: &str = "npy";
pub const DEFAULT_TARGET_DEPTH: usize = 51;
pub const DEFAULT_CHANNELS: usize = 3;
pub const DEFAULT_CENTER_WIDTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Directory holding the `train` and `valid` partitions.
    pub root: PathBuf,
    /// Extension of the per-case array files, without the dot.
    pub extension: String,
    pub target_depth: usize,
    pub frame_height: usize,
    pub frame_width: usize,
    /// Copies of each slice handed to a model expecting colour input.
    pub channels: usize,
    /// Divide intensities by 255 before replicating channels.
    pub rescale: bool,
    /// Width of the sagittal center-slice summary.
    pub center_width: usize,
    /// Verify that all three planes of a case sit in the same partition.
    pub strict_partitions: bool,
    pub oversize: OversizePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            extension: DEFAULT_EXTENSION.to_string(),
            target_depth: DEFAULT_TARGET_DEPTH,
            frame_height: FrameShape::MRNET.height,
            frame_width: FrameShape::MRNET.width,
            channels: DEFAULT_CHANNELS,
            rescale: true,
            center_width: DEFAULT_CENTER_WIDTH,
            strict_partitions: false,
            oversize: OversizePolicy::PassThrough,
        }
    }
}

impl LoaderConfig {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn from_yaml_str(text: &str, origin: &Path) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|source| Error::Config {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text, path)
    }

    pub fn frame(&self) -> FrameShape {
        FrameShape::new(self.frame_height, self.frame_width)
    }
}
