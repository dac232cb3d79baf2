//! Case loading for the MRNet knee MRI dataset.
//!
//! Each case has three plane stacks (axial, coronal, sagittal) of varying
//! depth. This crate finds them on disk, pads them to a fixed depth and
//! extracts a center-slice summary, handing plain `ndarray` arrays to
//! whatever training code sits on top.

pub mod bundle;
pub mod common;
pub mod config;
pub mod error;
pub mod labels;
pub mod locator;
pub mod normalize;
pub mod volume;

pub use bundle::{CaseBundle, CaseLoader, MrnetLoader, RawCase};
pub use common::{FrameShape, Partition, Plane};
pub use config::LoaderConfig;
pub use error::{Error, Result};
pub use locator::{CaseLocator, CasePaths};
pub use normalize::{
    center_slices, normalize_depth, pad_to_depth, replicate_to_channels, OversizePolicy,
    VolumeNormalizer,
};
pub use volume::{read_volume, write_volume};
