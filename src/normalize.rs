//! Fixed-depth normalization of variable-depth image stacks.
//!
//! MRNet stacks have a different number of slices per case and per plane.
//! The model consumes a fixed depth, so shallower stacks are centered inside
//! a zero-filled volume of the target depth. The center-slice summary is
//! always taken from the raw stack, before any padding.

use clap::ValueEnum;
use ndarray::prelude::*;
use serde::Deserialize;
use std::ops::Range;
use tracing::warn;

use crate::common::FrameShape;
use crate::config::LoaderConfig;
use crate::error::{Error, Result};

/// What to do with a stack that is already deeper than the target depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OversizePolicy {
    /// Hand the stack on unchanged; consumers must cope with extra slices.
    #[default]
    PassThrough,
    /// Keep the centered `target_depth` slices.
    Truncate,
    /// Fail with [`Error::OversizeDepth`].
    Reject,
}

fn check_frame(volume: &Array3<f64>, frame: FrameShape) -> Result<()> {
    let (depth, height, width) = volume.dim();
    if height != frame.height || width != frame.width {
        return Err(Error::ShapeMismatch {
            expected: frame,
            actual: (depth, height, width),
        });
    }
    Ok(())
}

/// Slice range a stack of `depth` slices occupies once padded to `target_depth`.
///
/// An odd stack includes the target's center slice; an even stack ends just
/// before it, so any leftover slice lands on the trailing side. `None` when
/// the stack is deeper than the target.
pub fn pad_window(depth: usize, target_depth: usize) -> Option<Range<usize>> {
    if depth > target_depth {
        return None;
    }
    let mid = target_depth / 2;
    let half = depth / 2;
    if depth % 2 == 1 {
        Some((mid - half)..(mid + half + 1))
    } else {
        Some((mid - half)..(mid + half))
    }
}

/// Zero-pads `volume` along depth so that it holds exactly `target_depth` slices.
///
/// Stacks that already have `target_depth` or more slices are returned as they
/// are, without truncation. Height and width must match `frame` in both cases.
pub fn pad_to_depth(
    volume: Array3<f64>,
    target_depth: usize,
    frame: FrameShape,
) -> Result<Array3<f64>> {
    check_frame(&volume, frame)?;
    let (depth, height, width) = volume.dim();
    let window = match pad_window(depth, target_depth) {
        Some(window) if depth < target_depth => window,
        _ => return Ok(volume),
    };
    let mut padded = Array3::<f64>::zeros((target_depth, height, width));
    padded
        .slice_mut(s![window.start..window.end, .., ..])
        .assign(&volume);
    Ok(padded)
}

/// Like [`pad_to_depth`], but with an explicit rule for oversized stacks.
pub fn normalize_depth(
    volume: Array3<f64>,
    target_depth: usize,
    frame: FrameShape,
    policy: OversizePolicy,
) -> Result<Array3<f64>> {
    let depth = volume.dim().0;
    if depth <= target_depth {
        return pad_to_depth(volume, target_depth, frame);
    }
    check_frame(&volume, frame)?;
    match policy {
        OversizePolicy::PassThrough => {
            warn!(depth, target_depth, "passing oversized stack through unpadded");
            Ok(volume)
        }
        OversizePolicy::Truncate => {
            let start = (depth - target_depth) / 2;
            Ok(volume
                .slice(s![start..start + target_depth, .., ..])
                .to_owned())
        }
        OversizePolicy::Reject => Err(Error::OversizeDepth {
            target: target_depth,
            actual: depth,
        }),
    }
}

/// Range of the `width` slices centered on `depth // 2`.
pub fn center_window(depth: usize, width: usize) -> Result<Range<usize>> {
    if width == 0 || width % 2 == 0 {
        return Err(Error::InvalidWindow(width));
    }
    if depth < width {
        return Err(Error::InsufficientDepth {
            required: width,
            actual: depth,
        });
    }
    let mid = depth / 2;
    let half = width / 2;
    Ok((mid - half)..(mid + half + 1))
}

/// Copies the `width` slices around the middle of an unpadded stack.
pub fn center_slices(volume: &Array3<f64>, width: usize) -> Result<Array3<f64>> {
    let window = center_window(volume.dim().0, width)?;
    Ok(volume.slice(s![window.start..window.end, .., ..]).to_owned())
}

/// Repeats every slice `channels` times along a new axis 1.
///
/// The result has shape `(depth, channels, height, width)`, the layout a 2D
/// backbone expecting colour images takes one slice at a time. With `rescale`
/// the samples are divided by 255 first.
pub fn replicate_to_channels(
    volume: &Array3<f64>,
    channels: usize,
    rescale: bool,
) -> Result<Array4<f64>> {
    if channels == 0 {
        return Err(Error::InvalidChannels);
    }
    let scaled = if rescale {
        volume / 255.0
    } else {
        volume.to_owned()
    };
    let (depth, height, width) = scaled.dim();
    let single = scaled.insert_axis(Axis(1));
    let replicated = single
        .broadcast((depth, channels, height, width))
        .ok_or(Error::InvalidChannels)?
        .to_owned();
    Ok(replicated)
}

/// The normalization settings of one loading session.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeNormalizer {
    pub target_depth: usize,
    pub frame: FrameShape,
    pub center_width: usize,
    pub channels: usize,
    pub rescale: bool,
    pub oversize: OversizePolicy,
}

impl VolumeNormalizer {
    pub fn new(target_depth: usize, frame: FrameShape) -> Self {
        Self {
            target_depth,
            frame,
            center_width: crate::config::DEFAULT_CENTER_WIDTH,
            channels: crate::config::DEFAULT_CHANNELS,
            rescale: true,
            oversize: OversizePolicy::PassThrough,
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            target_depth: config.target_depth,
            frame: config.frame(),
            center_width: config.center_width,
            channels: config.channels,
            rescale: config.rescale,
            oversize: config.oversize,
        }
    }

    pub fn with_oversize(mut self, policy: OversizePolicy) -> Self {
        self.oversize = policy;
        self
    }

    pub fn with_channels(mut self, channels: usize, rescale: bool) -> Self {
        self.channels = channels;
        self.rescale = rescale;
        self
    }

    pub fn normalize(&self, volume: Array3<f64>) -> Result<Array3<f64>> {
        normalize_depth(volume, self.target_depth, self.frame, self.oversize)
    }

    pub fn center_slices(&self, volume: &Array3<f64>) -> Result<Array3<f64>> {
        check_frame(volume, self.frame)?;
        center_slices(volume, self.center_width)
    }

    pub fn model_input(&self, volume: &Array3<f64>) -> Result<Array4<f64>> {
        replicate_to_channels(volume, self.channels, self.rescale)
    }
}
