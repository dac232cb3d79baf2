//! Assembling model-ready case bundles.

use ndarray::{Array3, Array4};
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::common::{Partition, Plane};
use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::locator::{CaseLocator, CasePaths};
use crate::normalize::VolumeNormalizer;
use crate::volume::read_volume;

/// The three raw plane stacks of a case, as read from disk.
#[derive(Debug, Clone)]
pub struct RawCase {
    pub case_id: String,
    pub partition: Partition,
    pub axial: Array3<f64>,
    pub coronal: Array3<f64>,
    pub sagittal: Array3<f64>,
}

/// A case after depth normalization.
#[derive(Debug, Clone)]
pub struct CaseBundle {
    pub case_id: String,
    pub partition: Partition,
    pub axial: Array3<f64>,
    pub coronal: Array3<f64>,
    pub sagittal: Array3<f64>,
    /// Middle slices of the raw sagittal stack.
    pub center: Array3<f64>,
}

impl CaseBundle {
    pub fn plane(&self, plane: Plane) -> &Array3<f64> {
        match plane {
            Plane::Axial => &self.axial,
            Plane::Coronal => &self.coronal,
            Plane::Sagittal => &self.sagittal,
        }
    }
}

/// The steps a training loop drives to get from a case id to a bundle.
pub trait CaseLoader {
    fn resolve(&self, case_id: &str) -> Result<CasePaths>;

    fn load(&self, paths: &CasePaths) -> Result<RawCase>;

    fn normalize(&self, raw: RawCase) -> Result<CaseBundle>;

    fn load_case(&self, case_id: &str) -> Result<CaseBundle> {
        let paths = self.resolve(case_id)?;
        let raw = self.load(&paths)?;
        self.normalize(raw)
    }
}

/// Loader for the MRNet directory layout.
#[derive(Debug, Clone)]
pub struct MrnetLoader {
    locator: CaseLocator,
    normalizer: VolumeNormalizer,
}

impl MrnetLoader {
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        Ok(Self {
            locator: CaseLocator::from_config(config)?,
            normalizer: VolumeNormalizer::from_config(config),
        })
    }

    pub fn from_parts(locator: CaseLocator, normalizer: VolumeNormalizer) -> Self {
        Self {
            locator,
            normalizer,
        }
    }

    pub fn locator(&self) -> &CaseLocator {
        &self.locator
    }

    pub fn normalizer(&self) -> &VolumeNormalizer {
        &self.normalizer
    }

    /// `replicate_to_channels` applied to one normalized plane of `bundle`.
    pub fn model_input(&self, bundle: &CaseBundle, plane: Plane) -> Result<Array4<f64>> {
        self.normalizer
            .model_input(bundle.plane(plane))
            .map_err(|e| e.in_case(&bundle.case_id, Some(plane)))
    }

    /// Loads several cases on the rayon pool. Results keep the order of `case_ids`.
    pub fn load_cases<S>(&self, case_ids: &[S]) -> Vec<Result<CaseBundle>>
    where
        S: AsRef<str> + Sync,
    {
        case_ids
            .par_iter()
            .map(|id| self.load_case(id.as_ref()))
            .collect()
    }
}

fn read_plane(case_id: &str, plane: Plane, path: &Path) -> Result<Array3<f64>> {
    read_volume(path).map_err(|e| e.in_case(case_id, Some(plane)))
}

impl CaseLoader for MrnetLoader {
    fn resolve(&self, case_id: &str) -> Result<CasePaths> {
        self.locator.resolve(case_id)
    }

    fn load(&self, paths: &CasePaths) -> Result<RawCase> {
        let id = paths.case_id.as_str();
        let raw = RawCase {
            case_id: paths.case_id.clone(),
            partition: paths.partition,
            axial: read_plane(id, Plane::Axial, &paths.axial)?,
            coronal: read_plane(id, Plane::Coronal, &paths.coronal)?,
            sagittal: read_plane(id, Plane::Sagittal, &paths.sagittal)?,
        };
        debug!(
            case_id = id,
            axial = raw.axial.dim().0,
            coronal = raw.coronal.dim().0,
            sagittal = raw.sagittal.dim().0,
            "loaded raw stacks"
        );
        Ok(raw)
    }

    fn normalize(&self, raw: RawCase) -> Result<CaseBundle> {
        let RawCase {
            case_id,
            partition,
            axial,
            coronal,
            sagittal,
        } = raw;
        let id = case_id.as_str();
        let in_plane = |plane| move |e: Error| e.in_case(id, Some(plane));

        // summary comes from the unpadded stack
        let center = self
            .normalizer
            .center_slices(&sagittal)
            .map_err(in_plane(Plane::Sagittal))?;
        let axial = self
            .normalizer
            .normalize(axial)
            .map_err(in_plane(Plane::Axial))?;
        let coronal = self
            .normalizer
            .normalize(coronal)
            .map_err(in_plane(Plane::Coronal))?;
        let sagittal = self
            .normalizer
            .normalize(sagittal)
            .map_err(in_plane(Plane::Sagittal))?;

        Ok(CaseBundle {
            case_id,
            partition,
            axial,
            coronal,
            sagittal,
            center,
        })
    }
}
