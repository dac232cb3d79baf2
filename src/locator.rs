//! Locating the on-disk plane files of a case.
//!
//! The dataset has no manifest. Cases are found through the directory
//! convention
//!
//! ```text
//! root/{train,valid}/{axial,coronal,sagittal}/<case>.npy
//! ```
//!
//! and a case's partition is decided by probing the axial plane only.

use glob::{glob, Pattern};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::common::{Partition, Plane};
use crate::config::LoaderConfig;
use crate::error::{Error, Result};

/// Plane used to decide which partition a case belongs to.
pub const REFERENCE_PLANE: Plane = Plane::Axial;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePaths {
    pub case_id: String,
    pub partition: Partition,
    pub axial: PathBuf,
    pub coronal: PathBuf,
    pub sagittal: PathBuf,
}

impl CasePaths {
    pub fn path(&self, plane: Plane) -> &Path {
        match plane {
            Plane::Axial => &self.axial,
            Plane::Coronal => &self.coronal,
            Plane::Sagittal => &self.sagittal,
        }
    }

    /// `(plane, path)` pairs in bundle order.
    pub fn iter(&self) -> impl Iterator<Item = (Plane, &Path)> + '_ {
        Plane::ALL.into_iter().map(move |p| (p, self.path(p)))
    }
}

#[derive(Debug, Clone)]
pub struct CaseLocator {
    root: PathBuf,
    extension: String,
    strict_partitions: bool,
}

impl CaseLocator {
    pub fn new<P: AsRef<Path>>(root: P, extension: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::RootNotDirectory(root));
        }
        Ok(Self {
            root,
            extension: extension.trim_start_matches('.').to_string(),
            strict_partitions: false,
        })
    }

    pub fn from_config(config: &LoaderConfig) -> Result<Self> {
        Ok(Self::new(&config.root, &config.extension)?
            .with_strict_partitions(config.strict_partitions))
    }

    /// When set, [`resolve`](Self::resolve) checks every plane instead of
    /// trusting the axial lookup.
    pub fn with_strict_partitions(mut self, strict: bool) -> Self {
        self.strict_partitions = strict;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn plane_dir(&self, partition: Partition, plane: Plane) -> PathBuf {
        self.root.join(partition.dir_name()).join(plane.dir_name())
    }

    /// Case id a file name stands for, if its extension matches (ignoring case).
    fn case_id_of(&self, path: &Path) -> Option<String> {
        let suffix = format!(".{}", self.extension.to_ascii_lowercase());
        let name = path.file_name()?.to_str()?;
        let lower = name.to_ascii_lowercase();
        if lower.len() > suffix.len() && lower.ends_with(&suffix) {
            Some(name[..name.len() - suffix.len()].to_string())
        } else {
            None
        }
    }

    /// `(case id, path)` of every array file in `dir` whose name starts with `prefix`.
    fn case_files(&self, dir: &Path, prefix: &str) -> Result<Vec<(String, PathBuf)>> {
        let pattern = format!(
            "{}/{}*",
            Pattern::escape(&dir.to_string_lossy()),
            Pattern::escape(prefix)
        );
        let files = glob(&pattern)?
            .filter_map(std::result::Result::ok)
            .filter(|path| path.is_file())
            .filter_map(|path| Some((self.case_id_of(&path)?, path)))
            .collect();
        Ok(files)
    }

    fn find_file(
        &self,
        partition: Partition,
        plane: Plane,
        case_id: &str,
    ) -> Result<Option<PathBuf>> {
        let dir = self.plane_dir(partition, plane);
        Ok(self
            .case_files(&dir, &format!("{case_id}."))?
            .into_iter()
            .find(|(id, _)| id == case_id)
            .map(|(_, path)| path))
    }

    /// Finds the three plane files of `case_id` and the partition holding them.
    ///
    /// Only `train/axial` and `valid/axial` are searched. The coronal and sagittal
    /// paths are built for the same partition without checking that they exist,
    /// unless strict partitions are enabled.
    pub fn resolve(&self, case_id: &str) -> Result<CasePaths> {
        check_case_id(case_id)?;
        let mut found = None;
        for part in Partition::ALL {
            if let Some(path) = self.find_file(part, REFERENCE_PLANE, case_id)? {
                found = Some((part, path));
                break;
            }
        }
        let (partition, axial) = found.ok_or_else(|| Error::NotFound {
            case_id: case_id.to_string(),
        })?;

        let file_name = match axial.file_name() {
            Some(name) => name.to_owned(),
            None => {
                return Err(Error::NotFound {
                    case_id: case_id.to_string(),
                })
            }
        };
        let mut paths = CasePaths {
            case_id: case_id.to_string(),
            partition,
            coronal: self.plane_dir(partition, Plane::Coronal).join(&file_name),
            sagittal: self.plane_dir(partition, Plane::Sagittal).join(&file_name),
            axial,
        };

        if self.strict_partitions {
            for plane in [Plane::Coronal, Plane::Sagittal] {
                let found = self.locate_strict(case_id, partition, plane)?;
                match plane {
                    Plane::Coronal => paths.coronal = found,
                    _ => paths.sagittal = found,
                }
            }
        }
        debug!(case_id, %partition, "resolved case");
        Ok(paths)
    }

    fn locate_strict(&self, case_id: &str, expected: Partition, plane: Plane) -> Result<PathBuf> {
        if let Some(path) = self.find_file(expected, plane, case_id)? {
            return Ok(path);
        }
        for found in Partition::ALL.into_iter().filter(|p| *p != expected) {
            if self.find_file(found, plane, case_id)?.is_some() {
                return Err(Error::PartitionMismatch {
                    case_id: case_id.to_string(),
                    plane,
                    expected,
                    found,
                });
            }
        }
        Err(Error::MissingPlane {
            case_id: case_id.to_string(),
            plane,
            partition: expected,
        })
    }

    /// Every case id found in the six `partition/plane` directories,
    /// deduplicated and sorted. Files elsewhere under the root are ignored.
    pub fn list_case_ids(&self) -> Result<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for partition in Partition::ALL {
            for plane in Plane::ALL {
                let dir = self.plane_dir(partition, plane);
                ids.extend(self.case_files(&dir, "")?.into_iter().map(|(id, _)| id));
            }
        }
        info!(count = ids.len(), root = %self.root.display(), "scanned case ids");
        Ok(ids)
    }

    /// Case ids of one partition, taken from its axial directory.
    pub fn list_partition(&self, partition: Partition) -> Result<BTreeSet<String>> {
        let dir = self.plane_dir(partition, REFERENCE_PLANE);
        Ok(self
            .case_files(&dir, "")?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Checks that all six `partition/plane` directories exist.
    pub fn validate_layout(&self) -> Result<()> {
        for partition in Partition::ALL {
            for plane in Plane::ALL {
                let dir = self.plane_dir(partition, plane);
                if !dir.is_dir() {
                    return Err(Error::MissingDirectory(dir));
                }
            }
        }
        Ok(())
    }
}

fn check_case_id(case_id: &str) -> Result<()> {
    if case_id.is_empty()
        || case_id == "."
        || case_id == ".."
        || case_id.contains(['/', '\\'])
    {
        return Err(Error::InvalidCaseId(case_id.to_string()));
    }
    Ok(())
}
