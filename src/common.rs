use std::fmt;
use std::str::FromStr;

// set up enums and structs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Plane {
    Axial,
    Coronal,
    Sagittal,
}

impl Plane {
    /// Planes in the order a case bundle stores them.
    pub const ALL: [Plane; 3] = [Plane::Axial, Plane::Coronal, Plane::Sagittal];

    pub fn to_usize(&self) -> usize {
        match self {
            Plane::Axial => 0,
            Plane::Coronal => 1,
            Plane::Sagittal => 2,
        }
    }

    /// Name of the directory holding this plane's arrays.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Plane::Axial => "axial",
            Plane::Coronal => "coronal",
            Plane::Sagittal => "sagittal",
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Plane {
    type Err = String;

    fn from_str(val: &str) -> Result<Self, Self::Err> {
        match val.to_ascii_lowercase().as_str() {
            "axial" => Ok(Plane::Axial),
            "coronal" => Ok(Plane::Coronal),
            "sagittal" => Ok(Plane::Sagittal),
            other => Err(format!("unknown plane `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    Train,
    Valid,
}

impl Partition {
    /// Search order used when resolving a case.
    pub const ALL: [Partition; 2] = [Partition::Train, Partition::Valid];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Valid => "valid",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Partition {
    type Err = String;

    fn from_str(val: &str) -> Result<Self, Self::Err> {
        match val.to_ascii_lowercase().as_str() {
            "train" => Ok(Partition::Train),
            "valid" => Ok(Partition::Valid),
            other => Err(format!("unknown partition `{other}`")),
        }
    }
}

/// Height and width every slice of the dataset is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    pub height: usize,
    pub width: usize,
}

impl FrameShape {
    pub const MRNET: FrameShape = FrameShape {
        height: 256,
        width: 256,
    };

    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }
}

impl Default for FrameShape {
    fn default() -> Self {
        FrameShape::MRNET
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}
