//! Errors raised while reading, dumping and rendering spatial data.

use std::{io, path::PathBuf};

use shapefile::dbase;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("Unknown spatial type: {name}. Available: {}", available.join(", "))]
    UnknownSpatialType { name: String, available: Vec<String> },

    #[error("No spatial types requested. Available: {}", available.join(", "))]
    NoSpatialTypes { available: Vec<String> },

    #[error("{kind} not found: {}. Run 'bomshell spatial fetch' first.", path.display())]
    MissingSpatialData { kind: &'static str, path: PathBuf },

    #[error("Failed to read attribute table '{}'", .0.display())]
    AttributeRead(PathBuf, #[source] dbase::Error),

    #[error("Failed to read shapefile '{}'", .0.display())]
    ShapeRead(PathBuf, #[source] shapefile::Error),

    #[error("Unreadable geometry in '{}': {1}", .0.display())]
    Geometry(PathBuf, String),

    #[error("Failed to parse coordinate reference in '{}': {1}", .0.display())]
    CrsParse(PathBuf, String),

    #[error("Unsupported projection '{0}'")]
    UnsupportedProjection(String),

    #[error("Failed to write map '{}'", .0.display())]
    MapWrite(PathBuf, #[source] io::Error),

    #[error("Failed to write CSV")]
    Csv(#[from] csv::Error),

    #[error("Failed to encode map layers")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SpatialError {
    /// Errors the command surface reports as a plain message with exit status 1.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            SpatialError::UnknownSpatialType { .. }
                | SpatialError::NoSpatialTypes { .. }
                | SpatialError::MissingSpatialData { .. }
        )
    }
}
