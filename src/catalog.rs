//! The BOM spatial products mirrored into the local cache.
//!
//! See <http://reg.bom.gov.au/catalogue/data/SMSRPR09.json> for the upstream catalogue.

use std::path::PathBuf;

use crate::{error::SpatialError, settings::Settings};

pub const FTP_SERVER: &str = "ftp.bom.gov.au";
pub const SPATIAL_ROOT: &str = "/anon/home/adfd/spatial/";

/// Shapefile components every product must provide.
pub const SHAPEFILE_EXTENSIONS: [&str; 3] = ["shp", "shx", "dbf"];
/// Components fetched when the server has them.
pub const OPTIONAL_EXTENSIONS: [&str; 1] = ["prj"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialSource {
    pub name: &'static str,
    pub product_id: &'static str,
    pub description: &'static str,
}

pub const SOURCES: [SpatialSource; 11] = [
    source("forecast_districts", "IDM00001", "forecast districts"),
    source("marine_zones", "IDM00003", "marine zones"),
    source("rainfall_districts", "IDM00004", "rainfall districts"),
    source("cyclone_areas", "IDM00005", "tropical cyclone service areas"),
    source("high_sea_areas", "IDM00006", "high seas forecast areas"),
    source("fire_districts", "IDM00007", "fire weather districts"),
    source("point_places", "IDM00013", "point places (precis, fire, marine)"),
    source("metros", "IDM00014", "metropolitan and other forecast areas"),
    source("ocean_wind_warning", "IDM00015", "ocean wind warning areas"),
    source("radar_coverage", "IDR00006", "radar coverage"),
    source("radar_location", "IDR00007", "radar location"),
];

const fn source(
    name: &'static str,
    product_id: &'static str,
    description: &'static str,
) -> SpatialSource {
    SpatialSource {
        name,
        product_id,
        description,
    }
}

impl SpatialSource {
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.product_id, extension)
    }

    pub fn local_path(&self, settings: &Settings, extension: &str) -> PathBuf {
        settings.spatial_cache().join(self.file_name(extension))
    }
}

/// Sorted names of every spatial type in the catalogue.
pub fn get_gis_types() -> Vec<&'static str> {
    let mut types: Vec<&'static str> = SOURCES.iter().map(|s| s.name).collect();
    types.sort_unstable();
    types
}

pub fn lookup(name: &str) -> Result<&'static SpatialSource, SpatialError> {
    SOURCES
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| SpatialError::UnknownSpatialType {
            name: name.to_string(),
            available: get_gis_types().into_iter().map(String::from).collect(),
        })
}

/// Path of the cached attribute table for `name`.
pub fn source_file_name(name: &str, settings: &Settings) -> Result<PathBuf, SpatialError> {
    Ok(lookup(name)?.local_path(settings, "dbf"))
}

// -- Tests -------------------------------------------------------------------
