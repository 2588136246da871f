//! Interactive Leaflet maps of the cached spatial data.

pub mod crs;
pub mod descriptor;
pub mod document;
pub mod point;
pub mod polygon;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub use descriptor::get_visualizable_types;
use descriptor::{ShapeKind, SpatialTypeDescriptor};
use document::MapDocument;

use crate::{attributes::read_attribute_table, error::SpatialError, settings::Settings};

/// Resolves `types` to descriptors, polygons first and otherwise in request order.
///
/// Every name is checked before anything is returned. At least one is required.
pub fn plan_layers<S: AsRef<str>>(
    types: &[S],
) -> Result<Vec<&'static SpatialTypeDescriptor>, SpatialError> {
    if types.is_empty() {
        return Err(SpatialError::NoSpatialTypes {
            available: get_visualizable_types().into_iter().map(String::from).collect(),
        });
    }

    let mut descriptors = types
        .iter()
        .map(|name| {
            let name = name.as_ref();
            descriptor::lookup(name).ok_or_else(|| SpatialError::UnknownSpatialType {
                name: name.to_string(),
                available: get_visualizable_types().into_iter().map(String::from).collect(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    descriptors.sort_by_key(|d| !d.is_polygon());
    Ok(descriptors)
}

pub fn default_map_path<S: AsRef<str>>(types: &[S], settings: &Settings) -> PathBuf {
    match types {
        [single] => settings.cache.join(format!("{}.html", single.as_ref())),
        _ => settings.cache.join("combined_map.html"),
    }
}

fn require(kind: &'static str, path: PathBuf) -> Result<PathBuf, SpatialError> {
    if path.exists() {
        Ok(path)
    } else {
        Err(SpatialError::MissingSpatialData { kind, path })
    }
}

fn add_layer(
    doc: &mut MapDocument,
    descriptor: &SpatialTypeDescriptor,
    settings: &Settings,
) -> Result<(), SpatialError> {
    let cache = settings.spatial_cache();

    let content = match &descriptor.kind {
        ShapeKind::Polygon(style) => {
            let shp = require("Shapefile", cache.join(format!("{}.shp", descriptor.file)))?;
            require("Data file", cache.join(format!("{}.dbf", descriptor.file)))?;
            polygon::polygon_layer(&shp, style)?
        }
        ShapeKind::Point(style) => {
            let dbf = require("Data file", cache.join(format!("{}.dbf", descriptor.file)))?;
            let table = read_attribute_table(&dbf)?;
            point::point_layer(&table, style)
        }
    };

    debug!("Adding layer '{}' for {}", descriptor.label, descriptor.name);
    doc.add_layer(descriptor.label, content);
    Ok(())
}

/// Renders `types` into one map document and returns where it was written.
pub fn create_map<S: AsRef<str>>(
    types: &[S],
    output_path: Option<&Path>,
    settings: &Settings,
) -> Result<PathBuf, SpatialError> {
    let descriptors = plan_layers(types)?;

    let names: Vec<&str> = types.iter().map(|t| t.as_ref()).collect();
    let mut doc = MapDocument::new(&names.join(", "));
    for descriptor in &descriptors {
        add_layer(&mut doc, descriptor, settings)?;
    }

    if types.len() > 1 {
        doc.add_layer_control();
    }

    let path = match output_path {
        Some(path) => path.to_path_buf(),
        None => default_map_path(types, settings),
    };
    doc.save(&path)?;

    info!("Map with {} layers written to {}", doc.layers().len(), path.display());
    Ok(path)
}

/// Opens the map in the default browser. Failures are logged, not returned.
pub fn open_in_browser(path: &Path) {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let url = format!("file://{}", absolute.display());

    debug!("Opening {}", url);
    if let Err(e) = webbrowser::open(&url) {
        warn!("Could not open {} in a browser: {}", url, e);
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::fixtures::{square, write_polygons, write_table, Column};

    fn radar_locations(settings: &Settings) {
        fs::create_dir_all(settings.spatial_cache()).unwrap();
        write_table(
            &settings.spatial_cache().join("IDR00007.dbf"),
            &[
                Column::text("Full_Name"),
                Column::text("State"),
                Column::number("Latitude"),
                Column::number("Longitude"),
            ],
            &[
                vec![Some("Perth (Serpentine)"), Some("WA"), Some("-32.39"), Some("115.87")],
                vec![Some("Darwin (Berrimah)"), Some("NT"), Some("-12.46"), Some("130.93")],
            ],
        );
    }

    fn forecast_districts(settings: &Settings) {
        fs::create_dir_all(settings.spatial_cache()).unwrap();
        write_polygons(
            &settings.spatial_cache(),
            "IDM00001",
            &[Column::text("AAC"), Column::text("DIST_NAME"), Column::text("STATE_CODE")],
            &[(square(115.0, -33.0, 1.0), vec![Some("WA_PW009"), Some("Lower West"), Some("WA")])],
            None,
        );
    }

    fn names(descriptors: &[&SpatialTypeDescriptor]) -> Vec<&'static str> {
        descriptors.iter().map(|d| d.name).collect()
    }

    #[test]
    fn should_order_polygons_first() {
        let plan = plan_layers(&["radar_location", "forecast_districts"]).unwrap();
        assert_eq!(names(&plan), vec!["forecast_districts", "radar_location"]);

        let plan = plan_layers(&["point_places", "metros", "radar_location", "marine_zones"]).unwrap();
        assert_eq!(
            names(&plan),
            vec!["metros", "marine_zones", "point_places", "radar_location"]
        );
    }

    #[test]
    fn should_reject_unknown_type_before_writing() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_cache(dir.path());
        radar_locations(&settings);

        let err = create_map(&["radar_location", "nonexistent"], None, &settings).unwrap_err();

        match err {
            SpatialError::UnknownSpatialType { name, available } => {
                assert_eq!(name, "nonexistent");
                assert!(available.contains(&"radar_location".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!default_map_path(&["radar_location", "nonexistent"], &settings).exists());
    }

    #[test]
    fn should_reject_empty_request_before_writing() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_cache(dir.path());
        radar_locations(&settings);

        let err = create_map::<&str>(&[], None, &settings).unwrap_err();

        assert!(matches!(err, SpatialError::NoSpatialTypes { .. }));
        assert!(err.is_user_facing());
        assert!(!dir.path().join("combined_map.html").exists());
    }

    #[test]
    fn should_report_missing_data_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_cache(dir.path());

        let err = create_map(&["radar_location"], None, &settings).unwrap_err();

        assert!(matches!(err, SpatialError::MissingSpatialData { kind: "Data file", .. }));
        assert!(err.to_string().contains("IDR00007.dbf"));
        assert!(err.to_string().contains("bomshell spatial fetch"));
    }

    #[test]
    fn should_require_shapefile_for_polygons() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_cache(dir.path());
        fs::create_dir_all(settings.spatial_cache()).unwrap();
        write_table(
            &settings.spatial_cache().join("IDM00001.dbf"),
            &[Column::text("DIST_NAME")],
            &[vec![Some("Lower West")]],
        );

        let err = create_map(&["forecast_districts"], None, &settings).unwrap_err();

        assert!(matches!(err, SpatialError::MissingSpatialData { kind: "Shapefile", .. }));
    }

    #[test]
    fn should_write_single_type_to_default_path() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_cache(dir.path());
        radar_locations(&settings);

        let path = create_map(&["radar_location"], None, &settings).unwrap();

        assert_eq!(path, dir.path().join("radar_location.html"));
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("Perth (Serpentine)"));
        assert!(html.contains("\"name\":\"Radar locations\""));
        assert!(!html.contains("L.control.layers"));
    }

    #[test]
    fn should_combine_layers_with_control() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_cache(dir.path());
        radar_locations(&settings);
        forecast_districts(&settings);

        let path = create_map(&["radar_location", "forecast_districts"], None, &settings).unwrap();

        assert_eq!(path, dir.path().join("combined_map.html"));
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("L.control.layers"));
        let districts = html.find("Forecast districts").unwrap();
        let radars = html.find("Radar locations").unwrap();
        assert!(districts < radars);
    }

    #[test]
    fn should_return_explicit_output_path() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_cache(dir.path());
        radar_locations(&settings);
        let target = dir.path().join("maps").join("radars.html");

        let path = create_map(&["radar_location"], Some(target.as_path()), &settings).unwrap();

        assert_eq!(path, target);
        assert!(target.exists());
    }

    #[test]
    fn should_overwrite_previous_map() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_cache(dir.path());
        radar_locations(&settings);
        fs::write(dir.path().join("radar_location.html"), "old").unwrap();

        let path = create_map(&["radar_location"], None, &settings).unwrap();

        assert_ne!(fs::read_to_string(path).unwrap(), "old");
    }
}
