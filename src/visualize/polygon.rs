//! GeoJSON layers for polygon datasets.

use std::path::Path;

use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use shapefile::{Reader, Shape};
use tracing::debug;

use super::{
    crs::CoordinateReference,
    descriptor::{scheme_color, PolygonStyle},
    document::{escape_html, LayerContent, ShapeStyle},
    point::build_popup_html,
};
use crate::{
    attributes::{read_field_names, AttributeRecord},
    error::SpatialError,
};

const DEFAULT_COLOR: &str = "blue";

pub struct PolygonFeature {
    pub geometry: MultiPolygon<f64>,
    pub record: AttributeRecord,
}

/// Reads every polygon in `shp_path` with its attribute record. Other shape types are skipped.
pub fn read_polygons(shp_path: &Path) -> Result<(Vec<String>, Vec<PolygonFeature>), SpatialError> {
    let fields = read_field_names(&shp_path.with_extension("dbf"))?;
    let mut reader =
        Reader::from_path(shp_path).map_err(|e| SpatialError::ShapeRead(shp_path.to_path_buf(), e))?;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(|e| SpatialError::ShapeRead(shp_path.to_path_buf(), e))?;

        let converted: Result<MultiPolygon<f64>, String> = match shape {
            Shape::Polygon(polygon) => polygon.try_into().map_err(|e| format!("{:?}", e)),
            Shape::PolygonM(polygon) => polygon.try_into().map_err(|e| format!("{:?}", e)),
            Shape::PolygonZ(polygon) => polygon.try_into().map_err(|e| format!("{:?}", e)),
            other => {
                debug!("Skipping {:?} shape in {}", other.shapetype(), shp_path.display());
                continue;
            }
        };
        let geometry = converted.map_err(|e| SpatialError::Geometry(shp_path.to_path_buf(), e))?;

        features.push(PolygonFeature {
            geometry,
            record: AttributeRecord::from_dbase(&record, &fields),
        });
    }

    Ok((fields, features))
}

pub fn shape_style(style: &PolygonStyle) -> ShapeStyle {
    let line = if style.line_color.is_empty() {
        DEFAULT_COLOR
    } else {
        style.line_color
    };

    ShapeStyle {
        fill_color: scheme_color(style.fill_color).unwrap_or(line).to_string(),
        color: line.to_string(),
        weight: 2,
        fill_opacity: 0.3,
    }
}

pub fn highlight_style(style: &PolygonStyle) -> ShapeStyle {
    ShapeStyle {
        weight: 3,
        fill_opacity: 0.6,
        ..shape_style(style)
    }
}

fn to_feature(
    feature: &PolygonFeature,
    fields: &[String],
    style: &PolygonStyle,
    reference: Option<&CoordinateReference>,
) -> Feature {
    let geometry = match reference {
        Some(crs) if !crs.is_wgs84() => crs.reproject(&feature.geometry),
        _ => feature.geometry.clone(),
    };

    let mut members = JsonObject::new();
    if fields.iter().any(|f| f == style.name) {
        let name = feature
            .record
            .get(style.name)
            .map(|v| v.to_string())
            .unwrap_or_default();
        members.insert("tooltip".to_string(), format!("Name: {}", escape_html(&name)).into());
    }

    let present: Vec<&str> = style
        .popup_fields
        .iter()
        .copied()
        .filter(|f| fields.iter().any(|c| c == f))
        .collect();
    let popup = build_popup_html(&feature.record, &present);
    if !popup.is_empty() {
        members.insert("popup".to_string(), popup.into());
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&geometry))),
        id: None,
        properties: Some(feature.record.to_json_object(fields)),
        foreign_members: (!members.is_empty()).then_some(members),
    }
}

/// Builds the shapes layer for `shp_path`, reprojecting to WGS 84 when its `.prj` says otherwise.
pub fn polygon_layer(shp_path: &Path, style: &PolygonStyle) -> Result<LayerContent, SpatialError> {
    let reference = CoordinateReference::from_sidecar(shp_path)?;
    match &reference {
        Some(crs) if !crs.is_wgs84() => debug!("Reprojecting {} from {:?}", shp_path.display(), crs),
        None => debug!("No .prj for {}, using coordinates as-is", shp_path.display()),
        _ => {}
    }

    let (fields, polygons) = read_polygons(shp_path)?;
    let features = polygons
        .iter()
        .map(|feature| to_feature(feature, &fields, style, reference.as_ref()))
        .collect();

    Ok(LayerContent::Shapes {
        features: FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        },
        style: shape_style(style),
        highlight: highlight_style(style),
    })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use geo::{BoundingRect, CoordsIter};
    use tempfile::TempDir;

    use super::*;
    use crate::fixtures::{square, write_polygons, Column};

    const STYLE: PolygonStyle = PolygonStyle {
        name: "DIST_NAME",
        popup_fields: &["AAC", "DIST_NAME", "STATE_CODE"],
        fill_color: "YlOrRd",
        line_color: "blue",
    };

    const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    const WEB_MERCATOR_PRJ: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#;

    fn districts(dir: &Path, ring: Vec<(f64, f64)>, prj: Option<&str>) -> std::path::PathBuf {
        write_polygons(
            dir,
            "IDM00001",
            &[Column::text("AAC"), Column::text("DIST_NAME"), Column::text("STATE_CODE")],
            &[
                (ring, vec![Some("WA_PW001"), Some("Perth"), Some("WA")]),
                (square(117.0, -33.0, 1.0), vec![Some("WA_PW002"), Some(""), Some("WA")]),
            ],
            prj,
        );
        dir.join("IDM00001.shp")
    }

    fn features(layer: &LayerContent) -> &FeatureCollection {
        match layer {
            LayerContent::Shapes { features, .. } => features,
            other => panic!("unexpected layer: {other:?}"),
        }
    }

    #[test]
    fn should_read_polygons_with_records() {
        let dir = TempDir::new().unwrap();
        let shp = districts(dir.path(), square(115.0, -32.0, 1.0), None);

        let (fields, polygons) = read_polygons(&shp).unwrap();

        assert_eq!(fields, vec!["AAC", "DIST_NAME", "STATE_CODE"]);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].record.get("DIST_NAME").unwrap().to_string(), "Perth");
        let bounds = polygons[0].geometry.bounding_rect().unwrap();
        assert_eq!(bounds.min().x, 115.0);
        assert_eq!(bounds.max().y, -31.0);
    }

    #[test]
    fn should_attach_tooltip_and_popup() {
        let dir = TempDir::new().unwrap();
        let shp = districts(dir.path(), square(115.0, -32.0, 1.0), Some(WGS84_PRJ));

        let layer = polygon_layer(&shp, &STYLE).unwrap();
        let collection = features(&layer);

        let first = collection.features[0].foreign_members.as_ref().unwrap();
        assert_eq!(first["tooltip"], "Name: Perth");
        assert_eq!(
            first["popup"],
            "<b>AAC:</b> WA_PW001<br><b>DIST_NAME:</b> Perth<br><b>STATE_CODE:</b> WA"
        );

        let second = collection.features[1].foreign_members.as_ref().unwrap();
        assert_eq!(second["tooltip"], "Name: ");
        assert!(!second["popup"].as_str().unwrap().contains("DIST_NAME"));

        let properties = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(properties["STATE_CODE"], "WA");
    }

    #[test]
    fn should_escape_tooltip_markup() {
        let dir = TempDir::new().unwrap();
        write_polygons(
            dir.path(),
            "IDM00001",
            &[Column::text("AAC"), Column::text("DIST_NAME"), Column::text("STATE_CODE")],
            &[(square(115.0, -32.0, 1.0), vec![Some("WA_PW001"), Some("<img src=x onerror=alert(1)>"), Some("WA")])],
            None,
        );

        let layer = polygon_layer(&dir.path().join("IDM00001.shp"), &STYLE).unwrap();
        let members = features(&layer).features[0].foreign_members.as_ref().unwrap();

        assert_eq!(members["tooltip"], "Name: &lt;img src=x onerror=alert(1)&gt;");
    }

    #[test]
    fn should_omit_tooltip_without_name_column() {
        let dir = TempDir::new().unwrap();
        write_polygons(
            dir.path(),
            "IDM00005",
            &[Column::text("Label")],
            &[(square(130.0, -15.0, 2.0), vec![Some("Top End")])],
            None,
        );

        let layer = polygon_layer(&dir.path().join("IDM00005.shp"), &STYLE).unwrap();

        assert!(features(&layer).features[0].foreign_members.is_none());
    }

    #[test]
    fn should_keep_wgs84_coordinates() {
        let dir = TempDir::new().unwrap();
        let shp = districts(dir.path(), square(115.0, -32.0, 1.0), Some(WGS84_PRJ));

        let layer = polygon_layer(&shp, &STYLE).unwrap();
        let geometry = features(&layer).features[0].geometry.clone().unwrap();
        let polygon: MultiPolygon<f64> = geometry.value.try_into().unwrap();

        let bounds = polygon.bounding_rect().unwrap();
        assert_eq!(bounds.min().x, 115.0);
        assert_eq!(bounds.min().y, -32.0);
    }

    #[test]
    fn should_reproject_web_mercator() {
        let dir = TempDir::new().unwrap();
        // Roughly 115E..116E, 32S..31S in EPSG:3857.
        let ring = vec![
            (12_801_741.0, -3_763_310.0),
            (12_801_741.0, -3_632_749.0),
            (12_913_060.0, -3_632_749.0),
            (12_913_060.0, -3_763_310.0),
            (12_801_741.0, -3_763_310.0),
        ];
        let shp = districts(dir.path(), ring, Some(WEB_MERCATOR_PRJ));

        let layer = polygon_layer(&shp, &STYLE).unwrap();
        let geometry = features(&layer).features[0].geometry.clone().unwrap();
        let polygon: MultiPolygon<f64> = geometry.value.try_into().unwrap();

        for coord in polygon.coords_iter() {
            assert!((114.9..116.1).contains(&coord.x), "lon {}", coord.x);
            assert!((-32.1..-30.9).contains(&coord.y), "lat {}", coord.y);
        }
    }

    #[test]
    fn should_fail_on_unsupported_projection() {
        let dir = TempDir::new().unwrap();
        let prj = r#"PROJCS["x",GEOGCS["y",DATUM["z",SPHEROID["s",6378137,298.257]]],PROJECTION["Albers"],UNIT["metre",1]]"#;
        let shp = districts(dir.path(), square(0.0, 0.0, 1.0), Some(prj));

        assert!(matches!(
            polygon_layer(&shp, &STYLE),
            Err(SpatialError::UnsupportedProjection(_))
        ));
    }

    #[test]
    fn should_derive_styles() {
        let style = shape_style(&STYLE);
        assert_eq!(style.fill_color, "#fd8d3c");
        assert_eq!(style.color, "blue");
        assert_eq!(style.weight, 2);

        let highlight = highlight_style(&STYLE);
        assert_eq!(highlight.weight, 3);
        assert_eq!(highlight.fill_opacity, 0.6);
        assert_eq!(highlight.fill_color, "#fd8d3c");

        let unknown = PolygonStyle {
            fill_color: "Nope",
            line_color: "",
            ..STYLE
        };
        let fallback = shape_style(&unknown);
        assert_eq!(fallback.fill_color, "blue");
        assert_eq!(fallback.color, "blue");
    }
}
