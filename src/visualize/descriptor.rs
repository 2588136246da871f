//! How each spatial type is drawn on a map.

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialTypeDescriptor {
    pub name: &'static str,
    /// Product id, the stem of the cached `.shp`/`.dbf` files.
    pub file: &'static str,
    pub label: &'static str,
    pub kind: ShapeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Point(PointStyle),
    Polygon(PolygonStyle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub lat: &'static str,
    pub lon: &'static str,
    pub name: &'static str,
    pub popup_fields: &'static [&'static str],
    pub color: &'static str,
    pub icon: &'static str,
    pub cluster: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonStyle {
    pub name: &'static str,
    pub popup_fields: &'static [&'static str],
    pub fill_color: &'static str,
    pub line_color: &'static str,
}

impl SpatialTypeDescriptor {
    pub fn is_polygon(&self) -> bool {
        matches!(self.kind, ShapeKind::Polygon(_))
    }
}

const fn point(
    name: &'static str,
    file: &'static str,
    label: &'static str,
    style: PointStyle,
) -> SpatialTypeDescriptor {
    SpatialTypeDescriptor {
        name,
        file,
        label,
        kind: ShapeKind::Point(style),
    }
}

const fn polygon(
    name: &'static str,
    file: &'static str,
    label: &'static str,
    style: PolygonStyle,
) -> SpatialTypeDescriptor {
    SpatialTypeDescriptor {
        name,
        file,
        label,
        kind: ShapeKind::Polygon(style),
    }
}

pub static DESCRIPTORS: [SpatialTypeDescriptor; 11] = [
    point(
        "radar_location",
        "IDR00007",
        "Radar locations",
        PointStyle {
            lat: "Latitude",
            lon: "Longitude",
            name: "Full_Name",
            popup_fields: &["Full_Name", "State", "Type", "Status"],
            color: "red",
            icon: "signal",
            cluster: false,
        },
    ),
    point(
        "radar_coverage",
        "IDR00006",
        "Radar coverage",
        PointStyle {
            lat: "LATITUDE",
            lon: "LONGITUDE",
            name: "FULL_NAME",
            popup_fields: &["FULL_NAME", "STATE", "TYPE", "STATUS"],
            color: "blue",
            icon: "signal",
            cluster: false,
        },
    ),
    point(
        "point_places",
        "IDM00013",
        "Point places",
        PointStyle {
            lat: "LAT",
            lon: "LON",
            name: "PT_NAME",
            popup_fields: &["PT_NAME", "STATE_NAME", "ELEVATION"],
            color: "green",
            icon: "cloud",
            cluster: true,
        },
    ),
    polygon(
        "forecast_districts",
        "IDM00001",
        "Forecast districts",
        PolygonStyle {
            name: "DIST_NAME",
            popup_fields: &["AAC", "DIST_NAME", "STATE_CODE"],
            fill_color: "YlOrRd",
            line_color: "blue",
        },
    ),
    polygon(
        "marine_zones",
        "IDM00003",
        "Marine zones",
        PolygonStyle {
            name: "DIST_NAME",
            popup_fields: &["AAC", "DIST_NAME", "STATE_CODE", "TYPE"],
            fill_color: "YlGnBu",
            line_color: "navy",
        },
    ),
    polygon(
        "fire_districts",
        "IDM00007",
        "Fire weather districts",
        PolygonStyle {
            name: "DIST_NAME",
            popup_fields: &["AAC", "DIST_NAME", "STATE_CODE"],
            fill_color: "OrRd",
            line_color: "darkred",
        },
    ),
    polygon(
        "rainfall_districts",
        "IDM00004",
        "Rainfall districts",
        PolygonStyle {
            name: "DIST_NAME",
            popup_fields: &["DIST_NAME", "STATE"],
            fill_color: "Blues",
            line_color: "blue",
        },
    ),
    polygon(
        "cyclone_areas",
        "IDM00005",
        "Tropical cyclone areas",
        PolygonStyle {
            name: "Name",
            popup_fields: &["Name"],
            fill_color: "PuRd",
            line_color: "purple",
        },
    ),
    polygon(
        "high_sea_areas",
        "IDM00006",
        "High seas areas",
        PolygonStyle {
            name: "NAME",
            popup_fields: &["NAME"],
            fill_color: "GnBu",
            line_color: "darkblue",
        },
    ),
    polygon(
        "metros",
        "IDM00014",
        "Metropolitan areas",
        PolygonStyle {
            name: "DIST_NAME",
            popup_fields: &["AAC", "DIST_NAME", "STATE_CODE", "DESCRIPTN"],
            fill_color: "Purples",
            line_color: "purple",
        },
    ),
    polygon(
        "ocean_wind_warning",
        "IDM00015",
        "Ocean wind warning areas",
        PolygonStyle {
            name: "NAME",
            popup_fields: &["NAME"],
            fill_color: "BuPu",
            line_color: "indigo",
        },
    ),
];

pub fn lookup(name: &str) -> Option<&'static SpatialTypeDescriptor> {
    DESCRIPTORS.iter().find(|d| d.name == name)
}

/// Sorted names of every type that can be drawn.
pub fn get_visualizable_types() -> Vec<&'static str> {
    let mut types: Vec<&'static str> = DESCRIPTORS.iter().map(|d| d.name).collect();
    types.sort_unstable();
    types
}

/// A representative CSS colour for a ColorBrewer scheme name.
pub fn scheme_color(scheme: &str) -> Option<&'static str> {
    let color = match scheme {
        "YlOrRd" => "#fd8d3c",
        "YlGnBu" => "#41b6c4",
        "OrRd" => "#fc8d59",
        "Blues" => "#6baed6",
        "PuRd" => "#df65b0",
        "GnBu" => "#7bccc4",
        "Purples" => "#9e9ac8",
        "BuPu" => "#8c96c6",
        _ => return None,
    };
    Some(color)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn should_return_sorted_types() {
        let types = get_visualizable_types();
        let mut sorted = types.clone();
        sorted.sort();

        assert_eq!(types, sorted);
        assert!(types.contains(&"radar_location"));
        assert!(types.contains(&"forecast_districts"));
        assert!(types.contains(&"point_places"));
    }

    #[test]
    fn should_have_unique_names() {
        let mut names = get_visualizable_types();
        names.dedup();
        assert_eq!(names.len(), DESCRIPTORS.len());
    }

    #[test]
    fn should_match_fetched_products() {
        for descriptor in &DESCRIPTORS {
            let source = catalog::lookup(descriptor.name).unwrap();
            assert_eq!(source.product_id, descriptor.file, "{}", descriptor.name);
        }
    }

    #[test]
    fn should_supply_styling() {
        for descriptor in &DESCRIPTORS {
            assert!(!descriptor.label.is_empty(), "{} has no label", descriptor.name);
            match &descriptor.kind {
                ShapeKind::Point(style) => {
                    assert!(!style.popup_fields.is_empty());
                    assert!(!style.lat.is_empty() && !style.lon.is_empty());
                    assert!(!style.color.is_empty() && !style.icon.is_empty());
                }
                ShapeKind::Polygon(style) => {
                    assert!(!style.popup_fields.is_empty());
                    assert!(scheme_color(style.fill_color).is_some(), "{}", descriptor.name);
                    assert!(!style.line_color.is_empty());
                }
            }
        }
    }
}
