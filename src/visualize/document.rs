//! The interactive map document: a Leaflet page with the layers embedded as JSON.

use std::{fs, path::Path};

use geojson::FeatureCollection;
use serde::Serialize;

use crate::error::SpatialError;

pub const AUSTRALIA_CENTER: [f64; 2] = [-25.0, 135.0];
pub const DEFAULT_ZOOM: u8 = 4;

const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub tooltip: String,
    pub popup: String,
    pub color: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeStyle {
    #[serde(rename = "fillColor")]
    pub fill_color: String,
    pub color: String,
    pub weight: u8,
    #[serde(rename = "fillOpacity")]
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerContent {
    Markers {
        markers: Vec<Marker>,
        cluster: bool,
    },
    Shapes {
        features: FeatureCollection,
        style: ShapeStyle,
        highlight: ShapeStyle,
    },
}

/// A named, toggleable group holding one spatial type.
#[derive(Debug, Clone, Serialize)]
pub struct LayerGroup {
    pub name: String,
    pub show: bool,
    #[serde(flatten)]
    pub content: LayerContent,
}

#[derive(Debug, Clone)]
pub struct MapDocument {
    title: String,
    center: [f64; 2],
    zoom: u8,
    layers: Vec<LayerGroup>,
    layer_control: bool,
}

impl MapDocument {
    pub fn new(title: &str) -> Self {
        MapDocument {
            title: title.to_string(),
            center: AUSTRALIA_CENTER,
            zoom: DEFAULT_ZOOM,
            layers: Vec::new(),
            layer_control: false,
        }
    }

    pub fn add_layer(&mut self, name: &str, content: LayerContent) {
        self.layers.push(LayerGroup {
            name: name.to_string(),
            show: true,
            content,
        });
    }

    pub fn add_layer_control(&mut self) {
        self.layer_control = true;
    }

    pub fn layers(&self) -> &[LayerGroup] {
        &self.layers
    }

    pub fn render(&self) -> Result<String, SpatialError> {
        let layers = script_safe(&serde_json::to_string(&self.layers)?);
        let control = if self.layer_control { LAYER_CONTROL_JS } else { "" };

        Ok(PAGE_TEMPLATE
            .replace("{{title}}", &escape_html(&self.title))
            .replace("{{lat}}", &self.center[0].to_string())
            .replace("{{lon}}", &self.center[1].to_string())
            .replace("{{zoom}}", &self.zoom.to_string())
            .replace("{{tile_url}}", TILE_URL)
            .replace("{{attribution}}", &script_safe(&serde_json::to_string(TILE_ATTRIBUTION)?))
            .replace("{{layer_control}}", control)
            .replace("{{layers}}", &layers))
    }

    /// Writes the document to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), SpatialError> {
        let html = self.render()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SpatialError::MapWrite(path.to_path_buf(), e))?;
        }
        fs::write(path, html).map_err(|e| SpatialError::MapWrite(path.to_path_buf(), e))
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// JSON embedded in a <script> must not close the element early.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

const LAYER_CONTROL_JS: &str =
    "L.control.layers(null, overlays, { collapsed: false }).addTo(map);";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>{{title}}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/4.7.0/css/font-awesome.min.css" />
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css" />
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css" />
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css" />
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.min.js"></script>
<script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
<style>html, body, #map { width: 100%; height: 100%; margin: 0; padding: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map').setView([{{lat}}, {{lon}}], {{zoom}});
L.tileLayer('{{tile_url}}', { attribution: {{attribution}}, maxZoom: 19 }).addTo(map);

var layers = {{layers}};
var overlays = {};

layers.forEach(function (spec) {
  var group;
  if (spec.kind === 'markers') {
    group = spec.cluster ? L.markerClusterGroup() : L.featureGroup();
    spec.markers.forEach(function (m) {
      var marker = L.marker([m.lat, m.lon], {
        icon: L.AwesomeMarkers.icon({ icon: m.icon, markerColor: m.color, prefix: 'fa' })
      });
      if (m.tooltip) { marker.bindTooltip(m.tooltip); }
      if (m.popup) { marker.bindPopup(m.popup, { maxWidth: 300 }); }
      group.addLayer(marker);
    });
  } else {
    group = L.geoJSON(spec.features, {
      style: function () { return spec.style; },
      onEachFeature: function (feature, layer) {
        if (feature.tooltip) { layer.bindTooltip(feature.tooltip, { sticky: true }); }
        if (feature.popup) { layer.bindPopup(feature.popup, { maxWidth: 300 }); }
        layer.on({
          mouseover: function (e) { e.target.setStyle(spec.highlight); },
          mouseout: function (e) { group.resetStyle(e.target); }
        });
      }
    });
  }
  if (spec.show) { group.addTo(map); }
  overlays[spec.name] = group;
});

{{layer_control}}
</script>
</body>
</html>
"#;

// -- Tests -------------------------------------------------------------------
