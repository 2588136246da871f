//! Marker layers for point datasets.

use tracing::debug;

use super::{
    descriptor::PointStyle,
    document::{escape_html, LayerContent, Marker},
};
use crate::attributes::{AttributeRecord, AttributeTable};

/// Point sets larger than this are clustered when the type allows it.
pub const CLUSTER_THRESHOLD: usize = 50;

/// `<b>{field}:</b> {value}` for every truthy field, joined with `<br>`.
pub fn build_popup_html<S: AsRef<str>>(record: &AttributeRecord, fields: &[S]) -> String {
    fields
        .iter()
        .filter_map(|field| {
            let field = field.as_ref();
            record
                .get(field)
                .filter(|value| value.is_truthy())
                .map(|value| {
                    format!(
                        "<b>{}:</b> {}",
                        escape_html(field),
                        escape_html(&value.to_string())
                    )
                })
        })
        .collect::<Vec<_>>()
        .join("<br>")
}

pub fn build_marker(record: &AttributeRecord, style: &PointStyle) -> Option<Marker> {
    let lat = record.get(style.lat)?.as_f64()?;
    let lon = record.get(style.lon)?.as_f64()?;

    let tooltip = record
        .get(style.name)
        .map(|value| escape_html(&value.to_string()))
        .unwrap_or_default();

    Some(Marker {
        lat,
        lon,
        tooltip,
        popup: build_popup_html(record, style.popup_fields),
        color: style.color.to_string(),
        icon: style.icon.to_string(),
    })
}

/// Builds one marker per record that has both coordinates.
pub fn point_layer(table: &AttributeTable, style: &PointStyle) -> LayerContent {
    let markers: Vec<Marker> = table
        .records
        .iter()
        .filter_map(|record| build_marker(record, style))
        .collect();

    let skipped = table.records.len() - markers.len();
    if skipped > 0 {
        debug!("Skipped {} records without coordinates", skipped);
    }

    LayerContent::Markers {
        markers,
        cluster: style.cluster && table.records.len() > CLUSTER_THRESHOLD,
    }
}

// -- Tests -------------------------------------------------------------------
