//! Dumps cached attribute tables as CSV, a formatted table or JSON.

use std::io::{self, Write};

use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Attribute, Cell, Color, Table,
};
use serde_json::Value;

use crate::{
    attributes::{read_attribute_table, AttributeTable},
    catalog,
    error::SpatialError,
    output::Output,
    settings::Settings,
};

/// Reads the attribute table of the spatial type `name` from the cache.
pub fn load_table(name: &str, settings: &Settings) -> Result<AttributeTable, SpatialError> {
    let path = catalog::source_file_name(name, settings)?;
    if !path.exists() {
        return Err(SpatialError::MissingSpatialData {
            kind: "Data file",
            path,
        });
    }
    read_attribute_table(&path)
}

pub fn write_csv<W: Write>(table: &AttributeTable, writer: W) -> Result<(), SpatialError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&table.fields)?;
    for record in &table.records {
        csv.write_record(record.values_in(&table.fields).map(|v| v.to_string()))?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the table for `name` as CSV: a header row, then one row per record.
pub fn dump_to_csv<W: Write>(name: &str, settings: &Settings, writer: W) -> Result<(), SpatialError> {
    let table = load_table(name, settings)?;
    write_csv(&table, writer)
}

pub fn table_json(table: &AttributeTable) -> Value {
    Value::Array(
        table
            .records
            .iter()
            .map(|record| Value::Object(record.to_json_object(&table.fields)))
            .collect(),
    )
}

pub fn render_table(table: &AttributeTable) -> String {
    let mut rendered = Table::new();
    rendered
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            table
                .fields
                .iter()
                .map(|field| Cell::new(field).add_attribute(Attribute::Bold).fg(Color::Cyan)),
        );

    for record in &table.records {
        rendered.add_row(record.values_in(&table.fields).map(|v| v.to_string()));
    }

    rendered.to_string()
}

/// Prints the table for `name` on stdout, as JSON in JSON mode.
pub fn dump_to_table(name: &str, settings: &Settings, output: &Output) -> anyhow::Result<()> {
    let table = load_table(name, settings)?;

    if output.is_json() {
        return output.emit_json(&table_json(&table));
    }

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", render_table(&table))?;
    Ok(())
}

// -- Tests -------------------------------------------------------------------
