//! Writers for small `.dbf` and `.shp` fixtures used by the tests.

use std::{fs, path::Path};

use shapefile::{
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
    Point, Polygon, PolygonRing, Writer,
};

pub struct Column {
    name: &'static str,
    numeric: bool,
}

impl Column {
    pub fn text(name: &'static str) -> Self {
        Column { name, numeric: false }
    }

    pub fn number(name: &'static str) -> Self {
        Column { name, numeric: true }
    }

    fn value(&self, cell: Option<&str>) -> FieldValue {
        if self.numeric {
            FieldValue::Numeric(cell.map(|c| c.parse().unwrap()))
        } else {
            FieldValue::Character(cell.map(str::to_string))
        }
    }
}

fn table_builder(columns: &[Column]) -> TableWriterBuilder {
    columns.iter().fold(TableWriterBuilder::new(), |builder, column| {
        let name = FieldName::try_from(column.name).unwrap();
        if column.numeric {
            builder.add_numeric_field(name, 18, 6)
        } else {
            builder.add_character_field(name, 64)
        }
    })
}

fn record(columns: &[Column], row: &[Option<&str>]) -> Record {
    let mut record = Record::default();
    for (column, cell) in columns.iter().zip(row) {
        record.insert(column.name.to_string(), column.value(*cell));
    }
    record
}

/// Writes a standalone attribute table.
pub fn write_table(path: &Path, columns: &[Column], rows: &[Vec<Option<&str>>]) {
    let records: Vec<Record> = rows.iter().map(|row| record(columns, row)).collect();
    let writer = table_builder(columns).build_with_file_dest(path).unwrap();
    writer.write_records(&records).unwrap();
}

/// Writes `{stem}.shp/.shx/.dbf` with one polygon per row, plus `{stem}.prj` when given.
pub fn write_polygons(
    dir: &Path,
    stem: &str,
    columns: &[Column],
    rows: &[(Vec<(f64, f64)>, Vec<Option<&str>>)],
    prj: Option<&str>,
) {
    let mut writer = Writer::from_path(dir.join(format!("{stem}.shp")), table_builder(columns)).unwrap();
    for (ring, row) in rows {
        let points = ring.iter().map(|&(x, y)| Point::new(x, y)).collect();
        let polygon = Polygon::new(PolygonRing::Outer(points));
        writer
            .write_shape_and_record(&polygon, &record(columns, row))
            .unwrap();
    }
    drop(writer);

    if let Some(wkt) = prj {
        fs::write(dir.join(format!("{stem}.prj")), wkt).unwrap();
    }
}

/// A clockwise square ring with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
    vec![
        (x, y),
        (x, y + size),
        (x + size, y + size),
        (x + size, y),
        (x, y),
    ]
}
