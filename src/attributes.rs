//! Reading shapefile attribute tables (`.dbf`).

use std::{collections::HashMap, fmt, path::Path};

use serde::{Serialize, Serializer};
use shapefile::dbase::{self, FieldValue};

use crate::error::SpatialError;

/// A single scalar cell of an attribute table.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl AttributeValue {
    /// Null, empty text, zero and `false` are all falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttributeValue::Null => false,
            AttributeValue::Text(s) => !s.is_empty(),
            AttributeValue::Number(n) => *n != 0.0,
            AttributeValue::Bool(b) => *b,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Text(s) => serde_json::Value::String(s.clone()),
            AttributeValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<FieldValue> for AttributeValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
                AttributeValue::Text(s.trim().to_string())
            }
            FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => {
                AttributeValue::Number(n)
            }
            FieldValue::Float(Some(n)) => AttributeValue::Number(f64::from(n)),
            FieldValue::Integer(n) => AttributeValue::Number(f64::from(n)),
            FieldValue::Logical(Some(b)) => AttributeValue::Bool(b),
            FieldValue::Date(Some(d)) => AttributeValue::Text(format!(
                "{:04}-{:02}-{:02}",
                d.year(),
                d.month(),
                d.day()
            )),
            FieldValue::Character(None)
            | FieldValue::Numeric(None)
            | FieldValue::Float(None)
            | FieldValue::Logical(None)
            | FieldValue::Date(None) => AttributeValue::Null,
            other => AttributeValue::Text(format!("{:?}", other)),
        }
    }
}

/// One row of an attribute table, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeRecord {
    values: HashMap<String, AttributeValue>,
}

impl AttributeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: AttributeValue) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: AttributeValue) {
        self.values.insert(field.to_string(), value);
    }

    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        self.values.get(field)
    }

    /// Reads the named fields out of a dBase record, in order.
    pub fn from_dbase(record: &dbase::Record, fields: &[String]) -> Self {
        let values = fields
            .iter()
            .map(|name| {
                let value = record
                    .get(name)
                    .cloned()
                    .map(AttributeValue::from)
                    .unwrap_or(AttributeValue::Null);
                (name.clone(), value)
            })
            .collect();

        AttributeRecord { values }
    }

    /// Values in `fields` order; absent fields read as `Null`.
    pub fn values_in<'a>(&'a self, fields: &'a [String]) -> impl Iterator<Item = &'a AttributeValue> {
        fields
            .iter()
            .map(|f| self.values.get(f).unwrap_or(&AttributeValue::Null))
    }

    pub fn to_json_object(&self, fields: &[String]) -> serde_json::Map<String, serde_json::Value> {
        fields
            .iter()
            .zip(self.values_in(fields))
            .map(|(field, value)| (field.clone(), value.to_json()))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    pub fields: Vec<String>,
    pub records: Vec<AttributeRecord>,
}

/// Field names of the table at `path`, in file order.
pub fn read_field_names(path: &Path) -> Result<Vec<String>, SpatialError> {
    let reader = dbase::Reader::from_path(path)
        .map_err(|e| SpatialError::AttributeRead(path.to_path_buf(), e))?;

    Ok(field_names(&reader))
}

pub fn read_attribute_table(path: &Path) -> Result<AttributeTable, SpatialError> {
    let mut reader = dbase::Reader::from_path(path)
        .map_err(|e| SpatialError::AttributeRead(path.to_path_buf(), e))?;
    let fields = field_names(&reader);

    let records = reader
        .read()
        .map_err(|e| SpatialError::AttributeRead(path.to_path_buf(), e))?
        .iter()
        .map(|record| AttributeRecord::from_dbase(record, &fields))
        .collect();

    Ok(AttributeTable { fields, records })
}

fn field_names<T: std::io::Read + std::io::Seek>(reader: &dbase::Reader<T>) -> Vec<String> {
    reader
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::fixtures::{write_table, Column};

    #[test]
    fn should_treat_empty_and_zero_as_falsy() {
        assert!(!AttributeValue::Null.is_truthy());
        assert!(!AttributeValue::Text(String::new()).is_truthy());
        assert!(!AttributeValue::Number(0.0).is_truthy());
        assert!(!AttributeValue::Bool(false).is_truthy());
        assert!(AttributeValue::Text("WA".to_string()).is_truthy());
        assert!(AttributeValue::Number(-31.9).is_truthy());
    }

    #[test]
    fn should_display_numbers_without_trailing_zeroes() {
        assert_eq!(AttributeValue::Number(12.0).to_string(), "12");
        assert_eq!(AttributeValue::Number(115.87).to_string(), "115.87");
        assert_eq!(AttributeValue::Null.to_string(), "");
    }

    #[test]
    fn should_parse_text_coordinates() {
        assert_eq!(AttributeValue::Text(" -31.95 ".to_string()).as_f64(), Some(-31.95));
        assert_eq!(AttributeValue::Text("n/a".to_string()).as_f64(), None);
        assert_eq!(AttributeValue::Null.as_f64(), None);
    }

    #[test]
    fn should_read_table_in_field_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IDR00007.dbf");
        write_table(
            &path,
            &[Column::text("Full_Name"), Column::text("State"), Column::number("Latitude")],
            &[
                vec![Some("Perth"), Some("WA"), Some("-31.95")],
                vec![Some("Darwin"), None, Some("-12.46")],
            ],
        );

        let table = read_attribute_table(&path).unwrap();

        assert_eq!(table.fields, vec!["Full_Name", "State", "Latitude"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(
            table.records[0].get("Full_Name"),
            Some(&AttributeValue::Text("Perth".to_string()))
        );
        assert_eq!(table.records[1].get("State"), Some(&AttributeValue::Null));
        assert_eq!(table.records[1].get("Latitude").and_then(|v| v.as_f64()), Some(-12.46));
    }

    #[test]
    fn should_fail_on_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_attribute_table(&dir.path().join("nope.dbf")).unwrap_err();
        assert!(matches!(err, SpatialError::AttributeRead(..)));
    }
}
