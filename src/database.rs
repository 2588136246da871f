//! Packs the cached attribute tables into a single SQLite database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, types::Value, Connection};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    attributes::{read_attribute_table, AttributeTable, AttributeValue},
    catalog::SOURCES,
    settings::Settings,
};

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: &'static str,
    pub rows: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSummary {
    pub path: PathBuf,
    pub tables: Vec<TableSummary>,
    /// Sources with no cached `.dbf`.
    pub missing: Vec<&'static str>,
}

fn to_sql(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Text(s) => Value::Text(s.clone()),
        AttributeValue::Number(n) => Value::Real(*n),
        AttributeValue::Bool(b) => Value::Integer(i64::from(*b)),
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Lower-cased column names, first occurrence wins.
fn column_names(fields: &[String]) -> Vec<(usize, String)> {
    let mut columns: Vec<(usize, String)> = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let name = field.to_lowercase();
        if name == "id" || columns.iter().any(|(_, c)| *c == name) {
            warn!("Dropping column '{}', its name is already taken", field);
            continue;
        }
        columns.push((i, name));
    }
    columns
}

fn pack_table(conn: &mut Connection, name: &'static str, table: &AttributeTable) -> Result<TableSummary> {
    let columns = column_names(&table.fields);

    let mut definitions = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    definitions.extend(columns.iter().map(|(_, c)| quote(c)));

    let tx = conn.transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", quote(name)), [])?;
    tx.execute(
        &format!("CREATE TABLE {} ({})", quote(name), definitions.join(", ")),
        [],
    )?;

    let mut summary = TableSummary {
        name,
        rows: 0,
        failed: 0,
    };

    if !columns.is_empty() {
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(name),
            columns.iter().map(|(_, c)| quote(c)).collect::<Vec<_>>().join(", "),
            (1..=columns.len()).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
        );
        let mut stmt = tx.prepare(&insert)?;

        for record in &table.records {
            let values = columns.iter().map(|(i, _)| {
                record
                    .get(&table.fields[*i])
                    .map(to_sql)
                    .unwrap_or(Value::Null)
            });

            match stmt.execute(params_from_iter(values)) {
                Ok(_) => summary.rows += 1,
                Err(e) => {
                    warn!("Failed to insert into {}: {}", name, e);
                    summary.failed += 1;
                }
            }
        }
    }

    tx.commit()?;
    Ok(summary)
}

/// Rebuilds `<cache>/spatial.sqlite` with one table per cached spatial type.
pub fn build_spatial_database(settings: &Settings) -> Result<DatabaseSummary> {
    let path = settings.spatial_db();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn =
        Connection::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut tables = Vec::new();
    let mut missing = Vec::new();

    for source in &SOURCES {
        let dbf = source.local_path(settings, "dbf");
        if !dbf.exists() {
            warn!("{} not found, skipping {}", dbf.display(), source.name);
            missing.push(source.name);
            continue;
        }

        info!("Packing {} into local DB", source.description);
        let table = read_attribute_table(&dbf)?;
        let summary = pack_table(&mut conn, source.name, &table)
            .with_context(|| format!("Failed to pack {}", source.name))?;
        debug!("{}: {} rows, {} failed", summary.name, summary.rows, summary.failed);
        tables.push(summary);
    }

    Ok(DatabaseSummary {
        path,
        tables,
        missing,
    })
}

// -- Tests -------------------------------------------------------------------
