// cliprate-core/src/infrastructure/metadata.rs
//
// Loads the external video metadata table into `MetadataTable`. Two formats:
// a CSV file (sniffed by DuckDB) or a DuckDB database carrying an `events`
// table. Metadata is an enrichment, never a requirement: every failure path
// degrades to an empty table with a warning.

use duckdb::Connection;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::domain::metadata::{MetaRow, MetadataTable};
use crate::infrastructure::error::InfrastructureError;

#[instrument]
pub fn load_metadata(path: &Path) -> MetadataTable {
    if !path.exists() {
        warn!(path = ?path, "Metadata file not found, continuing without metadata");
        return MetadataTable::default();
    }

    match try_load(path) {
        Ok(table) => {
            info!(rows = table.len(), "Metadata table loaded");
            table
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "Failed to read metadata, continuing without it");
            MetadataTable::default()
        }
    }
}

fn try_load(path: &Path) -> Result<MetadataTable, InfrastructureError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let conn = Connection::open_in_memory()?;
    let path_literal = quote_str(&path.to_string_lossy());

    let source = match extension.as_str() {
        "csv" => format!("SELECT * FROM read_csv_auto({})", path_literal),
        "duckdb" => {
            conn.execute(&format!("ATTACH {} AS meta (READ_ONLY)", path_literal), [])?;
            "SELECT * FROM meta.events".to_string()
        }
        other => {
            warn!(extension = other, "Unsupported metadata format, expected .csv or .duckdb");
            return Ok(MetadataTable::default());
        }
    };

    let rows = fetch_as_strings(&conn, &source)?;
    Ok(MetadataTable::new(rows))
}

/// Every cell becomes text; the domain compares strings, never typed values.
fn fetch_as_strings(conn: &Connection, source: &str) -> Result<Vec<MetaRow>, duckdb::Error> {
    let mut describe = conn.prepare(&format!("DESCRIBE {}", source))?;
    let columns: Vec<String> = describe
        .query_map([], |row| row.get::<_, String>("column_name"))?
        .collect::<Result<_, _>>()?;

    let select_list: Vec<String> = columns
        .iter()
        .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
        .collect();
    let sql = format!("SELECT {} FROM ({}) t", select_list.join(", "), source);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let mut record = MetaRow::new();
        for (i, column) in columns.iter().enumerate() {
            if let Some(value) = row.get::<_, Option<String>>(i)? {
                record.insert(column.clone(), value);
            }
        }
        Ok(record)
    })?;
    rows.collect()
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
