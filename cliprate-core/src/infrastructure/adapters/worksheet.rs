// cliprate-core/src/infrastructure/adapters/worksheet.rs
//
// "Online" backend: a durable append-only row store keyed by worksheet name,
// one DuckDB table per worksheet. Mirrors spreadsheet semantics: the first
// append creates the header from the record's key set, later appends may
// extend the header (columns appended, never reordered or removed) and write
// blanks for any header column the record lacks. All cells are text.

use async_trait::async_trait;
use chrono::{Local, SecondsFormat};
use duckdb::{Config, Connection};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::error::ClipRateError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::store::{Record, RecordStore};

pub struct WorksheetStore {
    conn: Arc<Mutex<Connection>>,
    users_worksheet: String,
    ratings_worksheet: String,
}

impl WorksheetStore {
    pub fn new(
        db_path: &str,
        users_worksheet: &str,
        ratings_worksheet: &str,
    ) -> Result<Self, InfrastructureError> {
        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            users_worksheet: users_worksheet.to_string(),
            ratings_worksheet: ratings_worksheet.to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ClipRateError> {
        self.conn.lock().map_err(|_| {
            ClipRateError::Infrastructure(InfrastructureError::Io(std::io::Error::other(
                "Worksheet Mutex Poisoned",
            )))
        })
    }

    fn db_err(e: duckdb::Error) -> ClipRateError {
        ClipRateError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(e)))
    }

    fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn quote_str(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Spreadsheet cells are text; blanks stand in for JSON null.
    fn cell(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    fn table_exists(conn: &Connection, worksheet: &str) -> Result<bool, duckdb::Error> {
        let sql = format!(
            "SELECT count(*) FROM information_schema.tables WHERE table_name = {}",
            Self::quote_str(worksheet)
        );
        let count: u64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Header columns in sheet order (creation + append order).
    fn header(conn: &Connection, worksheet: &str) -> Result<Vec<String>, duckdb::Error> {
        let sql = format!("PRAGMA table_info({})", Self::quote_str(worksheet));
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>("name"))?;
        rows.collect()
    }

    fn collect_strings(conn: &Connection, sql: &str) -> Result<Vec<String>, duckdb::Error> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect()
    }
}

#[async_trait]
impl RecordStore for WorksheetStore {
    async fn append(&self, worksheet: &str, record: &Record) -> Result<(), ClipRateError> {
        let conn = self.lock()?;

        // Every appended row carries its write timestamp, like the sheet did.
        let mut cells: Vec<(String, String)> = record
            .iter()
            .map(|(k, v)| (k.clone(), Self::cell(v)))
            .collect();
        cells.push((
            "timestamp".to_string(),
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        ));

        if !Self::table_exists(&conn, worksheet).map_err(Self::db_err)? {
            let columns: Vec<String> = cells
                .iter()
                .map(|(k, _)| format!("{} VARCHAR", Self::quote_ident(k)))
                .collect();
            let sql = format!(
                "CREATE TABLE {} ({})",
                Self::quote_ident(worksheet),
                columns.join(", ")
            );
            conn.execute(&sql, []).map_err(Self::db_err)?;
            info!(worksheet, "Created new worksheet");
        } else {
            // Header growth: new keys become new trailing columns.
            let existing = Self::header(&conn, worksheet).map_err(Self::db_err)?;
            for (key, _) in &cells {
                if !existing.contains(key) {
                    let sql = format!(
                        "ALTER TABLE {} ADD COLUMN {} VARCHAR",
                        Self::quote_ident(worksheet),
                        Self::quote_ident(key)
                    );
                    conn.execute(&sql, []).map_err(Self::db_err)?;
                    info!(worksheet, column = %key, "Extended worksheet header");
                }
            }
        }

        // Columns the record lacks stay blank (NULL).
        let column_list: Vec<String> = cells.iter().map(|(k, _)| Self::quote_ident(k)).collect();
        let value_list: Vec<String> = cells.iter().map(|(_, v)| Self::quote_str(v)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::quote_ident(worksheet),
            column_list.join(", "),
            value_list.join(", ")
        );
        conn.execute(&sql, []).map_err(Self::db_err)?;

        info!(worksheet, "Row appended to worksheet");
        Ok(())
    }

    async fn user_exists(&self, user_id: &str) -> Result<bool, ClipRateError> {
        let conn = self.lock()?;
        if !Self::table_exists(&conn, &self.users_worksheet).map_err(Self::db_err)? {
            return Ok(false);
        }

        let sql = format!(
            "SELECT count(*) FROM {} WHERE lower(user_id) = lower({})",
            Self::quote_ident(&self.users_worksheet),
            Self::quote_str(user_id)
        );
        let count: u64 = conn.query_row(&sql, [], |row| row.get(0)).map_err(Self::db_err)?;
        Ok(count > 0)
    }

    async fn rated_action_ids(&self, user_id: &str) -> Result<Vec<String>, ClipRateError> {
        let conn = self.lock()?;
        if !Self::table_exists(&conn, &self.ratings_worksheet).map_err(Self::db_err)? {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT DISTINCT id FROM {} WHERE id IS NOT NULL AND lower(user_id) = lower({})",
            Self::quote_ident(&self.ratings_worksheet),
            Self::quote_str(user_id)
        );
        Self::collect_strings(&conn, &sql).map_err(Self::db_err)
    }

    async fn all_user_ids(&self) -> Result<Vec<String>, ClipRateError> {
        let conn = self.lock()?;
        if !Self::table_exists(&conn, &self.users_worksheet).map_err(Self::db_err)? {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT DISTINCT user_id FROM {} WHERE user_id IS NOT NULL",
            Self::quote_ident(&self.users_worksheet)
        );
        Self::collect_strings(&conn, &sql).map_err(Self::db_err)
    }

    async fn rating_counts(&self) -> Result<HashMap<String, usize>, ClipRateError> {
        let conn = self.lock()?;
        if !Self::table_exists(&conn, &self.ratings_worksheet).map_err(Self::db_err)? {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT id, count(*) FROM {} WHERE id IS NOT NULL GROUP BY id",
            Self::quote_ident(&self.ratings_worksheet)
        );
        let mut stmt = conn.prepare(&sql).map_err(Self::db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })
            .map_err(Self::db_err)?;

        let mut counts = HashMap::new();
        for row in rows {
            let (id, count) = row.map_err(Self::db_err)?;
            counts.insert(id, count as usize);
        }
        Ok(counts)
    }

    fn backend_name(&self) -> &str {
        "worksheet"
    }
}
