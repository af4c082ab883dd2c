use super::{QueryProgram, Row, TableSummary, TabularStore};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Number, Value};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

const SAMPLE_ROWS: usize = 3;

/// On-disk layout of a table file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// A JSON array of flat objects
    Json,
    /// A CSV file with a header line
    Csv,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(TableFormat::Json),
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(TableFormat::Csv),
            _ => Err(Error::Config(format!(
                "Unsupported table file {}, expected .json or .csv",
                path.display()
            ))),
        }
    }

    fn decode(self, raw: &str) -> Result<Vec<Row>> {
        match self {
            TableFormat::Json => serde_json::from_str(raw)
                .map_err(|e| Error::Store(format!("expected a JSON array of objects: {}", e))),
            TableFormat::Csv => decode_csv(raw),
        }
    }

    fn encode(self, rows: &[Row]) -> Result<Vec<u8>> {
        match self {
            TableFormat::Json => Ok(serde_json::to_vec_pretty(rows)?),
            TableFormat::Csv => encode_csv(rows),
        }
    }
}

/// Reads CSV records into rows; integer and decimal cells become numbers,
/// empty cells become null
fn decode_csv(raw: &str) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_reader(raw.as_bytes());
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| (column.to_string(), typed_cell(cell)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn typed_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return json!(int);
    }
    if let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(cell.to_string())
}

fn encode_csv(rows: &[Row]) -> Result<Vec<u8>> {
    let columns = column_union(rows);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| match row.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }))?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Store(format!("Failed to flush CSV table: {}", e)))
}

fn column_union(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for column in row.keys() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }
    columns
}

/// Table backed by a JSON or CSV file.
///
/// Rows live in memory behind a `RwLock`; updates are written back to the
/// file, in its original format, before the lock is released.
#[derive(Debug)]
pub struct FileTableStore {
    source: Option<(PathBuf, TableFormat)>,
    rows: RwLock<Vec<Row>>,
}

impl FileTableStore {
    /// Loads the table from `path`, picking the format from its extension
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = TableFormat::from_path(&path)?;
        let raw = tokio::fs::read_to_string(&path).await?;
        let rows = format
            .decode(&raw)
            .map_err(|e| Error::Store(format!("{}: {}", path.display(), e)))?;
        info!(
            "Loaded {} rows from {} ({:?})",
            rows.len(),
            path.display(),
            format
        );
        Ok(Self {
            source: Some((path, format)),
            rows: RwLock::new(rows),
        })
    }

    /// In-memory table that is never persisted
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            source: None,
            rows: RwLock::new(rows),
        }
    }

    pub async fn rows(&self) -> Vec<Row> {
        self.rows.read().await.clone()
    }

    async fn persist(&self, rows: &[Row]) -> Result<()> {
        let Some((path, format)) = &self.source else {
            return Ok(());
        };
        let serialized = format.encode(rows)?;
        tokio::fs::write(path, serialized).await?;
        debug!("Persisted {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl TabularStore for FileTableStore {
    async fn search(&self, program: &QueryProgram) -> Result<Value> {
        program.ensure_read_only()?;
        let rows = self.rows.read().await;
        Ok(program.evaluate(&rows))
    }

    async fn update(&self, program: &QueryProgram) -> Result<Value> {
        program.ensure_update()?;
        let mut rows = self.rows.write().await;
        let mut staged = rows.clone();
        let updated = program.apply(&mut staged);
        if updated > 0 {
            self.persist(&staged).await?;
            *rows = staged;
        }
        Ok(json!({ "updated_records": updated }))
    }

    async fn describe(&self) -> Result<TableSummary> {
        let rows = self.rows.read().await;
        Ok(TableSummary {
            columns: column_union(&rows),
            row_count: rows.len(),
            sample: rows.iter().take(SAMPLE_ROWS).cloned().collect(),
        })
    }
}
