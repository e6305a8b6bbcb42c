//! Tabular input for the generator: CSV/TSV files, stdin, or a Google Sheets
//! export. Everything here produces a [`Table`] of raw [`Record`]s; no
//! classification happens at this layer.

use droidloc_core::{Record, Result, ID_COLUMN, QUANTITY_COLUMN, RESERVED_COLUMNS, TYPE_COLUMN};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod sheet;

pub use sheet::{fetch_sheet_csv, token_from_env, SheetOptions};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source table has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("'{0}' is neither an existing file nor a spreadsheet id")]
    InvalidSource(String),
    #[error("credential in ${0} is empty or malformed")]
    MalformedCredential(String),
    #[error("spreadsheet export failed with HTTP {status} ({url})")]
    Http { status: u16, url: String },
}

/// Header row plus every data row of the source.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Every header that is not id/type/quantity, in column order.
    pub fn language_columns(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|h| !h.is_empty() && !RESERVED_COLUMNS.contains(&h.as_str()))
            .cloned()
            .collect()
    }
}

/// Where the rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
    Sheet(String),
}

impl Source {
    /// `-` is stdin, an existing path is a file, anything that looks like a
    /// spreadsheet id is fetched remotely.
    pub fn resolve(arg: &str) -> std::result::Result<Source, SourceError> {
        if arg == "-" {
            return Ok(Source::Stdin);
        }
        let path = Path::new(arg);
        if path.is_file() {
            return Ok(Source::File(path.to_path_buf()));
        }
        if sheet::looks_like_sheet_id(arg) {
            return Ok(Source::Sheet(arg.to_string()));
        }
        Err(SourceError::InvalidSource(arg.to_string()))
    }

    pub fn describe(&self) -> String {
        match self {
            Source::Stdin => "<stdin>".to_string(),
            Source::File(p) => p.display().to_string(),
            Source::Sheet(id) => format!("spreadsheet {id}"),
        }
    }
}

/// Read the table behind `source`.
pub fn load(source: &Source, sheet_opts: &SheetOptions) -> Result<Table> {
    match source {
        Source::Stdin => read_table(std::io::stdin().lock(), b','),
        Source::File(path) => {
            let file = File::open(path)?;
            read_table(file, delimiter_for(path))
        }
        Source::Sheet(id) => {
            let body = fetch_sheet_csv(id, sheet_opts)?;
            read_table(body.as_bytes(), b',')
        }
    }
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Parse delimited text with a header row into records.
///
/// Rows whose cells are all blank are dropped; short rows are padded with
/// empty cells.
pub fn read_table<R: Read>(reader: R, delimiter: u8) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    for required in [ID_COLUMN, TYPE_COLUMN] {
        if !headers.iter().any(|h| h == required) {
            return Err(SourceError::MissingColumn(required).into());
        }
    }
    let has_quantity = headers.iter().any(|h| h == QUANTITY_COLUMN);

    let mut records = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let row = row?;
        // header is sheet row 1
        let row_no = idx + 2;
        if row.iter().all(|c| c.trim().is_empty()) {
            tracing::debug!(event = "blank_row", row = row_no);
            continue;
        }

        let mut rec = Record {
            row: row_no,
            quantity: has_quantity.then(String::new),
            cells: HashMap::new(),
            ..Record::default()
        };
        for (name, value) in headers.iter().zip(row.iter()) {
            match name.as_str() {
                ID_COLUMN => rec.id = value.trim().to_string(),
                TYPE_COLUMN => rec.kind = value.trim().to_string(),
                QUANTITY_COLUMN => rec.quantity = Some(value.to_string()),
                "" => {}
                _ => {
                    rec.cells.insert(name.clone(), value.to_string());
                }
            }
        }
        records.push(rec);
    }

    tracing::debug!(
        event = "table_loaded",
        columns = headers.len(),
        rows = records.len()
    );
    Ok(Table { headers, records })
}
