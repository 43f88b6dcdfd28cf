//! `lookup_excel` step support: open a workbook, find the first row whose
//! `search_column` cell contains `search_value` as a case-insensitive
//! substring, and project `return_columns` into a string map (§4.2).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExcelLookupError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("sheet not found: {0}")]
    SheetNotFound(String),
    #[error("no row matched {search_value:?} in column {search_column:?}")]
    NoMatch {
        search_column: String,
        search_value: String,
    },
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("failed to read workbook: {0}")]
    ReadError(String),
}

/// Resolves `file_path` relative to the working directory, falling back to
/// the file's basename in the working directory if the given path doesn't
/// exist — mirroring the source's two-attempt resolution.
fn resolve_path(file_path: &str) -> Result<PathBuf, ExcelLookupError> {
    let as_given = Path::new(file_path);
    if as_given.exists() {
        return Ok(as_given.to_path_buf());
    }
    if let Some(name) = as_given.file_name() {
        let by_basename = Path::new(name);
        if by_basename.exists() {
            return Ok(by_basename.to_path_buf());
        }
    }
    Err(ExcelLookupError::FileNotFound(file_path.to_string()))
}

pub fn lookup(
    file_path: &str,
    sheet_name: Option<&str>,
    search_column: &str,
    search_value: &str,
    return_columns: &[String],
) -> Result<BTreeMap<String, String>, ExcelLookupError> {
    let path = resolve_path(file_path)?;
    let mut workbook = open_workbook_auto(&path)
        .map_err(|e| ExcelLookupError::ReadError(e.to_string()))?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ExcelLookupError::SheetNotFound("<no sheets>".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|_| ExcelLookupError::SheetNotFound(sheet.clone()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| ExcelLookupError::ReadError("workbook has no header row".to_string()))?;

    let column_index = |name: &str| -> Option<usize> {
        header
            .iter()
            .position(|cell| cell.to_string().eq_ignore_ascii_case(name))
    };

    let search_idx = column_index(search_column)
        .ok_or_else(|| ExcelLookupError::UnknownColumn(search_column.to_string()))?;

    let mut return_indices = Vec::with_capacity(return_columns.len());
    for col in return_columns {
        let idx = column_index(col).ok_or_else(|| ExcelLookupError::UnknownColumn(col.clone()))?;
        return_indices.push((col.clone(), idx));
    }

    let needle = search_value.to_lowercase();
    for row in rows {
        let Some(cell) = row.get(search_idx) else {
            continue;
        };
        if cell.to_string().to_lowercase().contains(&needle) {
            let mut result = BTreeMap::new();
            for (col, idx) in &return_indices {
                let value = row.get(*idx).map(|c| c.to_string()).unwrap_or_default();
                result.insert(col.clone(), value);
            }
            return Ok(result);
        }
    }

    Err(ExcelLookupError::NoMatch {
        search_column: search_column.to_string(),
        search_value: search_value.to_string(),
    })
}
