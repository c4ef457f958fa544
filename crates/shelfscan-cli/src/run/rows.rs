//! Row source: the per-site input sheet as identifiers.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use shelfscan_core::{ColumnMap, ColumnOverrides, Identifier};

/// One processable sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetRow {
    /// 1-based position among the sheet's data rows.
    pub row_number: usize,
    pub product_id: String,
    pub identifier: Identifier,
}

/// Read the sheet at `path`, skipping rows with no code, name or URL.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, is not valid CSV, or has
/// neither a code nor a name column.
pub(crate) fn read_rows(path: &Path, overrides: &ColumnOverrides) -> anyhow::Result<Vec<SheetRow>> {
    let file =
        File::open(path).with_context(|| format!("failed to open sheet {}", path.display()))?;
    parse_rows(file, overrides).with_context(|| format!("failed to read sheet {}", path.display()))
}

fn parse_rows<R: Read>(source: R, overrides: &ColumnOverrides) -> anyhow::Result<Vec<SheetRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let columns = ColumnMap::resolve(&header_refs, overrides)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let fields: Vec<&str> = record.iter().collect();
        let identifier = columns.identifier(&fields);
        let row_number = index + 1;
        if !identifier.is_processable() {
            tracing::debug!(row_number, "skipping row without identifier");
            continue;
        }
        rows.push(SheetRow {
            row_number,
            product_id: identifier.product_id(row_number),
            identifier,
        });
    }
    Ok(rows)
}
