//! CSV export of the consolidated table.
//!
//! UTF-8, comma-delimited, one header row, no index column. The default
//! artifact name offered by the CLI is [`DEFAULT_EXPORT_FILE_NAME`].

use crate::consolidate::ConsolidatedTable;
use crate::error::ExtractError;
use csv::WriterBuilder;
use std::path::Path;

/// Default artifact name offered by the CLI.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "all_invoices.csv";

/// Serialise the consolidated table to a CSV string.
pub fn to_csv_string(table: &ConsolidatedTable) -> Result<String, ExtractError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::<u8>::new());
    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush().map_err(|e| ExtractError::Internal(format!("csv flush: {e}")))?;

    let bytes = writer
        .into_inner()
        .map_err(|e| ExtractError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|e| ExtractError::Internal(format!("invalid utf-8 csv output: {e}")))
}

/// Write the consolidated table to a CSV file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub fn write_csv(table: &ConsolidatedTable, path: &Path) -> Result<(), ExtractError> {
    let csv = to_csv_string(table)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ExtractError::OutputWriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    std::fs::write(&tmp_path, &csv).map_err(|source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
