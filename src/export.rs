//! Writes a table to disk as CSV or as an Excel workbook.
//!
//! The table is written exactly as given: column order is preserved and no
//! cleaning is re-applied. Missing values become empty cells.

use crate::analyser::logic::table::{Table, Value};
use crate::error::{PaystatError, Result};
use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// `.xlsx` (any case) selects a workbook; everything else is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => Self::Xlsx,
            _ => Self::Csv,
        }
    }
}

/// Writes `table` to `path` in the format implied by its extension.
///
/// # Errors
///
/// Returns `Io` if the file cannot be created, or `Export` if writing the
/// rows fails.
pub fn save_table(table: &Table, path: &Path) -> Result<()> {
    let format = ExportFormat::from_path(path);
    match format {
        ExportFormat::Csv => write_csv(table, path)?,
        ExportFormat::Xlsx => write_xlsx(table, path)?,
    }
    log::info!(
        "Exported {} rows to {} ({format:?})",
        table.height(),
        path.display()
    );
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Text(s) => s.clone(),
        Value::Missing => String::new(),
    }
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    writer.write_record(table.column_names())?;
    for row in table.rows()? {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Results")?;

    for (c, name) in table.column_names().into_iter().enumerate() {
        worksheet.write_string(0, xlsx_col(c)?, name)?;
    }
    for (r, row) in table.rows()?.into_iter().enumerate() {
        let r = xlsx_row(r + 1)?;
        for (c, value) in row.into_iter().enumerate() {
            let c = xlsx_col(c)?;
            match value {
                Value::Number(n) => {
                    worksheet.write_number(r, c, n)?;
                }
                Value::Text(s) => {
                    worksheet.write_string(r, c, &s)?;
                }
                Value::Missing => {}
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn xlsx_row(index: usize) -> Result<u32> {
    u32::try_from(index)
        .map_err(|_| PaystatError::Export(format!("row {index} exceeds the worksheet limit")))
}

fn xlsx_col(index: usize) -> Result<u16> {
    u16::try_from(index)
        .map_err(|_| PaystatError::Export(format!("column {index} exceeds the worksheet limit")))
}
