//! Excel workbook table I/O, plus a spreadsheet adapter that picks CSV or
//! xlsx by file extension.

use crate::adapters::csv_adapter::CsvTableAdapter;
use crate::domain::error::AggregatorError;
use crate::domain::table::Table;
use crate::ports::table_port::TablePort;
use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Reads and writes one named sheet of an `.xlsx` workbook.
///
/// Without a sheet name, reads take the first sheet and writes use the
/// workbook default.
#[derive(Debug, Default, Clone)]
pub struct XlsxTableAdapter {
    sheet: Option<String>,
}

impl XlsxTableAdapter {
    pub fn new(sheet: Option<String>) -> Self {
        Self { sheet }
    }
}

fn xlsx_error(context: &str, e: impl std::fmt::Display) -> AggregatorError {
    AggregatorError::Table {
        reason: format!("{}: {}", context, e),
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Cells that look numeric are written as numbers, except zero-padded codes.
fn numeric(cell: &str) -> Option<f64> {
    let value: f64 = cell.parse().ok()?;
    let digits = cell.trim_start_matches('-');
    let zero_padded = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    (value.is_finite() && !zero_padded).then_some(value)
}

impl TablePort for XlsxTableAdapter {
    fn read_table(&self, path: &Path) -> Result<Table, AggregatorError> {
        let file = File::open(path)?;
        let mut workbook: Xlsx<_> =
            Xlsx::new(BufReader::new(file)).map_err(|e| xlsx_error("invalid workbook", e))?;

        let sheet = match &self.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| xlsx_error("invalid workbook", "no sheets"))?,
        };
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| xlsx_error(&format!("sheet '{}'", sheet), e))?;

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| row.iter().map(|c| cell_text(c).trim().to_string()).collect())
            .unwrap_or_default();
        let rows = rows.map(|row| row.iter().map(cell_text).collect()).collect();
        tracing::debug!(path = %path.display(), sheet = %sheet, "read workbook");
        Ok(Table::new(headers, rows))
    }

    fn write_table(&self, path: &Path, table: &Table) -> Result<(), AggregatorError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        if let Some(name) = &self.sheet {
            worksheet
                .set_name(name.as_str())
                .map_err(|e| xlsx_error("sheet name", e))?;
        }

        let header = std::iter::once(&table.headers);
        for (r, row) in header.chain(table.rows.iter()).enumerate() {
            let r = u32::try_from(r).map_err(|e| xlsx_error("too many rows", e))?;
            for (c, cell) in row.iter().enumerate() {
                let c = u16::try_from(c).map_err(|e| xlsx_error("too many columns", e))?;
                if cell.is_empty() {
                    continue;
                }
                let written = match numeric(cell).filter(|_| r > 0) {
                    Some(value) => worksheet.write_number(r, c, value).map(|_| ()),
                    None => worksheet.write_string(r, c, cell.as_str()).map(|_| ()),
                };
                written.map_err(|e| xlsx_error("write cell", e))?;
            }
        }

        workbook
            .save(path)
            .map_err(|e| xlsx_error(&format!("save {}", path.display()), e))?;
        tracing::info!(path = %path.display(), rows = table.row_count(), "wrote workbook");
        Ok(())
    }
}

pub fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

/// `.xlsx` files go through [`XlsxTableAdapter`], everything else is CSV.
#[derive(Debug, Default, Clone)]
pub struct SpreadsheetAdapter {
    xlsx: XlsxTableAdapter,
}

impl SpreadsheetAdapter {
    pub fn with_sheet(sheet: Option<String>) -> Self {
        Self {
            xlsx: XlsxTableAdapter::new(sheet),
        }
    }
}

impl TablePort for SpreadsheetAdapter {
    fn read_table(&self, path: &Path) -> Result<Table, AggregatorError> {
        if is_xlsx(path) {
            self.xlsx.read_table(path)
        } else {
            CsvTableAdapter.read_table(path)
        }
    }

    fn write_table(&self, path: &Path, table: &Table) -> Result<(), AggregatorError> {
        if is_xlsx(path) {
            self.xlsx.write_table(path, table)
        } else {
            CsvTableAdapter.write_table(path, table)
        }
    }
}
