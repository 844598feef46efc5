//! Spreadsheet input/output port trait.

use crate::domain::error::AggregatorError;
use crate::domain::table::Table;
use std::path::Path;

pub trait TablePort {
    fn read_table(&self, path: &Path) -> Result<Table, AggregatorError>;
    fn write_table(&self, path: &Path, table: &Table) -> Result<(), AggregatorError>;
}
