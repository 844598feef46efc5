//! Index constituent list port trait.

use crate::domain::error::AggregatorError;
use crate::domain::index_catalog::IndexInfo;
use crate::domain::table::Table;

pub trait ConstituentPort {
    /// Raw constituent table for `index`, before ticker normalisation.
    fn fetch_table(&self, index: &IndexInfo) -> Result<Table, AggregatorError>;
}
