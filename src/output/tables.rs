//! Table inspection
//!
//! Reports row counts for named tables of the store.

use crate::storage::Storage;
use crate::ScrapeError;

/// Row count of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub name: String,
    pub rows: u64,
}

/// Counts rows for each named table
///
/// With no names, every table in the store is reported. An unknown name is
/// an error.
pub fn load_table_counts(
    storage: &dyn Storage,
    names: &[String],
) -> Result<Vec<TableCount>, ScrapeError> {
    let names = if names.is_empty() {
        storage.list_tables()?
    } else {
        names.to_vec()
    };

    names
        .into_iter()
        .map(|name| -> Result<TableCount, ScrapeError> {
            let rows = storage.count_rows(&name)?;
            Ok(TableCount { name, rows })
        })
        .collect()
}

/// Prints table row counts to stdout
pub fn print_table_counts(counts: &[TableCount]) {
    println!("=== Tables ===\n");
    let width = counts.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for count in counts {
        println!("  {:<width$}  {} rows", count.name, count.rows, width = width);
    }
}
