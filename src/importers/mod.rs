// Import module - fiscal period spreadsheets (xlsx/xls/ods/csv)

pub mod classifier;
pub mod export;
pub mod headers;
pub mod numeric;
pub mod period;
pub mod reconciler;
pub mod regime_mapping;
pub mod resolver;
pub mod sheet;
pub mod template;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

pub use classifier::{classify, SheetSchema};
pub use export::export_periods;
pub use headers::{field_text, Field};
pub use numeric::{parse_numeric_cell, parse_numeric_text};
pub use period::{compare_periods, parse_period, period_sort_key};
pub use reconciler::{preview, reconcile, ImportReport, ParsedRow, RowError};
pub use regime_mapping::{import_regime_mappings, MappingReport};
pub use resolver::{normalize_cnpj, CompanyResolver, ResolveMode, Resolution};
pub use sheet::{read_rows, RawRow};
pub use template::{write_template, TemplateKind};

/// Read a spreadsheet and reconcile its rows into the database
pub fn import_file<P: AsRef<Path>>(conn: &Connection, path: P) -> Result<ImportReport> {
    let path = path.as_ref();
    info!("Importing fiscal periods from {:?}", path);

    let rows = read_rows(path)?;
    reconcile(conn, &rows)
}

/// Read a spreadsheet of CNPJ/regime pairs into the mapping table
pub fn import_mapping_file<P: AsRef<Path>>(conn: &Connection, path: P) -> Result<MappingReport> {
    let rows = read_rows(path)?;
    import_regime_mappings(conn, &rows)
}
