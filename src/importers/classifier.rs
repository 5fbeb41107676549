//! Sheet schema classification
//!
//! A file holds rows of a single schema. The first row's headers decide it,
//! blank or not; later rows are checked for filled cells only to produce
//! warnings.

use serde::Serialize;

use super::headers::Field;
use super::sheet::RawRow;

/// Column layout of an imported sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSchema {
    SimplesNacional,
    /// Lucro Real and Lucro Presumido share this layout
    LucroReal,
}

impl SheetSchema {
    pub fn label(&self) -> &'static str {
        match self {
            SheetSchema::SimplesNacional => "Simples Nacional",
            SheetSchema::LucroReal => "Lucro Real/Presumido",
        }
    }
}

/// Fields whose presence marks a Lucro Real/Presumido sheet
const LUCRO_MARKERS: [Field; 5] = [Field::Pis, Field::Cofins, Field::Icms, Field::Irpj, Field::Csll];

pub fn classify(first_row: &RawRow) -> SheetSchema {
    let is_lucro = first_row
        .headers()
        .any(|header| LUCRO_MARKERS.iter().any(|field| field.matches(header)));
    if is_lucro {
        SheetSchema::LucroReal
    } else {
        SheetSchema::SimplesNacional
    }
}

/// Fields that only exist in the Simples Nacional layout
const SIMPLES_MARKERS: [Field; 3] = [Field::Rbt12, Field::Tax, Field::InterstateTax];

fn has_filled(row: &RawRow, markers: &[Field]) -> bool {
    row.filled_headers()
        .any(|header| markers.iter().any(|field| field.matches(header)))
}

/// Sheet line numbers of rows carrying data that belongs to the other schema
pub fn schema_mismatches(rows: &[RawRow], schema: SheetSchema) -> Vec<usize> {
    rows.iter()
        .filter(|row| match schema {
            SheetSchema::SimplesNacional => has_filled(row, &LUCRO_MARKERS),
            SheetSchema::LucroReal => {
                has_filled(row, &SIMPLES_MARKERS) && !has_filled(row, &LUCRO_MARKERS)
            }
        })
        .map(|row| row.line)
        .collect()
}
