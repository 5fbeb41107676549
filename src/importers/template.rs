//! Spreadsheet templates
//!
//! Templates use the canonical header of each field, so a template filled
//! in by hand (or an export) imports back without renaming columns.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;
use tracing::info;

use super::headers::Field;
use crate::db::Regime;

/// Column layout of the Simples Nacional sheet
pub const SIMPLES_COLUMNS: &[Field] = &[
    Field::CompanyName,
    Field::Cnpj,
    Field::Period,
    Field::Rbt12,
    Field::Inflow,
    Field::Outflow,
    Field::Services,
    Field::Tax,
    Field::InterstateTax,
    Field::NoActivity,
];

/// Column layout of the Lucro Real/Presumido sheet
pub const LUCRO_COLUMNS: &[Field] = &[
    Field::CompanyName,
    Field::Cnpj,
    Field::Period,
    Field::Inflow,
    Field::Outflow,
    Field::Services,
    Field::Pis,
    Field::Cofins,
    Field::Icms,
    Field::Irpj,
    Field::Csll,
    Field::OtherLevies,
];

pub const MAPPING_COLUMNS: &[Field] = &[Field::Cnpj, Field::Regime, Field::CompanyName];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TemplateKind {
    Simples,
    Lucro,
    RegimeMapping,
}

impl TemplateKind {
    pub fn sheet_name(&self) -> &'static str {
        match self {
            TemplateKind::Simples => "Simples Nacional",
            TemplateKind::Lucro => "Lucro Real e Presumido",
            TemplateKind::RegimeMapping => "Regimes",
        }
    }

    pub fn columns(&self) -> &'static [Field] {
        match self {
            TemplateKind::Simples => SIMPLES_COLUMNS,
            TemplateKind::Lucro => LUCRO_COLUMNS,
            TemplateKind::RegimeMapping => MAPPING_COLUMNS,
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns().iter().map(|f| f.canonical_header()).collect()
    }

    /// Template matching a company's regime
    pub fn for_regime(regime: Option<Regime>) -> Self {
        match regime {
            Some(Regime::LucroReal) | Some(Regime::LucroPresumido) => TemplateKind::Lucro,
            _ => TemplateKind::Simples,
        }
    }
}

enum Cell {
    Text(&'static str),
    Number(f64),
}

fn example_rows(kind: TemplateKind) -> Vec<Vec<Cell>> {
    use Cell::{Number, Text};

    match kind {
        TemplateKind::Simples => vec![
            vec![
                Text("Acme Comércio Ltda"),
                Text("12.345.678/0001-95"),
                Text("Janeiro/2024"),
                Number(480000.0),
                Number(15000.0),
                Number(40000.0),
                Number(0.0),
                Number(2400.0),
                Number(0.0),
                Text("Não"),
            ],
            vec![
                Text("Padaria Modelo ME"),
                Text("98.765.432/0001-10"),
                Text("Janeiro/2024"),
                Number(96000.0),
                Number(3000.0),
                Number(8000.0),
                Number(0.0),
                Number(480.0),
                Number(0.0),
                Text("Não"),
            ],
        ],
        TemplateKind::Lucro => vec![
            vec![
                Text("Delta Indústria S/A"),
                Text("11.222.333/0001-81"),
                Text("1T/2024"),
                Number(250000.0),
                Number(900000.0),
                Number(50000.0),
                Number(9075.0),
                Number(41800.0),
                Number(162000.0),
                Number(22500.0),
                Number(8100.0),
                Number(0.0),
            ],
            vec![
                Text("Ômega Serviços Ltda"),
                Text("44.555.666/0001-02"),
                Text("1T/2024"),
                Number(0.0),
                Number(0.0),
                Number(300000.0),
                Number(1950.0),
                Number(9000.0),
                Number(0.0),
                Number(7200.0),
                Number(4320.0),
                Number(1500.0),
            ],
        ],
        TemplateKind::RegimeMapping => vec![
            vec![
                Text("12.345.678/0001-95"),
                Text("Simples Nacional"),
                Text("Acme Comércio Ltda"),
            ],
            vec![
                Text("11.222.333/0001-81"),
                Text("Lucro Real"),
                Text("Delta Indústria S/A"),
            ],
        ],
    }
}

pub(super) fn write_header(worksheet: &mut Worksheet, columns: &[Field]) -> Result<()> {
    let bold = Format::new().set_bold();
    for (col, field) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, field.canonical_header(), &bold)?;
        worksheet.set_column_width(col as u16, 18)?;
    }
    Ok(())
}

/// Write an import template with two example rows
pub fn write_template<P: AsRef<Path>>(path: P, kind: TemplateKind) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(kind.sheet_name())?;
    write_header(worksheet, kind.columns())?;

    for (idx, row) in example_rows(kind).iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(text) => worksheet.write_string(row_num, col as u16, *text)?,
                Cell::Number(n) => worksheet.write_number(row_num, col as u16, *n)?,
            };
        }
    }

    workbook
        .save(path)
        .context(format!("Failed to write template to {:?}", path))?;
    info!("Wrote {} template to {:?}", kind.sheet_name(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::importers::{read_rows, reconcile, SheetSchema};
    use rusqlite::Connection;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::apply_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_headers_are_canonical_synonyms() {
        assert_eq!(
            TemplateKind::Simples.headers(),
            vec![
                "Empresa",
                "CNPJ",
                "Período",
                "RBT12",
                "Entrada",
                "Saída",
                "Serviços",
                "Imposto",
                "DIFAL",
                "Sem Movimento"
            ]
        );
        assert!(TemplateKind::Lucro.headers().contains(&"IRPJ"));
    }

    #[test]
    fn test_example_rows_match_columns() {
        for kind in [
            TemplateKind::Simples,
            TemplateKind::Lucro,
            TemplateKind::RegimeMapping,
        ] {
            for row in example_rows(kind) {
                assert_eq!(row.len(), kind.columns().len());
            }
        }
    }

    #[test]
    fn test_templates_import_back() {
        let dir = tempfile::tempdir().unwrap();

        let simples = dir.path().join("simples.xlsx");
        write_template(&simples, TemplateKind::Simples).unwrap();
        let conn = memory_db();
        let report = reconcile(&conn, &read_rows(&simples).unwrap()).unwrap();
        assert_eq!(report.schema, SheetSchema::SimplesNacional);
        assert_eq!(report.created, 2);
        assert!(report.errors.is_empty());

        let lucro = dir.path().join("lucro.xlsx");
        write_template(&lucro, TemplateKind::Lucro).unwrap();
        let report = reconcile(&conn, &read_rows(&lucro).unwrap()).unwrap();
        assert_eq!(report.schema, SheetSchema::LucroReal);
        assert_eq!(report.created, 2);
    }
}
