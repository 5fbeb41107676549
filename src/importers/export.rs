//! Export stored periods back to a spreadsheet in template layout

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::info;

use super::headers::Field;
use super::template::{write_header, TemplateKind};
use crate::db::{self, FiscalFigures, FiscalPeriodRecord};
use crate::reports;

/// Stored value of a numeric field, `None` for fields the shape lacks
pub fn figure(figures: &FiscalFigures, field: Field) -> Option<Decimal> {
    match figures {
        FiscalFigures::Simples(f) => match field {
            Field::Rbt12 => f.rbt12,
            Field::Inflow => f.inflow,
            Field::Outflow => f.outflow,
            Field::Services => f.services,
            Field::Tax => f.tax,
            Field::InterstateTax => f.interstate_tax,
            _ => None,
        },
        FiscalFigures::Lucro(f) => match field {
            Field::Inflow => f.inflow,
            Field::Outflow => f.outflow,
            Field::Services => f.services,
            Field::Pis => f.pis,
            Field::Cofins => f.cofins,
            Field::Icms => f.icms,
            Field::Irpj => f.irpj,
            Field::Csll => f.csll,
            Field::OtherLevies => f.other_levies,
            _ => None,
        },
    }
}

/// Export a company's stored periods, chronologically.
///
/// Each record shape gets its own sheet. The sheet of the company's own
/// regime comes first (and is written even when empty), so importing the
/// file back reads the records of that regime. Returns the number of period
/// rows written.
pub fn export_periods<P: AsRef<Path>>(
    conn: &Connection,
    company_id: i64,
    path: P,
) -> Result<usize> {
    let path = path.as_ref();
    let company = db::get_company(conn, company_id)?
        .ok_or_else(|| anyhow!("Company {} not found", company_id))?;
    let records = reports::sorted_periods(db::list_fiscal_periods(conn, company_id)?);

    let (simples, lucro): (Vec<FiscalPeriodRecord>, Vec<FiscalPeriodRecord>) = records
        .into_iter()
        .partition(|r| matches!(r.figures, FiscalFigures::Simples(_)));

    let sheets = match TemplateKind::for_regime(company.regime) {
        TemplateKind::Lucro => [(TemplateKind::Lucro, &lucro), (TemplateKind::Simples, &simples)],
        _ => [(TemplateKind::Simples, &simples), (TemplateKind::Lucro, &lucro)],
    };

    let mut workbook = Workbook::new();
    let mut written = 0;
    for (idx, (kind, rows)) in sheets.iter().enumerate() {
        if idx > 0 && rows.is_empty() {
            continue;
        }
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(kind.sheet_name())?;
        write_header(worksheet, kind.columns())?;

        for (row_idx, record) in rows.iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            for (col, field) in kind.columns().iter().enumerate() {
                let col = col as u16;
                match field {
                    Field::CompanyName => {
                        worksheet.write_string(row_num, col, &company.name)?;
                    }
                    Field::Cnpj => {
                        if let Some(cnpj) = &company.cnpj {
                            worksheet.write_string(row_num, col, cnpj)?;
                        }
                    }
                    Field::Period => {
                        worksheet.write_string(row_num, col, &record.period)?;
                    }
                    Field::NoActivity => {
                        let flag = if company.no_activity { "Sim" } else { "Não" };
                        worksheet.write_string(row_num, col, flag)?;
                    }
                    field => {
                        if let Some(value) = figure(&record.figures, *field).and_then(|d| d.to_f64()) {
                            worksheet.write_number(row_num, col, value)?;
                        }
                    }
                }
            }
            written += 1;
        }
    }

    workbook
        .save(path)
        .context(format!("Failed to write export to {:?}", path))?;
    info!("Exported {} periods of {} to {:?}", written, company.name, path);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Regime, SimplesFigures, LucroFigures};
    use crate::importers::{field_text, read_rows, reconcile};
    use rust_decimal_macros::dec;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::apply_schema(&conn).unwrap();
        conn
    }

    fn acme(conn: &Connection, regime: Regime) -> i64 {
        db::insert_company(
            conn,
            &db::NewCompany {
                name: "Acme".to_string(),
                cnpj: Some("12345678000195".to_string()),
                regime: Some(regime),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_figure_lookup_by_shape() {
        let simples = FiscalFigures::Simples(SimplesFigures {
            rbt12: Some(dec!(10)),
            ..Default::default()
        });
        assert_eq!(figure(&simples, Field::Rbt12), Some(dec!(10)));
        assert_eq!(figure(&simples, Field::Pis), None);

        let lucro = FiscalFigures::Lucro(LucroFigures {
            pis: Some(dec!(5)),
            ..Default::default()
        });
        assert_eq!(figure(&lucro, Field::Pis), Some(dec!(5)));
        assert_eq!(figure(&lucro, Field::Rbt12), None);
    }

    #[test]
    fn test_export_is_chronological_and_reimportable() {
        let dir = tempfile::tempdir().unwrap();
        let conn = memory_db();
        let id = acme(&conn, Regime::SimplesNacional);
        for (period, outflow) in [("Março/2024", 3), ("Janeiro/2024", 1), ("2024-02", 2)] {
            let figures = FiscalFigures::Simples(SimplesFigures {
                outflow: Some(Decimal::from(outflow)),
                ..Default::default()
            });
            db::upsert_fiscal_period(&conn, id, period, &figures).unwrap();
        }

        let path = dir.path().join("export.xlsx");
        assert_eq!(export_periods(&conn, id, &path).unwrap(), 3);

        let rows = read_rows(&path).unwrap();
        let periods: Vec<String> = rows
            .iter()
            .filter_map(|r| field_text(r, Field::Period))
            .collect();
        assert_eq!(periods, vec!["Janeiro/2024", "2024-02", "Março/2024"]);

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.updated, 3);
        assert_eq!(report.companies_created, 0);
    }

    #[test]
    fn test_lucro_company_exports_lucro_sheet_first() {
        let dir = tempfile::tempdir().unwrap();
        let conn = memory_db();
        let id = acme(&conn, Regime::LucroPresumido);
        let figures = FiscalFigures::Lucro(LucroFigures {
            irpj: Some(dec!(1500)),
            ..Default::default()
        });
        db::upsert_fiscal_period(&conn, id, "1T/2024", &figures).unwrap();

        let path = dir.path().join("lucro.xlsx");
        assert_eq!(export_periods(&conn, id, &path).unwrap(), 1);

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("IRPJ").is_some());
        assert!(rows[0].get("RBT12").is_none());
    }

    #[test]
    fn test_export_unknown_company() {
        let dir = tempfile::tempdir().unwrap();
        let conn = memory_db();
        assert!(export_periods(&conn, 42, dir.path().join("x.xlsx")).is_err());
    }
}
