//! Batch import of fiscal period rows
//!
//! Rows are classified once, resolved to companies one by one, and the
//! resulting period records are upserted after the whole batch has been
//! resolved. Failures are collected per row; the batch itself only fails
//! when it has no rows at all. No transaction wraps the batch.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::classifier::{classify, schema_mismatches, SheetSchema};
use super::headers::{field_flag, field_number, field_text, Field};
use super::resolver::{normalize_cnpj, CompanyResolver, ResolveMode};
use super::sheet::RawRow;
use crate::db::{self, FiscalFigures, LucroFigures, SimplesFigures, UpsertOutcome};
use crate::error::ImportError;

/// A row that could not be imported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// Sheet row number
    pub line: usize,
    pub company: String,
    pub message: String,
}

/// Outcome of one import batch
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub schema: SheetSchema,
    /// Period records written (created + updated)
    pub imported: usize,
    pub created: usize,
    pub updated: usize,
    /// Rows without a company name or a period
    pub skipped: usize,
    pub errors: Vec<RowError>,
    pub warnings: Vec<String>,
    pub companies_created: usize,
}

impl ImportReport {
    fn new(schema: SheetSchema) -> Self {
        Self {
            schema,
            imported: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            companies_created: 0,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} errors",
            self.created,
            self.updated,
            self.errors.len()
        )
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A sheet row read into typed fields, before company resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRow {
    pub line: usize,
    pub name: String,
    pub cnpj: Option<String>,
    /// Period label as written in the sheet, trimmed
    pub period: String,
    pub no_activity: Option<bool>,
    pub figures: FiscalFigures,
}

/// Read a row under the given schema. `None` when the company name or the
/// period is blank; such rows are skipped, not errors.
pub fn parse_row(row: &RawRow, schema: SheetSchema) -> Option<ParsedRow> {
    let name = field_text(row, Field::CompanyName)?;
    let period = field_text(row, Field::Period)?;

    let figures = match schema {
        SheetSchema::SimplesNacional => FiscalFigures::Simples(SimplesFigures {
            rbt12: field_number(row, Field::Rbt12),
            inflow: field_number(row, Field::Inflow),
            outflow: field_number(row, Field::Outflow),
            services: field_number(row, Field::Services),
            tax: field_number(row, Field::Tax),
            interstate_tax: field_number(row, Field::InterstateTax),
        }),
        SheetSchema::LucroReal => FiscalFigures::Lucro(LucroFigures {
            inflow: field_number(row, Field::Inflow),
            outflow: field_number(row, Field::Outflow),
            services: field_number(row, Field::Services),
            pis: field_number(row, Field::Pis),
            cofins: field_number(row, Field::Cofins),
            icms: field_number(row, Field::Icms),
            irpj: field_number(row, Field::Irpj),
            csll: field_number(row, Field::Csll),
            other_levies: field_number(row, Field::OtherLevies),
        }),
    };

    Some(ParsedRow {
        line: row.line,
        name,
        cnpj: field_text(row, Field::Cnpj).and_then(|c| normalize_cnpj(&c)),
        period,
        no_activity: field_flag(row, Field::NoActivity),
        figures,
    })
}

/// Classify a batch and parse every importable row without touching the
/// database (dry-run preview)
pub fn preview(rows: &[RawRow]) -> Result<(SheetSchema, Vec<ParsedRow>)> {
    let first = rows.first().ok_or(ImportError::EmptyBatch)?;
    let schema = classify(first);
    let parsed = rows.iter().filter_map(|row| parse_row(row, schema)).collect();
    Ok((schema, parsed))
}

struct PendingRecord {
    line: usize,
    company: String,
    company_id: i64,
    period: String,
    figures: FiscalFigures,
}

/// Import a batch of sheet rows into the database
pub fn reconcile(conn: &Connection, rows: &[RawRow]) -> Result<ImportReport> {
    let first = rows.first().ok_or(ImportError::EmptyBatch)?;
    let schema = classify(first);
    info!("Importing {} rows as {}", rows.len(), schema.label());

    let mut report = ImportReport::new(schema);

    for line in schema_mismatches(rows, schema) {
        let message = format!(
            "Row {} has columns of another regime; imported as {}",
            line,
            schema.label()
        );
        warn!("{}", message);
        report.warnings.push(message);
    }

    let mode = match schema {
        SheetSchema::SimplesNacional => ResolveMode::MatchAndRefresh,
        SheetSchema::LucroReal => ResolveMode::StrictMatch,
    };
    let mut resolver = CompanyResolver::new(mode);
    let mut pending = Vec::new();

    for row in rows {
        let Some(parsed) = parse_row(row, schema) else {
            debug!("Skipping row {}: missing company name or period", row.line);
            report.skipped += 1;
            continue;
        };

        let resolution = match resolver.resolve(
            conn,
            &parsed.name,
            parsed.cnpj.as_deref(),
            parsed.no_activity,
        ) {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {}: could not resolve company {}: {:#}", parsed.line, parsed.name, e);
                report.errors.push(RowError {
                    line: parsed.line,
                    company: parsed.name,
                    message: format!("{:#}", e),
                });
                continue;
            }
        };

        pending.push(PendingRecord {
            line: parsed.line,
            company: parsed.name,
            company_id: resolution.company_id,
            period: parsed.period,
            figures: parsed.figures,
        });
    }

    report.companies_created = resolver.created_count();

    // Upserts run in sheet order, so the last row for a period wins
    for record in pending {
        match db::upsert_fiscal_period(conn, record.company_id, &record.period, &record.figures) {
            Ok(outcome) => {
                report.imported += 1;
                match outcome {
                    UpsertOutcome::Created => report.created += 1,
                    UpsertOutcome::Updated => report.updated += 1,
                }
            }
            Err(e) => {
                warn!(
                    "Row {}: could not save period {} for {}: {:#}",
                    record.line, record.period, record.company, e
                );
                report.errors.push(RowError {
                    line: record.line,
                    company: record.company,
                    message: format!("{:#}", e),
                });
            }
        }
    }

    info!("Import finished: {}", report.summary());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Regime;
    use rust_decimal_macros::dec;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::apply_schema(&conn).unwrap();
        conn
    }

    fn simples_row(line: usize, name: &str, cnpj: &str, period: &str, outflow: &str) -> RawRow {
        RawRow::new(line)
            .with("Empresa", name)
            .with("CNPJ", cnpj)
            .with("Período", period)
            .with("RBT12", "120.000,00")
            .with("Saída", outflow)
    }

    fn company_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_empty_batch_fails_before_persistence() {
        let conn = memory_db();
        let err = reconcile(&conn, &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::EmptyBatch)
        ));
        assert_eq!(company_count(&conn), 0);
    }

    #[test]
    fn test_acme_simples_import() {
        let conn = memory_db();
        db::upsert_regime_mapping(&conn, "12345678000195", Regime::SimplesNacional).unwrap();

        let rows = vec![RawRow::new(2)
            .with("Empresa", "Acme Ltda")
            .with("CNPJ", "12.345.678/0001-95")
            .with("Período", "Janeiro/2024")
            .with("RBT12", "R$ 1.234,56")
            .with("Saída", 1500.0)];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.schema, SheetSchema::SimplesNacional);
        assert_eq!(report.summary(), "1 created, 0 updated, 0 errors");
        assert_eq!(report.companies_created, 1);

        let company = db::find_company_by_cnpj(&conn, "12345678000195")
            .unwrap()
            .unwrap();
        assert_eq!(company.name, "Acme Ltda");
        assert_eq!(company.regime, Some(Regime::SimplesNacional));

        let periods = db::list_fiscal_periods(&conn, company.id.unwrap()).unwrap();
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].period, "Janeiro/2024");
        match &periods[0].figures {
            FiscalFigures::Simples(f) => {
                assert_eq!(f.rbt12, Some(dec!(1234.56)));
                assert_eq!(f.outflow, Some(dec!(1500)));
                assert_eq!(f.inflow, None);
            }
            other => panic!("unexpected figures: {:?}", other),
        }
    }

    #[test]
    fn test_row_without_name_is_skipped() {
        let conn = memory_db();
        let rows = vec![
            RawRow::new(2)
                .with("Empresa", "")
                .with("CNPJ", "")
                .with("Período", "2024-01")
                .with("Saída", "100"),
            simples_row(3, "Beta", "", "2024-01", "10"),
        ];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.created, 1);
        assert!(report.errors.is_empty());
        assert_eq!(company_count(&conn), 1);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let conn = memory_db();
        let rows = vec![
            simples_row(2, "Acme", "12345678000195", "2024-01", "100"),
            simples_row(3, "Acme", "12345678000195", "2024-02", "200"),
            simples_row(4, "Beta", "", "2024-01", "50"),
        ];

        let first = reconcile(&conn, &rows).unwrap();
        assert_eq!(first.created, 3);
        assert_eq!(first.companies_created, 2);

        let acme = db::find_company_by_cnpj(&conn, "12345678000195")
            .unwrap()
            .unwrap()
            .id
            .unwrap();
        let before = db::list_fiscal_periods(&conn, acme).unwrap();

        let second = reconcile(&conn, &rows).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 3);
        assert_eq!(second.companies_created, 0);
        assert_eq!(company_count(&conn), 2);

        let after = db::list_fiscal_periods(&conn, acme).unwrap();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.period, a.period);
            assert_eq!(b.figures, a.figures);
        }
    }

    #[test]
    fn test_failing_row_does_not_stop_the_batch() {
        let conn = memory_db();
        conn.execute_batch("CREATE UNIQUE INDEX test_unique_name ON companies(name)")
            .unwrap();
        db::insert_company(
            &conn,
            &db::NewCompany {
                name: "Beta".to_string(),
                cnpj: Some("11111111000111".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let rows = vec![
            simples_row(2, "Acme", "12345678000195", "2024-01", "100"),
            // New CNPJ with a name that already exists: insert violates the index
            simples_row(3, "Beta", "22222222000122", "2024-01", "50"),
            simples_row(4, "Gama", "33333333000133", "2024-01", "75"),
        ];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 3);
        assert_eq!(report.errors[0].company, "Beta");
        assert_eq!(report.summary(), "2 created, 0 updated, 1 errors");

        assert!(db::find_company_by_cnpj(&conn, "12345678000195").unwrap().is_some());
        assert!(db::find_company_by_cnpj(&conn, "33333333000133").unwrap().is_some());
    }

    #[test]
    fn test_same_cnpj_different_spelling_creates_one_company() {
        let conn = memory_db();
        let rows = vec![
            simples_row(2, "Acme Ltda", "12345678000195", "2024-01", "100"),
            simples_row(3, "ACME  LTDA", "12.345.678/0001-95", "2024-02", "200"),
        ];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.companies_created, 1);
        assert_eq!(report.created, 2);
        assert_eq!(company_count(&conn), 1);
    }

    #[test]
    fn test_last_row_for_a_period_wins() {
        let conn = memory_db();
        let rows = vec![
            simples_row(2, "Acme", "12345678000195", "2024-01", "100"),
            simples_row(3, "Acme", "12345678000195", "2024-01", "999"),
        ];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);

        let id = db::find_company_by_cnpj(&conn, "12345678000195")
            .unwrap()
            .unwrap()
            .id
            .unwrap();
        let periods = db::list_fiscal_periods(&conn, id).unwrap();
        assert_eq!(periods.len(), 1);
        match &periods[0].figures {
            FiscalFigures::Simples(f) => assert_eq!(f.outflow, Some(dec!(999))),
            other => panic!("unexpected figures: {:?}", other),
        }
    }

    #[test]
    fn test_lucro_import_keeps_existing_company_untouched() {
        let conn = memory_db();
        let id = db::insert_company(
            &conn,
            &db::NewCompany {
                name: "Delta Indústria".to_string(),
                cnpj: Some("44444444000144".to_string()),
                regime: Some(Regime::LucroReal),
                ..Default::default()
            },
        )
        .unwrap();

        let rows = vec![RawRow::new(2)
            .with("Empresa", "DELTA")
            .with("CNPJ", "44444444000144")
            .with("Período", "1T/2024")
            .with("PIS", "1.650,00")
            .with("IRPJ", "15.000,00")];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.schema, SheetSchema::LucroReal);
        assert_eq!(report.created, 1);

        let company = db::get_company(&conn, id).unwrap().unwrap();
        assert_eq!(company.name, "Delta Indústria");

        let periods = db::list_fiscal_periods(&conn, id).unwrap();
        match &periods[0].figures {
            FiscalFigures::Lucro(f) => {
                assert_eq!(f.pis, Some(dec!(1650)));
                assert_eq!(f.irpj, Some(dec!(15000)));
                assert_eq!(f.cofins, None);
            }
            other => panic!("unexpected figures: {:?}", other),
        }
    }

    #[test]
    fn test_lucro_sheet_with_blank_first_quarter_keeps_tax_figures() {
        let conn = memory_db();
        let rows = vec![
            RawRow::new(2)
                .with("Empresa", "Alfa")
                .with("Período", "1T/2024")
                .with("Entrada", "10")
                .with("PIS", "")
                .with("COFINS", "")
                .with("IRPJ", ""),
            RawRow::new(3)
                .with("Empresa", "Beta")
                .with("Período", "1T/2024")
                .with("Entrada", "20")
                .with("PIS", "1.650,00")
                .with("COFINS", "7.600,00")
                .with("IRPJ", "15.000,00"),
        ];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.schema, SheetSchema::LucroReal);
        assert!(report.warnings.is_empty());
        assert_eq!(report.created, 2);

        let lucro_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM lucro_periods", [], |row| row.get(0))
            .unwrap();
        let simples_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM simples_periods", [], |row| row.get(0))
            .unwrap();
        assert_eq!((lucro_rows, simples_rows), (2, 0));

        let beta = db::find_company_by_name_without_cnpj(&conn, "Beta")
            .unwrap()
            .unwrap();
        let periods = db::list_fiscal_periods(&conn, beta.id.unwrap()).unwrap();
        match &periods[0].figures {
            FiscalFigures::Lucro(f) => {
                assert_eq!(f.pis, Some(dec!(1650)));
                assert_eq!(f.cofins, Some(dec!(7600)));
                assert_eq!(f.irpj, Some(dec!(15000)));
            }
            other => panic!("unexpected figures: {:?}", other),
        }
    }

    #[test]
    fn test_acme_without_mapping_has_no_regime() {
        let conn = memory_db();
        let rows = vec![RawRow::new(2)
            .with("Empresa", "Acme Ltda")
            .with("CNPJ", "12.345.678/0001-95")
            .with("Período", "2024-01")
            .with("RBT12", "1.000.000,00")];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 0);
        assert!(report.errors.is_empty());

        let company = db::find_company_by_cnpj(&conn, "12345678000195")
            .unwrap()
            .unwrap();
        assert_eq!(company.regime, None);
        let periods = db::list_fiscal_periods(&conn, company.id.unwrap()).unwrap();
        match &periods[0].figures {
            FiscalFigures::Simples(f) => assert_eq!(f.rbt12, Some(dec!(1000000))),
            other => panic!("unexpected figures: {:?}", other),
        }
    }

    #[test]
    fn test_single_nameless_row_imports_nothing() {
        let conn = memory_db();
        let rows = vec![RawRow::new(2)
            .with("Empresa", "")
            .with("Período", "2024-01")];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped, 1);
        assert!(report.errors.is_empty());
        assert_eq!(company_count(&conn), 0);
    }

    #[test]
    fn test_mixed_rows_produce_warnings() {
        let conn = memory_db();
        let rows = vec![
            simples_row(2, "Acme", "12345678000195", "2024-01", "100"),
            RawRow::new(3)
                .with("Empresa", "Delta")
                .with("Período", "2024-01")
                .with("COFINS", "10"),
        ];

        let report = reconcile(&conn, &rows).unwrap();
        assert_eq!(report.schema, SheetSchema::SimplesNacional);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Row 3"));
        assert_eq!(report.created, 2);
    }

    #[test]
    fn test_preview_does_not_write() {
        let conn = memory_db();
        let rows = vec![
            simples_row(2, "Acme", "12345678000195", "2024-01", "100"),
            simples_row(3, "", "", "2024-01", "1"),
        ];

        let (schema, parsed) = preview(&rows).unwrap();
        assert_eq!(schema, SheetSchema::SimplesNacional);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].cnpj.as_deref(), Some("12345678000195"));
        assert_eq!(company_count(&conn), 0);
    }
}
