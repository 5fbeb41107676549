//! CNPJ to regime mapping import

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::headers::{field_text, Field};
use super::reconciler::RowError;
use super::resolver::normalize_cnpj;
use super::sheet::RawRow;
use crate::db::{self, Regime};

#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingReport {
    pub imported: usize,
    /// Rows without a CNPJ or with an unknown regime
    pub skipped: usize,
    /// Existing companies without a regime that received the mapped one
    pub applied: usize,
    pub errors: Vec<RowError>,
}

impl MappingReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub fn import_regime_mappings(conn: &Connection, rows: &[RawRow]) -> Result<MappingReport> {
    let mut report = MappingReport::default();

    for row in rows {
        let Some(cnpj) = field_text(row, Field::Cnpj).and_then(|c| normalize_cnpj(&c)) else {
            debug!("Row {}: no CNPJ, skipping", row.line);
            report.skipped += 1;
            continue;
        };
        let Some(regime) = field_text(row, Field::Regime).and_then(|r| r.parse::<Regime>().ok())
        else {
            debug!("Row {}: unknown regime, skipping", row.line);
            report.skipped += 1;
            continue;
        };

        let saved = db::upsert_regime_mapping(conn, &cnpj, regime)
            .and_then(|_| db::apply_regime_if_unset(conn, &cnpj, regime));
        match saved {
            Ok(applied) => {
                report.imported += 1;
                if applied {
                    report.applied += 1;
                }
            }
            Err(e) => {
                warn!("Row {}: could not save mapping for {}: {:#}", row.line, cnpj, e);
                report.errors.push(RowError {
                    line: row.line,
                    company: field_text(row, Field::CompanyName).unwrap_or(cnpj),
                    message: format!("{:#}", e),
                });
            }
        }
    }

    info!(
        "Regime mappings: {} imported, {} skipped, {} applied to companies, {} errors",
        report.imported,
        report.skipped,
        report.applied,
        report.errors.len()
    );
    Ok(report)
}
