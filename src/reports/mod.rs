// Reports module - period listings and company summaries

use anyhow::{anyhow, Result};
use itertools::Itertools;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{self, Company, FiscalPeriodRecord, Regime};
use crate::importers::compare_periods;

/// Sort records chronologically by period label; unparsable labels first
pub fn sorted_periods(records: Vec<FiscalPeriodRecord>) -> Vec<FiscalPeriodRecord> {
    records
        .into_iter()
        .sorted_by(|a, b| compare_periods(&a.period, &b.period))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct PeriodListing {
    pub company: Company,
    pub periods: Vec<FiscalPeriodRecord>,
}

/// A company's stored periods in chronological order
pub fn period_listing(conn: &Connection, company_id: i64) -> Result<PeriodListing> {
    let company = db::get_company(conn, company_id)?
        .ok_or_else(|| anyhow!("Company {} not found", company_id))?;
    let periods = sorted_periods(db::list_fiscal_periods(conn, company_id)?);
    Ok(PeriodListing { company, periods })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegimeCount {
    pub regime: Option<Regime>,
    pub companies: usize,
}

/// Number of companies per regime, companies without a regime last
pub fn regime_summary(companies: &[Company]) -> Vec<RegimeCount> {
    companies
        .iter()
        .counts_by(|c| c.regime)
        .into_iter()
        .map(|(regime, companies)| RegimeCount { regime, companies })
        .sorted_by_key(|c| (c.regime.is_none(), c.regime.map(|r| r.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FiscalFigures, NewCompany, SimplesFigures};

    fn record(period: &str) -> FiscalPeriodRecord {
        FiscalPeriodRecord {
            id: None,
            company_id: 1,
            period: period.to_string(),
            figures: FiscalFigures::Simples(SimplesFigures::default()),
            updated_at: None,
        }
    }

    #[test]
    fn test_sorted_periods_puts_unparsable_first() {
        let sorted = sorted_periods(vec![
            record("Fevereiro/2024"),
            record("2023-12"),
            record("sem data"),
            record("01/2024"),
        ]);
        let labels: Vec<&str> = sorted.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(labels, vec!["sem data", "2023-12", "01/2024", "Fevereiro/2024"]);
    }

    #[test]
    fn test_period_listing_requires_company() {
        let conn = Connection::open_in_memory().unwrap();
        db::apply_schema(&conn).unwrap();
        assert!(period_listing(&conn, 7).is_err());

        let id = db::insert_company(
            &conn,
            &NewCompany {
                name: "Acme".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        let listing = period_listing(&conn, id).unwrap();
        assert_eq!(listing.company.name, "Acme");
        assert!(listing.periods.is_empty());
    }

    #[test]
    fn test_regime_summary() {
        let conn = Connection::open_in_memory().unwrap();
        db::apply_schema(&conn).unwrap();
        for (name, regime) in [
            ("A", Some(Regime::SimplesNacional)),
            ("B", None),
            ("C", Some(Regime::SimplesNacional)),
            ("D", Some(Regime::LucroReal)),
        ] {
            db::insert_company(
                &conn,
                &NewCompany {
                    name: name.to_string(),
                    regime,
                    ..Default::default()
                },
            )
            .unwrap();
        }
        let companies = db::list_companies(&conn, &db::CompanyFilter::default()).unwrap();

        let summary = regime_summary(&companies);
        assert_eq!(
            summary,
            vec![
                RegimeCount { regime: Some(Regime::LucroReal), companies: 1 },
                RegimeCount { regime: Some(Regime::SimplesNacional), companies: 2 },
                RegimeCount { regime: None, companies: 1 },
            ]
        );
    }
}
