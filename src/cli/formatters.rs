//! Output formatting module for CLI display
//!
//! Handlers compute, these functions render. JSON output goes through
//! [`to_json`]; everything else is tabled/colored text.

use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::db::{Company, FiscalFigures, NamedEntity, RegimeMapping};
use crate::importers::{ImportReport, MappingReport, ParsedRow, RowError, SheetSchema};
use crate::reports::{PeriodListing, RegimeCount};
use crate::utils::{format_cnpj, format_figure};

pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn regime_label(company: &Company) -> String {
    company
        .regime
        .map(|r| r.label().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Dry-run preview of the first `limit` importable rows
pub fn format_import_preview(schema: SheetSchema, rows: &[ParsedRow], limit: usize) -> String {
    #[derive(Tabled)]
    struct PreviewRow {
        #[tabled(rename = "Row")]
        line: usize,
        #[tabled(rename = "Company")]
        company: String,
        #[tabled(rename = "CNPJ")]
        cnpj: String,
        #[tabled(rename = "Period")]
        period: String,
        #[tabled(rename = "Outflow")]
        outflow: String,
        #[tabled(rename = "Services")]
        services: String,
    }

    let mut output = format!(
        "\n{} Found {} rows ({})\n\n",
        "✓".green().bold(),
        rows.len(),
        schema.label()
    );

    let preview: Vec<PreviewRow> = rows
        .iter()
        .take(limit)
        .map(|row| {
            let (outflow, services) = match &row.figures {
                FiscalFigures::Simples(f) => (f.outflow, f.services),
                FiscalFigures::Lucro(f) => (f.outflow, f.services),
            };
            PreviewRow {
                line: row.line,
                company: row.name.clone(),
                cnpj: row.cnpj.as_deref().map(format_cnpj).unwrap_or_default(),
                period: row.period.clone(),
                outflow: format_figure(outflow),
                services: format_figure(services),
            }
        })
        .collect();

    if !preview.is_empty() {
        let mut table = Table::new(preview);
        table.with(Style::rounded());
        table.modify(Columns::new(4..), Alignment::right());
        output.push_str(&table.to_string());
        output.push('\n');
    }
    if rows.len() > limit {
        output.push_str(&format!("\n... and {} more rows\n", rows.len() - limit));
    }
    output
}

pub fn format_import_report(report: &ImportReport) -> String {
    let mut output = String::new();

    let mark = if report.has_errors() {
        "⚠".yellow().bold()
    } else {
        "✓".green().bold()
    };
    output.push_str(&format!(
        "\n{} {} import: {}\n",
        mark,
        report.schema.label(),
        report.summary()
    ));
    if report.companies_created > 0 {
        output.push_str(&format!("  {} new companies\n", report.companies_created));
    }
    if report.skipped > 0 {
        output.push_str(&format!(
            "  {} rows skipped (no company name or period)\n",
            report.skipped
        ));
    }
    for warning in &report.warnings {
        output.push_str(&format!("  {} {}\n", "⚠".yellow(), warning));
    }

    if report.has_errors() {
        output.push_str(&format_row_errors(&report.errors));
    }
    output
}

fn format_row_errors(errors: &[RowError]) -> String {
    #[derive(Tabled)]
    struct ErrorRow {
        #[tabled(rename = "Row")]
        line: usize,
        #[tabled(rename = "Company")]
        company: String,
        #[tabled(rename = "Error")]
        message: String,
    }

    let rows: Vec<ErrorRow> = errors
        .iter()
        .map(|e| ErrorRow {
            line: e.line,
            company: e.company.clone(),
            message: e.message.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("\n{}\n", table)
}

pub fn format_mapping_report(report: &MappingReport) -> String {
    let mark = if report.has_errors() {
        "⚠".yellow().bold()
    } else {
        "✓".green().bold()
    };
    let mut output = format!(
        "\n{} {} mappings imported, {} skipped, {} applied to existing companies, {} errors\n",
        mark,
        report.imported,
        report.skipped,
        report.applied,
        report.errors.len()
    );
    if report.has_errors() {
        output.push_str(&format_row_errors(&report.errors));
    }
    output
}

/// Company table; segment and responsible ids are shown by name
pub fn format_companies_table(
    companies: &[Company],
    segments: &HashMap<i64, String>,
    responsibles: &HashMap<i64, String>,
    summary: &[RegimeCount],
) -> String {
    if companies.is_empty() {
        return format!("{} No companies found\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct CompanyRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "CNPJ")]
        cnpj: String,
        #[tabled(rename = "Regime")]
        regime: String,
        #[tabled(rename = "Segment")]
        segment: String,
        #[tabled(rename = "Responsible")]
        responsible: String,
        #[tabled(rename = "Activity")]
        activity: String,
        #[tabled(rename = "🔒")]
        locked: String,
    }

    let lookup = |map: &HashMap<i64, String>, id: Option<i64>| {
        id.and_then(|id| map.get(&id).cloned()).unwrap_or_default()
    };

    let rows: Vec<CompanyRow> = companies
        .iter()
        .map(|c| CompanyRow {
            id: c.id.unwrap_or_default(),
            name: c.name.clone(),
            cnpj: c.cnpj.as_deref().map(format_cnpj).unwrap_or_default(),
            regime: regime_label(c),
            segment: lookup(segments, c.segment_id),
            responsible: lookup(responsibles, c.responsible_id),
            activity: if c.no_activity {
                "none".dimmed().to_string()
            } else {
                "active".to_string()
            },
            locked: if c.password_hash.is_some() {
                "yes".to_string()
            } else {
                String::new()
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    let mut output = table.to_string();

    let totals: Vec<String> = summary
        .iter()
        .map(|c| {
            let label = c.regime.map(|r| r.label()).unwrap_or("No regime");
            format!("{}: {}", label, c.companies)
        })
        .collect();
    output.push_str(&format!(
        "\n{} companies ({})\n",
        companies.len(),
        totals.join(", ")
    ));
    output
}

pub fn format_periods_table(listing: &PeriodListing) -> String {
    let mut output = format!(
        "\n{} {} {}\n\n",
        "📅".cyan().bold(),
        listing.company.name.bold(),
        listing
            .company
            .cnpj
            .as_deref()
            .map(format_cnpj)
            .unwrap_or_default()
    );

    if listing.periods.is_empty() {
        output.push_str(&format!("{} No periods stored\n", "ℹ".blue().bold()));
        return output;
    }

    #[derive(Tabled)]
    struct SimplesRow {
        #[tabled(rename = "Period")]
        period: String,
        #[tabled(rename = "RBT12")]
        rbt12: String,
        #[tabled(rename = "Inflow")]
        inflow: String,
        #[tabled(rename = "Outflow")]
        outflow: String,
        #[tabled(rename = "Services")]
        services: String,
        #[tabled(rename = "Tax")]
        tax: String,
        #[tabled(rename = "DIFAL")]
        interstate_tax: String,
    }

    #[derive(Tabled)]
    struct LucroRow {
        #[tabled(rename = "Period")]
        period: String,
        #[tabled(rename = "Inflow")]
        inflow: String,
        #[tabled(rename = "Outflow")]
        outflow: String,
        #[tabled(rename = "Services")]
        services: String,
        #[tabled(rename = "PIS")]
        pis: String,
        #[tabled(rename = "COFINS")]
        cofins: String,
        #[tabled(rename = "ICMS")]
        icms: String,
        #[tabled(rename = "IRPJ")]
        irpj: String,
        #[tabled(rename = "CSLL")]
        csll: String,
        #[tabled(rename = "Other")]
        other_levies: String,
    }

    let mut simples = Vec::new();
    let mut lucro = Vec::new();
    for record in &listing.periods {
        match &record.figures {
            FiscalFigures::Simples(f) => simples.push(SimplesRow {
                period: record.period.clone(),
                rbt12: format_figure(f.rbt12),
                inflow: format_figure(f.inflow),
                outflow: format_figure(f.outflow),
                services: format_figure(f.services),
                tax: format_figure(f.tax),
                interstate_tax: format_figure(f.interstate_tax),
            }),
            FiscalFigures::Lucro(f) => lucro.push(LucroRow {
                period: record.period.clone(),
                inflow: format_figure(f.inflow),
                outflow: format_figure(f.outflow),
                services: format_figure(f.services),
                pis: format_figure(f.pis),
                cofins: format_figure(f.cofins),
                icms: format_figure(f.icms),
                irpj: format_figure(f.irpj),
                csll: format_figure(f.csll),
                other_levies: format_figure(f.other_levies),
            }),
        }
    }

    if !simples.is_empty() {
        output.push_str(&format!("{}\n", "Simples Nacional".bold()));
        let mut table = Table::new(simples);
        table.with(Style::rounded());
        table.modify(Columns::new(1..), Alignment::right());
        output.push_str(&table.to_string());
        output.push('\n');
    }
    if !lucro.is_empty() {
        output.push_str(&format!("{}\n", "Lucro Real/Presumido".bold()));
        let mut table = Table::new(lucro);
        table.with(Style::rounded());
        table.modify(Columns::new(1..), Alignment::right());
        output.push_str(&table.to_string());
        output.push('\n');
    }
    output
}

pub fn format_mappings_table(mappings: &[RegimeMapping]) -> String {
    if mappings.is_empty() {
        return format!("{} No regime mappings\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct MappingRow {
        #[tabled(rename = "CNPJ")]
        cnpj: String,
        #[tabled(rename = "Regime")]
        regime: String,
    }

    let rows: Vec<MappingRow> = mappings
        .iter()
        .map(|m| MappingRow {
            cnpj: format_cnpj(&m.cnpj),
            regime: m.regime.label().to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::modern());
    format!("{}\n", table)
}

pub fn format_named_table(title: &str, entities: &[NamedEntity]) -> String {
    if entities.is_empty() {
        return format!("{} No {} yet\n", "ℹ".blue().bold(), title.to_lowercase());
    }

    #[derive(Tabled)]
    struct NamedRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
    }

    let rows: Vec<NamedRow> = entities
        .iter()
        .map(|e| NamedRow {
            id: e.id,
            name: e.name.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::modern());
    format!("{}\n{}\n", title.bold(), table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ImportReport {
        ImportReport {
            schema: SheetSchema::SimplesNacional,
            imported: 2,
            created: 2,
            updated: 0,
            skipped: 1,
            errors: vec![RowError {
                line: 4,
                company: "Beta".to_string(),
                message: "UNIQUE constraint failed".to_string(),
            }],
            warnings: vec![],
            companies_created: 1,
        }
    }

    #[test]
    fn test_import_report_lists_errors() {
        colored::control::set_override(false);
        let text = format_import_report(&report());
        assert!(text.contains("2 created, 0 updated, 1 errors"));
        assert!(text.contains("1 rows skipped"));
        assert!(text.contains("UNIQUE constraint failed"));
    }

    #[test]
    fn test_mapping_report_lists_errors() {
        colored::control::set_override(false);
        let report = MappingReport {
            imported: 3,
            skipped: 1,
            applied: 0,
            errors: vec![RowError {
                line: 5,
                company: "Delta".to_string(),
                message: "database is locked".to_string(),
            }],
        };
        let text = format_mapping_report(&report);
        assert!(text.starts_with("\n⚠ 3 mappings imported"));
        assert!(text.contains("1 errors"));
        assert!(text.contains("database is locked"));
    }

    #[test]
    fn test_report_json_has_counts() {
        let json: serde_json::Value = serde_json::from_str(&to_json(&report())).unwrap();
        assert_eq!(json["created"], 2);
        assert_eq!(json["schema"], "simples_nacional");
        assert_eq!(json["errors"][0]["line"], 4);
    }

    #[test]
    fn test_empty_tables() {
        colored::control::set_override(false);
        assert!(format_mappings_table(&[]).contains("No regime mappings"));
        assert!(format_named_table("Segments", &[]).contains("No segments yet"));
        assert!(
            format_companies_table(&[], &HashMap::new(), &HashMap::new(), &[])
                .contains("No companies found")
        );
    }
}
