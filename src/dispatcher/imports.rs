use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::path::Path;

use super::Runtime;
use crate::cli::formatters;
use crate::importers::{self, TemplateKind};

pub async fn dispatch_import(file: &Path, dry_run: bool, rt: &Runtime) -> Result<()> {
    tracing::info!("Importing from: {:?}", file);

    let rows = importers::read_rows(file)?;

    if dry_run {
        // Parse only; the database is not opened
        let (schema, parsed) = importers::preview(&rows)?;
        if rt.json {
            println!(
                "{}",
                formatters::to_json(&json!({
                    "dry_run": true,
                    "schema": schema,
                    "rows": parsed,
                    "skipped": rows.len() - parsed.len(),
                }))
            );
        } else {
            print!(
                "{}",
                formatters::format_import_preview(schema, &parsed, rt.preview_rows)
            );
            println!("\n{} Dry run - no changes saved", "ℹ".blue().bold());
        }
        return Ok(());
    }

    let conn = rt.open_db()?;
    let report = importers::reconcile(&conn, &rows)?;

    if rt.json {
        println!("{}", formatters::to_json(&report));
    } else {
        print!("{}", formatters::format_import_report(&report));
    }
    Ok(())
}

pub async fn dispatch_template(kind: TemplateKind, out: &Path, rt: &Runtime) -> Result<()> {
    importers::write_template(out, kind)?;

    if rt.json {
        println!(
            "{}",
            formatters::to_json(&json!({
                "template": kind.sheet_name(),
                "path": out.display().to_string(),
                "headers": kind.headers(),
            }))
        );
    } else {
        println!(
            "{} {} template written to {}",
            "✓".green().bold(),
            kind.sheet_name(),
            out.display()
        );
    }
    Ok(())
}

pub async fn dispatch_export(company_id: i64, out: &Path, rt: &Runtime) -> Result<()> {
    let conn = rt.open_db()?;
    let session = rt.session_for(&conn, company_id)?;
    session.require_access(&conn, company_id)?;

    let written = importers::export_periods(&conn, company_id, out)?;

    if rt.json {
        println!(
            "{}",
            formatters::to_json(&json!({
                "company_id": company_id,
                "periods": written,
                "path": out.display().to_string(),
            }))
        );
    } else {
        println!(
            "{} Exported {} periods to {}",
            "✓".green().bold(),
            written,
            out.display()
        );
    }
    Ok(())
}
