use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::Runtime;
use crate::cli::{formatters, PasswordCommands, PeriodCommands};
use crate::reports;

pub async fn dispatch_periods(action: PeriodCommands, rt: &Runtime) -> Result<()> {
    match action {
        PeriodCommands::List { company_id } => {
            let conn = rt.open_db()?;
            let session = rt.session_for(&conn, company_id)?;
            session.require_access(&conn, company_id)?;

            let listing = reports::period_listing(&conn, company_id)?;
            if rt.json {
                println!("{}", formatters::to_json(&listing));
            } else {
                print!("{}", formatters::format_periods_table(&listing));
            }
        }
    }
    Ok(())
}

pub async fn dispatch_password(action: PasswordCommands, rt: &Runtime) -> Result<()> {
    match action {
        PasswordCommands::Set {
            company_id,
            new_password,
        } => {
            let conn = rt.open_db()?;
            let mut session = rt.session_for(&conn, company_id)?;
            // Changing a password requires the current one
            session.require_access(&conn, company_id)?;

            let new_password = Some(new_password.as_str()).filter(|p| !p.is_empty());
            session.set_password(&conn, company_id, new_password)?;

            if rt.json {
                println!(
                    "{}",
                    formatters::to_json(&json!({
                        "company_id": company_id,
                        "protected": new_password.is_some(),
                    }))
                );
            } else if new_password.is_some() {
                println!("{} Password set for company {}", "✓".green().bold(), company_id);
            } else {
                println!("{} Password cleared for company {}", "✓".green().bold(), company_id);
            }
        }
    }
    Ok(())
}
