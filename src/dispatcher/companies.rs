use anyhow::{anyhow, Result};
use colored::Colorize;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;

use super::Runtime;
use crate::cli::{formatters, CompanyCommands};
use crate::db::{self, CompanyFilter, CompanyUpdate, NamedTable, NewCompany, Regime};
use crate::error::EscritorioError;
use crate::importers::normalize_cnpj;
use crate::reports;

fn parse_regime(value: &str) -> Result<Option<Regime>> {
    Regime::parse_optional(value).map_err(|_| {
        EscritorioError::ValidationError(format!(
            "unknown regime '{}' (use simples_nacional, lucro_real, lucro_presumido, produtor_rural or none)",
            value
        ))
        .into()
    })
}

fn parse_cnpj(value: &str) -> Result<String> {
    normalize_cnpj(value).ok_or_else(|| {
        EscritorioError::ValidationError(format!("'{}' is not a CNPJ", value)).into()
    })
}

/// "none" or blank clears an optional field
fn is_clear(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("none")
}

fn named_id(conn: &Connection, table: NamedTable, value: Option<&str>) -> Result<Option<i64>> {
    match value {
        Some(name) if !is_clear(name) => Ok(Some(db::get_or_create_named(conn, table, name)?)),
        _ => Ok(None),
    }
}

fn named_map(conn: &Connection, table: NamedTable) -> Result<HashMap<i64, String>> {
    Ok(db::list_named(conn, table)?
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect())
}

pub async fn dispatch_companies(action: CompanyCommands, rt: &Runtime) -> Result<()> {
    let conn = rt.open_db()?;

    match action {
        CompanyCommands::Add {
            name,
            cnpj,
            regime,
            segment,
            responsible,
        } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(EscritorioError::ValidationError("company name is required".into()).into());
            }
            let cnpj = cnpj.as_deref().map(parse_cnpj).transpose()?;
            let regime = match regime.as_deref() {
                Some(value) => parse_regime(value)?,
                // No explicit regime: fall back to the CNPJ mapping
                None => match &cnpj {
                    Some(cnpj) => db::get_regime_mapping(&conn, cnpj)?,
                    None => None,
                },
            };

            let id = db::insert_company(
                &conn,
                &NewCompany {
                    name: name.clone(),
                    cnpj,
                    regime,
                    no_activity: false,
                    segment_id: named_id(&conn, NamedTable::Segments, segment.as_deref())?,
                    responsible_id: named_id(&conn, NamedTable::Responsibles, responsible.as_deref())?,
                },
            )?;

            if rt.json {
                println!("{}", formatters::to_json(&db::get_company(&conn, id)?));
            } else {
                println!("{} Added company {} (id {})", "✓".green().bold(), name, id);
            }
        }

        CompanyCommands::List {
            regime,
            segment,
            responsible,
            search,
            active,
        } => {
            let regime = match regime.as_deref() {
                Some(value) => parse_regime(value)?,
                None => None,
            };
            let filter = CompanyFilter {
                regime,
                segment,
                responsible,
                search,
                active_only: active,
            };
            let companies = db::list_companies(&conn, &filter)?;

            if rt.json {
                println!("{}", formatters::to_json(&companies));
            } else {
                let summary = reports::regime_summary(&companies);
                print!(
                    "{}",
                    formatters::format_companies_table(
                        &companies,
                        &named_map(&conn, NamedTable::Segments)?,
                        &named_map(&conn, NamedTable::Responsibles)?,
                        &summary,
                    )
                );
            }
        }

        CompanyCommands::Edit {
            id,
            name,
            cnpj,
            regime,
            segment,
            responsible,
        } => {
            let update = CompanyUpdate {
                name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                cnpj: match cnpj.as_deref() {
                    Some(value) if is_clear(value) => Some(None),
                    Some(value) => Some(Some(parse_cnpj(value)?)),
                    None => None,
                },
                regime: regime.as_deref().map(parse_regime).transpose()?,
                segment_id: match segment.as_deref() {
                    Some(value) => Some(named_id(&conn, NamedTable::Segments, Some(value))?),
                    None => None,
                },
                responsible_id: match responsible.as_deref() {
                    Some(value) => Some(named_id(&conn, NamedTable::Responsibles, Some(value))?),
                    None => None,
                },
                no_activity: None,
            };
            db::update_company(&conn, id, &update)?;

            if rt.json {
                println!("{}", formatters::to_json(&db::get_company(&conn, id)?));
            } else {
                println!("{} Company {} updated", "✓".green().bold(), id);
            }
        }

        CompanyCommands::Toggle { id } => {
            let no_activity = db::toggle_no_activity(&conn, id)?;
            if rt.json {
                println!(
                    "{}",
                    formatters::to_json(&json!({ "id": id, "no_activity": no_activity }))
                );
            } else if no_activity {
                println!("{} Company {} flagged without activity", "✓".green().bold(), id);
            } else {
                println!("{} Company {} flagged active", "✓".green().bold(), id);
            }
        }

        CompanyCommands::Delete { id } => {
            if !db::delete_company(&conn, id)? {
                return Err(anyhow!("Company {} not found", id));
            }
            if rt.json {
                println!("{}", formatters::to_json(&json!({ "deleted": id })));
            } else {
                println!(
                    "{} Company {} and its periods deleted",
                    "✓".green().bold(),
                    id
                );
            }
        }
    }

    Ok(())
}

pub async fn dispatch_named(table: NamedTable, rt: &Runtime) -> Result<()> {
    let conn = rt.open_db()?;
    let entities = db::list_named(&conn, table)?;

    if rt.json {
        println!("{}", formatters::to_json(&entities));
    } else {
        let title = match table {
            NamedTable::Segments => "Segments",
            NamedTable::Responsibles => "Responsibles",
        };
        print!("{}", formatters::format_named_table(title, &entities));
    }
    Ok(())
}
