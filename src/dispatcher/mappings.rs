use anyhow::{anyhow, Result};
use colored::Colorize;
use serde_json::json;

use super::Runtime;
use crate::cli::{formatters, MappingCommands};
use crate::db::{self, Regime};
use crate::error::EscritorioError;
use crate::importers::{self, normalize_cnpj};

pub async fn dispatch_mappings(action: MappingCommands, rt: &Runtime) -> Result<()> {
    let conn = rt.open_db()?;

    match action {
        MappingCommands::Set { cnpj, regime } => {
            let cnpj = normalize_cnpj(&cnpj).ok_or_else(|| {
                EscritorioError::ValidationError(format!("'{}' is not a CNPJ", cnpj))
            })?;
            let regime: Regime = regime.parse().map_err(|_| {
                EscritorioError::ValidationError(format!("unknown regime '{}'", regime))
            })?;

            db::upsert_regime_mapping(&conn, &cnpj, regime)?;
            let applied = db::apply_regime_if_unset(&conn, &cnpj, regime)?;

            if rt.json {
                println!(
                    "{}",
                    formatters::to_json(&json!({
                        "cnpj": cnpj,
                        "regime": regime,
                        "applied_to_company": applied,
                    }))
                );
            } else {
                println!(
                    "{} {} mapped to {}",
                    "✓".green().bold(),
                    cnpj,
                    regime.label()
                );
                if applied {
                    println!("  regime applied to the existing company");
                }
            }
        }

        MappingCommands::List => {
            let mappings = db::list_regime_mappings(&conn)?;
            if rt.json {
                println!("{}", formatters::to_json(&mappings));
            } else {
                print!("{}", formatters::format_mappings_table(&mappings));
            }
        }

        MappingCommands::Remove { cnpj } => {
            let digits = normalize_cnpj(&cnpj).unwrap_or(cnpj);
            if !db::delete_regime_mapping(&conn, &digits)? {
                return Err(anyhow!("No mapping for {}", digits));
            }
            if rt.json {
                println!("{}", formatters::to_json(&json!({ "removed": digits })));
            } else {
                println!("{} Mapping for {} removed", "✓".green().bold(), digits);
            }
        }

        MappingCommands::Import { file } => {
            let report = importers::import_mapping_file(&conn, &file)?;
            if rt.json {
                println!("{}", formatters::to_json(&report));
            } else {
                print!("{}", formatters::format_mapping_report(&report));
            }
        }
    }

    Ok(())
}
