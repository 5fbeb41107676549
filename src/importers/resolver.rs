//! Company resolution during import
//!
//! Maps a sheet row's company name and CNPJ to a company id, creating the
//! company when none matches. A resolver lives for one import batch; its
//! cache guarantees a single creation per company key within the batch.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use crate::db::{self, NewCompany};
use crate::error::ImportError;

/// What happens to an existing company matched by CNPJ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Return the match untouched (Lucro Real/Presumido imports)
    StrictMatch,
    /// Overwrite name, CNPJ and the no-activity flag from the sheet (Simples imports)
    MatchAndRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub company_id: i64,
    /// True only for the row that caused the company to be created
    pub created: bool,
    /// An existing company was overwritten from the sheet
    pub refreshed: bool,
}

pub struct CompanyResolver {
    mode: ResolveMode,
    cache: HashMap<String, i64>,
    created: usize,
}

impl CompanyResolver {
    pub fn new(mode: ResolveMode) -> Self {
        Self {
            mode,
            cache: HashMap::new(),
            created: 0,
        }
    }

    /// Companies created by this resolver so far
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Resolve a company by CNPJ (when given) or by exact name among
    /// companies without a CNPJ. `cnpj` must already be normalized.
    pub fn resolve(
        &mut self,
        conn: &Connection,
        name: &str,
        cnpj: Option<&str>,
        no_activity: Option<bool>,
    ) -> Result<Resolution> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ImportError::MissingName.into());
        }

        let key = cache_key(name, cnpj);
        if let Some(&company_id) = self.cache.get(&key) {
            return Ok(Resolution {
                company_id,
                created: false,
                refreshed: false,
            });
        }

        let resolution = match cnpj {
            Some(cnpj) => self.resolve_by_cnpj(conn, name, cnpj, no_activity)?,
            None => self.resolve_by_name(conn, name, no_activity)?,
        };

        self.cache.insert(key, resolution.company_id);
        Ok(resolution)
    }

    fn resolve_by_cnpj(
        &mut self,
        conn: &Connection,
        name: &str,
        cnpj: &str,
        no_activity: Option<bool>,
    ) -> Result<Resolution> {
        if let Some(existing) = db::find_company_by_cnpj(conn, cnpj)? {
            let company_id = existing.id.unwrap_or_default();
            let refreshed = self.mode == ResolveMode::MatchAndRefresh;
            if refreshed {
                debug!("Refreshing company {} from sheet ({})", company_id, name);
                db::refresh_company(conn, company_id, name, Some(cnpj), no_activity)?;
            }
            return Ok(Resolution {
                company_id,
                created: false,
                refreshed,
            });
        }

        let regime = db::get_regime_mapping(conn, cnpj)?;
        let company_id = db::insert_company(
            conn,
            &NewCompany {
                name: name.to_string(),
                cnpj: Some(cnpj.to_string()),
                regime,
                no_activity: no_activity.unwrap_or(false),
                ..Default::default()
            },
        )?;
        info!(
            "Created company {} (CNPJ {}, regime {})",
            name,
            cnpj,
            regime.map(|r| r.label()).unwrap_or("none")
        );
        self.created += 1;

        Ok(Resolution {
            company_id,
            created: true,
            refreshed: false,
        })
    }

    fn resolve_by_name(
        &mut self,
        conn: &Connection,
        name: &str,
        no_activity: Option<bool>,
    ) -> Result<Resolution> {
        if let Some(existing) = db::find_company_by_name_without_cnpj(conn, name)? {
            return Ok(Resolution {
                company_id: existing.id.unwrap_or_default(),
                created: false,
                refreshed: false,
            });
        }

        let company_id = db::insert_company(
            conn,
            &NewCompany {
                name: name.to_string(),
                no_activity: no_activity.unwrap_or(false),
                ..Default::default()
            },
        )?;
        info!("Created company {} without CNPJ", name);
        self.created += 1;

        Ok(Resolution {
            company_id,
            created: true,
            refreshed: false,
        })
    }
}

fn cache_key(name: &str, cnpj: Option<&str>) -> String {
    match cnpj {
        Some(cnpj) => format!("cnpj:{}", cnpj),
        None => format!("name:{}", normalize_name_key(name)),
    }
}

/// Name key tolerant to casing, spacing and Unicode composition
pub fn normalize_name_key(name: &str) -> String {
    name.nfc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep the digits of a CNPJ, restoring the leading zeros Excel drops from
/// numeric cells (12 or 13 digits). Other lengths, such as 11-digit CPFs,
/// are kept as written. `None` when no digits remain.
pub fn normalize_cnpj(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0 => None,
        12 | 13 => Some(format!("{:0>14}", digits)),
        _ => Some(digits),
    }
}
