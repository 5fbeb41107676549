// Database module - SQLite connection and models

pub mod models;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

pub use models::{
    Company, FiscalFigures, FiscalPeriodRecord, LucroFigures, NamedEntity, NewCompany, Regime,
    RegimeMapping, SimplesFigures, UpsertOutcome,
};

/// Get the default database path (~/.escritorio/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let app_dir = PathBuf::from(home).join(".escritorio");

    std::fs::create_dir_all(&app_dir).context("Failed to create .escritorio directory")?;

    Ok(app_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    // Deleting a company cascades to its fiscal periods
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;
    apply_schema(&conn)?;

    info!("Database initialized successfully");
    Ok(())
}

/// Run the schema on an already open connection (used by in-memory test databases)
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")
}

// ============ Companies ============

const COMPANY_COLUMNS: &str = "c.id, c.name, c.cnpj, c.segment_id, c.regime, c.no_activity, \
     c.responsible_id, c.password_hash, c.created_at, c.updated_at";

fn company_from_row(row: &rusqlite::Row) -> Result<Company, rusqlite::Error> {
    let regime: Option<String> = row.get(4)?;
    Ok(Company {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        cnpj: row.get(2)?,
        segment_id: row.get(3)?,
        regime: regime.and_then(|r| r.parse::<Regime>().ok()),
        no_activity: row.get(5)?,
        responsible_id: row.get(6)?,
        password_hash: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Find a company by exact CNPJ
pub fn find_company_by_cnpj(conn: &Connection, cnpj: &str) -> Result<Option<Company>> {
    let sql = format!("SELECT {} FROM companies c WHERE c.cnpj = ?1", COMPANY_COLUMNS);
    let company = conn
        .query_row(&sql, [cnpj], company_from_row)
        .optional()?;
    Ok(company)
}

/// Find a company by exact (case-sensitive) name among companies without a CNPJ
pub fn find_company_by_name_without_cnpj(conn: &Connection, name: &str) -> Result<Option<Company>> {
    let sql = format!(
        "SELECT {} FROM companies c WHERE c.name = ?1 AND c.cnpj IS NULL ORDER BY c.id LIMIT 1",
        COMPANY_COLUMNS
    );
    let company = conn
        .query_row(&sql, [name], company_from_row)
        .optional()?;
    Ok(company)
}

pub fn get_company(conn: &Connection, id: i64) -> Result<Option<Company>> {
    let sql = format!("SELECT {} FROM companies c WHERE c.id = ?1", COMPANY_COLUMNS);
    let company = conn.query_row(&sql, [id], company_from_row).optional()?;
    Ok(company)
}

/// Insert a company, returning its generated id
pub fn insert_company(conn: &Connection, company: &NewCompany) -> Result<i64> {
    conn.execute(
        "INSERT INTO companies (name, cnpj, regime, no_activity, segment_id, responsible_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            company.name,
            company.cnpj,
            company.regime.map(|r| r.as_str()),
            company.no_activity,
            company.segment_id,
            company.responsible_id,
        ],
    )?;

    let id = conn.last_insert_rowid();
    debug!("Created company {} ({:?}) with id {}", company.name, company.cnpj, id);
    Ok(id)
}

/// Refresh the identity fields of a company matched during import.
/// The no-activity flag is only written when the sheet states it.
pub fn refresh_company(
    conn: &Connection,
    id: i64,
    name: &str,
    cnpj: Option<&str>,
    no_activity: Option<bool>,
) -> Result<()> {
    conn.execute(
        "UPDATE companies
         SET name = ?2, cnpj = ?3, no_activity = COALESCE(?4, no_activity),
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?1",
        params![id, name, cnpj, no_activity],
    )?;
    Ok(())
}

/// Partial company edit; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub cnpj: Option<Option<String>>,
    pub regime: Option<Option<Regime>>,
    pub segment_id: Option<Option<i64>>,
    pub responsible_id: Option<Option<i64>>,
    pub no_activity: Option<bool>,
}

pub fn update_company(conn: &Connection, id: i64, update: &CompanyUpdate) -> Result<()> {
    let mut current =
        get_company(conn, id)?.ok_or_else(|| anyhow!("Company {} not found", id))?;

    if let Some(name) = &update.name {
        current.name = name.clone();
    }
    if let Some(cnpj) = &update.cnpj {
        current.cnpj = cnpj.clone();
    }
    if let Some(regime) = update.regime {
        current.regime = regime;
    }
    if let Some(segment_id) = update.segment_id {
        current.segment_id = segment_id;
    }
    if let Some(responsible_id) = update.responsible_id {
        current.responsible_id = responsible_id;
    }
    if let Some(flag) = update.no_activity {
        current.no_activity = flag;
    }

    conn.execute(
        "UPDATE companies
         SET name = ?2, cnpj = ?3, regime = ?4, segment_id = ?5, responsible_id = ?6,
             no_activity = ?7, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?1",
        params![
            id,
            current.name,
            current.cnpj,
            current.regime.map(|r| r.as_str()),
            current.segment_id,
            current.responsible_id,
            current.no_activity,
        ],
    )?;
    Ok(())
}

/// Flip the no-activity flag, returning the new value
pub fn toggle_no_activity(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE companies SET no_activity = NOT no_activity, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?1",
        [id],
    )?;
    if changed == 0 {
        return Err(anyhow!("Company {} not found", id));
    }
    let flag: bool = conn.query_row(
        "SELECT no_activity FROM companies WHERE id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(flag)
}

pub fn set_company_password_hash(conn: &Connection, id: i64, hash: Option<&str>) -> Result<()> {
    let changed = conn.execute(
        "UPDATE companies SET password_hash = ?2, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
        params![id, hash],
    )?;
    if changed == 0 {
        return Err(anyhow!("Company {} not found", id));
    }
    Ok(())
}

/// Delete a company and, through the foreign keys, its fiscal periods
pub fn delete_company(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM companies WHERE id = ?1", [id])?;
    Ok(changed > 0)
}

/// Filters for company listings
#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    pub regime: Option<Regime>,
    pub segment: Option<String>,
    pub responsible: Option<String>,
    /// Substring of the name (case-insensitive) or of the CNPJ digits
    pub search: Option<String>,
    pub active_only: bool,
}

pub fn list_companies(conn: &Connection, filter: &CompanyFilter) -> Result<Vec<Company>> {
    let mut sql = format!(
        "SELECT {} FROM companies c
         LEFT JOIN segments s ON c.segment_id = s.id
         LEFT JOIN responsibles r ON c.responsible_id = r.id
         WHERE 1=1",
        COMPANY_COLUMNS
    );

    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(regime) = filter.regime {
        sql.push_str(" AND c.regime = ?");
        params.push(Box::new(regime.as_str()));
    }
    if let Some(segment) = &filter.segment {
        sql.push_str(" AND s.name = ?");
        params.push(Box::new(segment.clone()));
    }
    if let Some(responsible) = &filter.responsible {
        sql.push_str(" AND r.name = ?");
        params.push(Box::new(responsible.clone()));
    }
    if let Some(search) = &filter.search {
        let digits: String = search.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            sql.push_str(" AND LOWER(c.name) LIKE ?");
            params.push(Box::new(format!("%{}%", search.to_lowercase())));
        } else {
            sql.push_str(" AND (LOWER(c.name) LIKE ? OR c.cnpj LIKE ?)");
            params.push(Box::new(format!("%{}%", search.to_lowercase())));
            params.push(Box::new(format!("%{}%", digits)));
        }
    }
    if filter.active_only {
        sql.push_str(" AND c.no_activity = 0");
    }

    sql.push_str(" ORDER BY c.name COLLATE NOCASE ASC, c.id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let companies = stmt
        .query_map(param_refs.as_slice(), company_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(companies)
}

// ============ Regime mappings ============

pub fn get_regime_mapping(conn: &Connection, cnpj: &str) -> Result<Option<Regime>> {
    let regime: Option<String> = conn
        .query_row(
            "SELECT regime FROM regime_mappings WHERE cnpj = ?1",
            [cnpj],
            |row| row.get(0),
        )
        .optional()?;
    Ok(regime.and_then(|r| r.parse().ok()))
}

pub fn upsert_regime_mapping(conn: &Connection, cnpj: &str, regime: Regime) -> Result<()> {
    conn.execute(
        "INSERT INTO regime_mappings (cnpj, regime) VALUES (?1, ?2)
         ON CONFLICT(cnpj) DO UPDATE SET regime = excluded.regime",
        params![cnpj, regime.as_str()],
    )?;
    Ok(())
}

pub fn delete_regime_mapping(conn: &Connection, cnpj: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM regime_mappings WHERE cnpj = ?1", [cnpj])?;
    Ok(changed > 0)
}

pub fn list_regime_mappings(conn: &Connection) -> Result<Vec<RegimeMapping>> {
    let mut stmt = conn.prepare("SELECT cnpj, regime FROM regime_mappings ORDER BY cnpj")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .filter_map(|(cnpj, regime)| {
            regime
                .parse()
                .ok()
                .map(|regime| RegimeMapping { cnpj, regime })
        })
        .collect())
}

/// Give a regime to an existing company that has none yet
pub fn apply_regime_if_unset(conn: &Connection, cnpj: &str, regime: Regime) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE companies SET regime = ?2, updated_at = CURRENT_TIMESTAMP
         WHERE cnpj = ?1 AND regime IS NULL",
        params![cnpj, regime.as_str()],
    )?;
    Ok(changed > 0)
}

// ============ Segments and responsible parties ============

/// Lookup tables holding a single unique name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedTable {
    Segments,
    Responsibles,
}

impl NamedTable {
    fn table(&self) -> &'static str {
        match self {
            NamedTable::Segments => "segments",
            NamedTable::Responsibles => "responsibles",
        }
    }
}

/// Return the id for `name`, creating the entry on first use
pub fn get_or_create_named(conn: &Connection, table: NamedTable, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("{} name cannot be empty", table.table()));
    }

    let select = format!("SELECT id FROM {} WHERE name = ?1", table.table());
    if let Some(id) = conn
        .query_row(&select, [name], |row| row.get::<_, i64>(0))
        .optional()?
    {
        return Ok(id);
    }

    let insert = format!("INSERT INTO {} (name) VALUES (?1)", table.table());
    conn.execute(&insert, [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_named(conn: &Connection, table: NamedTable) -> Result<Vec<NamedEntity>> {
    let sql = format!(
        "SELECT id, name FROM {} ORDER BY name COLLATE NOCASE",
        table.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let entities = stmt
        .query_map([], |row| {
            Ok(NamedEntity {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entities)
}

// ============ Fiscal periods ============

fn dec_text(value: &Option<Decimal>) -> Option<String> {
    value.as_ref().map(|d| d.to_string())
}

pub fn fiscal_period_exists(
    conn: &Connection,
    company_id: i64,
    period: &str,
    figures: &FiscalFigures,
) -> Result<bool> {
    let table = match figures {
        FiscalFigures::Simples(_) => "simples_periods",
        FiscalFigures::Lucro(_) => "lucro_periods",
    };
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE company_id = ?1 AND period = ?2",
        table
    );
    let count: i64 = conn.query_row(&sql, params![company_id, period], |row| row.get(0))?;
    Ok(count > 0)
}

/// Insert or overwrite the record keyed by (company_id, period).
/// Every figure is replaced, including with NULL; no field-level merge.
pub fn upsert_fiscal_period(
    conn: &Connection,
    company_id: i64,
    period: &str,
    figures: &FiscalFigures,
) -> Result<UpsertOutcome> {
    let existed = fiscal_period_exists(conn, company_id, period, figures)?;

    match figures {
        FiscalFigures::Simples(f) => {
            conn.execute(
                "INSERT INTO simples_periods (
                    company_id, period, rbt12, inflow, outflow, services, tax, interstate_tax
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(company_id, period) DO UPDATE SET
                    rbt12 = excluded.rbt12,
                    inflow = excluded.inflow,
                    outflow = excluded.outflow,
                    services = excluded.services,
                    tax = excluded.tax,
                    interstate_tax = excluded.interstate_tax,
                    updated_at = CURRENT_TIMESTAMP",
                params![
                    company_id,
                    period,
                    dec_text(&f.rbt12),
                    dec_text(&f.inflow),
                    dec_text(&f.outflow),
                    dec_text(&f.services),
                    dec_text(&f.tax),
                    dec_text(&f.interstate_tax),
                ],
            )?;
        }
        FiscalFigures::Lucro(f) => {
            conn.execute(
                "INSERT INTO lucro_periods (
                    company_id, period, inflow, outflow, services, pis, cofins, icms,
                    irpj, csll, other_levies
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(company_id, period) DO UPDATE SET
                    inflow = excluded.inflow,
                    outflow = excluded.outflow,
                    services = excluded.services,
                    pis = excluded.pis,
                    cofins = excluded.cofins,
                    icms = excluded.icms,
                    irpj = excluded.irpj,
                    csll = excluded.csll,
                    other_levies = excluded.other_levies,
                    updated_at = CURRENT_TIMESTAMP",
                params![
                    company_id,
                    period,
                    dec_text(&f.inflow),
                    dec_text(&f.outflow),
                    dec_text(&f.services),
                    dec_text(&f.pis),
                    dec_text(&f.cofins),
                    dec_text(&f.icms),
                    dec_text(&f.irpj),
                    dec_text(&f.csll),
                    dec_text(&f.other_levies),
                ],
            )?;
        }
    }

    Ok(if existed {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Created
    })
}

/// All fiscal periods of a company, Simples records first, in storage order.
/// Chronological ordering is a presentation concern (see `reports`).
pub fn list_fiscal_periods(conn: &Connection, company_id: i64) -> Result<Vec<FiscalPeriodRecord>> {
    let mut records = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT id, company_id, period, rbt12, inflow, outflow, services, tax, interstate_tax,
                updated_at
         FROM simples_periods WHERE company_id = ?1 ORDER BY id",
    )?;
    let simples = stmt
        .query_map([company_id], |row| {
            Ok(FiscalPeriodRecord {
                id: Some(row.get(0)?),
                company_id: row.get(1)?,
                period: row.get(2)?,
                figures: FiscalFigures::Simples(SimplesFigures {
                    rbt12: get_optional_decimal_value(row, 3)?,
                    inflow: get_optional_decimal_value(row, 4)?,
                    outflow: get_optional_decimal_value(row, 5)?,
                    services: get_optional_decimal_value(row, 6)?,
                    tax: get_optional_decimal_value(row, 7)?,
                    interstate_tax: get_optional_decimal_value(row, 8)?,
                }),
                updated_at: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    records.extend(simples);

    let mut stmt = conn.prepare(
        "SELECT id, company_id, period, inflow, outflow, services, pis, cofins, icms, irpj,
                csll, other_levies, updated_at
         FROM lucro_periods WHERE company_id = ?1 ORDER BY id",
    )?;
    let lucro = stmt
        .query_map([company_id], |row| {
            Ok(FiscalPeriodRecord {
                id: Some(row.get(0)?),
                company_id: row.get(1)?,
                period: row.get(2)?,
                figures: FiscalFigures::Lucro(LucroFigures {
                    inflow: get_optional_decimal_value(row, 3)?,
                    outflow: get_optional_decimal_value(row, 4)?,
                    services: get_optional_decimal_value(row, 5)?,
                    pis: get_optional_decimal_value(row, 6)?,
                    cofins: get_optional_decimal_value(row, 7)?,
                    icms: get_optional_decimal_value(row, 8)?,
                    irpj: get_optional_decimal_value(row, 9)?,
                    csll: get_optional_decimal_value(row, 10)?,
                    other_levies: get_optional_decimal_value(row, 11)?,
                }),
                updated_at: row.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    records.extend(lucro);

    Ok(records)
}

/// Helper to read optional Decimal from SQLite (handles NULL, INTEGER, REAL and TEXT)
pub fn get_optional_decimal_value(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<Option<Decimal>, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Decimal::from_str(s)
                .map(Some)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        ValueRef::Integer(i) => Ok(Some(Decimal::from(i))),
        ValueRef::Real(f) => Decimal::try_from(f)
            .map(Some)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e))),
        _ => Ok(None),
    }
}
