use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tax regimes a company can be enrolled in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    SimplesNacional,
    LucroReal,
    LucroPresumido,
    ProdutorRural,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::SimplesNacional => "simples_nacional",
            Regime::LucroReal => "lucro_real",
            Regime::LucroPresumido => "lucro_presumido",
            Regime::ProdutorRural => "produtor_rural",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Regime::SimplesNacional => "Simples Nacional",
            Regime::LucroReal => "Lucro Real",
            Regime::LucroPresumido => "Lucro Presumido",
            Regime::ProdutorRural => "Produtor Rural",
        }
    }

    /// Parse an optional regime where "none"/blank mean no regime
    pub fn parse_optional(s: &str) -> Result<Option<Self>, ()> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("nenhum")
        {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl FromStr for Regime {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "simples_nacional" | "simples" | "sn" => Ok(Regime::SimplesNacional),
            "lucro_real" | "real" | "lr" => Ok(Regime::LucroReal),
            "lucro_presumido" | "presumido" | "lp" => Ok(Regime::LucroPresumido),
            "produtor_rural" | "produtor" | "pr" => Ok(Regime::ProdutorRural),
            _ => Err(()),
        }
    }
}

/// Client company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Option<i64>,
    pub name: String,
    pub cnpj: Option<String>,
    pub segment_id: Option<i64>,
    pub regime: Option<Regime>,
    pub no_activity: bool,
    pub responsible_id: Option<i64>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a new company is created with
#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    pub name: String,
    pub cnpj: Option<String>,
    pub regime: Option<Regime>,
    pub no_activity: bool,
    pub segment_id: Option<i64>,
    pub responsible_id: Option<i64>,
}

/// Simples Nacional figures for one period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimplesFigures {
    pub rbt12: Option<Decimal>,
    pub inflow: Option<Decimal>,
    pub outflow: Option<Decimal>,
    pub services: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub interstate_tax: Option<Decimal>,
}

/// Lucro Real / Lucro Presumido figures for one period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LucroFigures {
    pub inflow: Option<Decimal>,
    pub outflow: Option<Decimal>,
    pub services: Option<Decimal>,
    pub pis: Option<Decimal>,
    pub cofins: Option<Decimal>,
    pub icms: Option<Decimal>,
    pub irpj: Option<Decimal>,
    pub csll: Option<Decimal>,
    pub other_levies: Option<Decimal>,
}

/// Regime-specific figures of a fiscal period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FiscalFigures {
    Simples(SimplesFigures),
    Lucro(LucroFigures),
}

/// Fiscal period record, unique per (company_id, period)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalPeriodRecord {
    pub id: Option<i64>,
    pub company_id: i64,
    /// Verbatim period label ("Janeiro/2024", "2024-01", "1T/2024", ...)
    pub period: String,
    pub figures: FiscalFigures,
    pub updated_at: Option<DateTime<Utc>>,
}

/// CNPJ to regime association, independent of company existence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeMapping {
    pub cnpj: String,
    pub regime: Regime,
}

/// Named lookup entity (segment or responsible party)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: i64,
    pub name: String,
}

/// Outcome of a fiscal period upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
