use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::importers::TemplateKind;

pub mod formatters;

#[derive(Parser)]
#[command(name = "escritorio")]
#[command(
    version,
    about = "Fiscal period bookkeeping for Brazilian accounting firms"
)]
#[command(
    long_about = "Import monthly fiscal figures of client companies (Simples Nacional, Lucro Real, Lucro Presumido) from spreadsheets, reconcile them into a local database and export them back."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Database file (overrides ESCRITORIO_DB and the config file)
    #[arg(long = "db", global = true)]
    pub db: Option<PathBuf>,

    /// Password used to unlock protected companies for this command
    #[arg(long = "password", global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import fiscal periods from a spreadsheet (Simples or Lucro layout, auto-detected)
    Import {
        /// Path to the .xlsx/.xls/.ods/.csv file
        file: PathBuf,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Write an empty import template with example rows
    Template {
        #[arg(value_enum)]
        kind: TemplateKind,

        /// Output .xlsx path
        out: PathBuf,
    },

    /// Export a company's periods to a spreadsheet
    Export {
        company_id: i64,

        /// Output .xlsx path
        out: PathBuf,
    },

    /// Company management
    Companies {
        #[command(subcommand)]
        action: CompanyCommands,
    },

    /// CNPJ to regime mappings
    Mappings {
        #[command(subcommand)]
        action: MappingCommands,
    },

    /// Fiscal periods
    Periods {
        #[command(subcommand)]
        action: PeriodCommands,
    },

    /// Business segments
    Segments {
        #[command(subcommand)]
        action: ListOnly,
    },

    /// Responsible parties
    Responsibles {
        #[command(subcommand)]
        action: ListOnly,
    },

    /// Company passwords
    Password {
        #[command(subcommand)]
        action: PasswordCommands,
    },
}

#[derive(Subcommand)]
pub enum CompanyCommands {
    /// Register a company
    Add {
        name: String,

        #[arg(long)]
        cnpj: Option<String>,

        /// simples_nacional, lucro_real, lucro_presumido, produtor_rural or none
        #[arg(long)]
        regime: Option<String>,

        #[arg(long)]
        segment: Option<String>,

        #[arg(long)]
        responsible: Option<String>,
    },

    /// List companies
    List {
        #[arg(long)]
        regime: Option<String>,

        #[arg(long)]
        segment: Option<String>,

        #[arg(long)]
        responsible: Option<String>,

        /// Name substring or CNPJ digits
        #[arg(short, long)]
        search: Option<String>,

        /// Hide companies flagged without activity
        #[arg(long)]
        active: bool,
    },

    /// Edit a company (only the given fields change)
    Edit {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        /// New CNPJ, or "none" to clear it
        #[arg(long)]
        cnpj: Option<String>,

        /// New regime, or "none" to clear it
        #[arg(long)]
        regime: Option<String>,

        /// Segment name, or "none" to clear it
        #[arg(long)]
        segment: Option<String>,

        /// Responsible party name, or "none" to clear it
        #[arg(long)]
        responsible: Option<String>,
    },

    /// Flip the no-activity flag
    Toggle { id: i64 },

    /// Delete a company and all of its periods
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum MappingCommands {
    /// Map a CNPJ to a regime
    Set { cnpj: String, regime: String },

    /// List mappings
    List,

    /// Remove a mapping
    Remove { cnpj: String },

    /// Import mappings from a spreadsheet with CNPJ and Regime columns
    Import { file: PathBuf },
}

#[derive(Subcommand)]
pub enum PeriodCommands {
    /// List a company's periods chronologically
    List { company_id: i64 },
}

#[derive(Subcommand)]
pub enum ListOnly {
    /// List entries
    List,
}

#[derive(Subcommand)]
pub enum PasswordCommands {
    /// Set (or with an empty value, clear) a company's password.
    /// A protected company needs --password with the current one.
    Set { company_id: i64, new_password: String },
}
