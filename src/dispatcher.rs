//! Command dispatcher: routes parsed CLI commands to their handlers.
//!
//! Handlers open the database themselves through [`Runtime`], print either
//! human output or JSON, and return batch-level failures as errors.

mod companies;
mod imports;
mod mappings;
mod periods;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::db;
use crate::session::AccessSession;

/// Settings shared by every handler of one invocation
#[derive(Debug, Clone)]
pub struct Runtime {
    pub db_path: Option<PathBuf>,
    pub json: bool,
    pub password: Option<String>,
    pub preview_rows: usize,
}

impl Runtime {
    pub fn new(cli: &Cli, config: &Config) -> Self {
        Self {
            db_path: config.resolve_db_path(cli.db.clone()),
            json: cli.json,
            password: cli.password.clone(),
            preview_rows: config.preview_rows,
        }
    }

    /// Open (creating when needed) the database with its schema applied
    pub fn open_db(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.as_ref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context(format!("Failed to create {:?}", parent))?;
            }
        }
        db::init_database(self.db_path.clone())?;
        db::open_db(self.db_path.clone())
    }

    /// Session with the company unlocked when `--password` matches
    pub fn session_for(&self, conn: &Connection, company_id: i64) -> Result<AccessSession> {
        let mut session = AccessSession::new();
        if let Some(password) = &self.password {
            let granted = session.unlock(conn, company_id, password)?;
            debug!("Unlock company {}: {}", company_id, granted);
        }
        Ok(session)
    }
}

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, rt: &Runtime) -> Result<()> {
    match command {
        Commands::Import { file, dry_run } => imports::dispatch_import(&file, dry_run, rt).await,
        Commands::Template { kind, out } => imports::dispatch_template(kind, &out, rt).await,
        Commands::Export { company_id, out } => {
            imports::dispatch_export(company_id, &out, rt).await
        }
        Commands::Companies { action } => companies::dispatch_companies(action, rt).await,
        Commands::Mappings { action } => mappings::dispatch_mappings(action, rt).await,
        Commands::Periods { action } => periods::dispatch_periods(action, rt).await,
        Commands::Segments { .. } => companies::dispatch_named(db::NamedTable::Segments, rt).await,
        Commands::Responsibles { .. } => {
            companies::dispatch_named(db::NamedTable::Responsibles, rt).await
        }
        Commands::Password { action } => periods::dispatch_password(action, rt).await,
    }
}
