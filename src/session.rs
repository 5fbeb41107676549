//! Per-company access control for one process run
//!
//! Companies may carry a password. A session remembers which company ids
//! were unlocked; companies without a password are always accessible.
//! Access is tracked by id, so renaming a company never changes it.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::db;
use crate::error::EscritorioError;

const PASSWORD_CONTEXT: &str = "escritorio 2024 company access password";

fn hash_password(company_id: i64, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_CONTEXT);
    hasher.update(&company_id.to_le_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize()
}

fn verify_password(company_id: i64, password: &str, stored: &str) -> bool {
    match blake3::Hash::from_hex(stored) {
        // blake3::Hash equality is constant time
        Ok(expected) => hash_password(company_id, password) == expected,
        Err(_) => {
            warn!("Stored password hash for company {} is malformed", company_id);
            false
        }
    }
}

#[derive(Debug, Default)]
pub struct AccessSession {
    unlocked: HashSet<i64>,
}

impl AccessSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear (`None`) a company's password. The company stays
    /// unlocked in this session.
    pub fn set_password(
        &mut self,
        conn: &Connection,
        company_id: i64,
        password: Option<&str>,
    ) -> Result<()> {
        if db::get_company(conn, company_id)?.is_none() {
            return Err(anyhow!("Company {} not found", company_id));
        }

        let hash = password
            .filter(|p| !p.is_empty())
            .map(|p| hash_password(company_id, p).to_hex().to_string());
        db::set_company_password_hash(conn, company_id, hash.as_deref())?;
        self.unlocked.insert(company_id);
        debug!("Password {} for company {}", if hash.is_some() { "set" } else { "cleared" }, company_id);
        Ok(())
    }

    /// Try to unlock a company. Returns whether access is now granted.
    pub fn unlock(&mut self, conn: &Connection, company_id: i64, password: &str) -> Result<bool> {
        let company = db::get_company(conn, company_id)?
            .ok_or_else(|| anyhow!("Company {} not found", company_id))?;

        let granted = match company.password_hash.as_deref() {
            None => true,
            Some(stored) => verify_password(company_id, password, stored),
        };
        if granted {
            self.unlocked.insert(company_id);
        } else {
            warn!("Wrong password for company {}", company_id);
        }
        Ok(granted)
    }

    pub fn is_unlocked(&self, company_id: i64) -> bool {
        self.unlocked.contains(&company_id)
    }

    pub fn lock(&mut self, company_id: i64) {
        self.unlocked.remove(&company_id);
    }

    /// Whether the company's data may be read in this session
    pub fn can_access(&self, conn: &Connection, company_id: i64) -> Result<bool> {
        if self.is_unlocked(company_id) {
            return Ok(true);
        }
        let company = db::get_company(conn, company_id)?
            .ok_or_else(|| anyhow!("Company {} not found", company_id))?;
        Ok(company.password_hash.is_none())
    }

    pub fn require_access(&self, conn: &Connection, company_id: i64) -> Result<()> {
        if self.can_access(conn, company_id)? {
            Ok(())
        } else {
            Err(EscritorioError::AccessDenied(company_id).into())
        }
    }
}
