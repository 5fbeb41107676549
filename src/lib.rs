//! Escritorio - fiscal period bookkeeping for Brazilian accounting firms
//!
//! This library imports monthly fiscal figures of client companies from
//! human-maintained spreadsheets (Simples Nacional and Lucro Real/Presumido
//! layouts), reconciles them against the companies already on file and
//! stores one record per company and period.

pub mod cli;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod importers;
pub mod reports;
pub mod session;
pub mod utils;
