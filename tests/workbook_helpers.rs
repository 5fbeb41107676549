#![allow(dead_code)]

use anyhow::Result;
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Cell value for generated test workbooks
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

/// Write a single-sheet workbook: header row plus data rows
pub fn write_workbook(path: &Path, headers: &[&str], rows: &[Vec<Cell>]) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (row_idx, row) in rows.iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(text) => {
                    worksheet.write_string(row_num, col as u16, *text)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row_num, col as u16, *n)?;
                }
                Cell::Blank => {}
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

pub const SIMPLES_HEADERS: &[&str] = &["Empresa", "CNPJ", "Período", "RBT12", "Saída", "Serviços"];

/// Simples sheet with the Acme row from the reference scenario
pub fn write_acme_simples(path: &Path) -> Result<()> {
    write_workbook(
        path,
        SIMPLES_HEADERS,
        &[vec![
            Cell::Text("Acme Ltda"),
            Cell::Text("12.345.678/0001-95"),
            Cell::Text("Janeiro/2024"),
            Cell::Text("R$ 1.234,56"),
            Cell::Number(1500.0),
            Cell::Blank,
        ]],
    )
}
