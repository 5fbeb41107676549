//! Header synonym table
//!
//! Each logical field accepts an ordered list of header spellings. Matching
//! is exact: case and accents must be spelled as listed. The first synonym
//! of each field is the canonical header written to templates.

use calamine::Data;
use rust_decimal::Decimal;

use super::numeric::parse_numeric_cell;
use super::sheet::{cell_text, RawRow};

/// Logical spreadsheet fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CompanyName,
    Cnpj,
    Period,
    Rbt12,
    Inflow,
    Outflow,
    Services,
    Tax,
    InterstateTax,
    Pis,
    Cofins,
    Icms,
    Irpj,
    Csll,
    OtherLevies,
    NoActivity,
    Regime,
}

impl Field {
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Field::CompanyName => &[
                "Empresa",
                "empresa",
                "EMPRESA",
                "Nome",
                "nome",
                "Razão Social",
                "Razao Social",
                "razão social",
            ],
            Field::Cnpj => &["CNPJ", "cnpj", "Cnpj", "CNPJ/CPF"],
            Field::Period => &[
                "Período",
                "Periodo",
                "período",
                "periodo",
                "PERÍODO",
                "Competência",
                "Competencia",
                "Mês",
                "Mes",
            ],
            Field::Rbt12 => &[
                "RBT12",
                "rbt12",
                "Rbt12",
                "Receita Bruta 12 Meses",
                "Faturamento 12 Meses",
            ],
            Field::Inflow => &["Entrada", "entrada", "Entradas", "entradas", "Compras"],
            Field::Outflow => &[
                "Saída",
                "Saida",
                "saída",
                "saida",
                "Saídas",
                "Saidas",
                "Vendas",
            ],
            Field::Services => &["Serviços", "Servicos", "serviços", "servicos", "Serviço"],
            Field::Tax => &["Imposto", "imposto", "DAS", "Valor DAS", "Imposto DAS"],
            Field::InterstateTax => &[
                "DIFAL",
                "Difal",
                "difal",
                "ICMS DIFAL",
                "Diferencial de Alíquota",
            ],
            Field::Pis => &["PIS", "pis", "Pis"],
            Field::Cofins => &["COFINS", "cofins", "Cofins"],
            Field::Icms => &["ICMS", "icms", "Icms"],
            Field::Irpj => &["IRPJ", "irpj", "Irpj", "IRPJ Trimestral"],
            Field::Csll => &["CSLL", "csll", "Csll", "CSLL Trimestral"],
            Field::OtherLevies => &[
                "Outros",
                "outros",
                "Outros Tributos",
                "Outros Impostos",
            ],
            Field::NoActivity => &["Sem Movimento", "Sem movimento", "sem movimento"],
            Field::Regime => &[
                "Regime",
                "regime",
                "Regime Tributário",
                "Regime Tributario",
            ],
        }
    }

    /// Header written to generated templates
    pub fn canonical_header(&self) -> &'static str {
        self.synonyms()[0]
    }

    pub fn matches(&self, header: &str) -> bool {
        self.synonyms().contains(&header)
    }
}

/// First cell of `row` under any synonym of `field`, in synonym order
pub fn field_cell(row: &RawRow, field: Field) -> Option<&Data> {
    field
        .synonyms()
        .iter()
        .find_map(|header| row.get(header))
}

/// Trimmed text of the field, `None` when absent or blank.
/// Falls through to the next synonym when the first matching column is blank.
pub fn field_text(row: &RawRow, field: Field) -> Option<String> {
    field
        .synonyms()
        .iter()
        .filter_map(|header| row.get(header))
        .find_map(cell_text)
}

pub fn field_number(row: &RawRow, field: Field) -> Option<Decimal> {
    field_cell(row, field).and_then(parse_numeric_cell)
}

/// Yes/no flag; `None` when the column is absent or unrecognized
pub fn field_flag(row: &RawRow, field: Field) -> Option<bool> {
    let text = field_text(row, field)?.to_lowercase();
    match text.as_str() {
        "sim" | "s" | "x" | "true" | "1" | "yes" => Some(true),
        "não" | "nao" | "n" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_uses_any_synonym() {
        let row = RawRow::new(2)
            .with("Razão Social", "Acme Ltda")
            .with("Competencia", "2024-01");
        assert_eq!(field_text(&row, Field::CompanyName).as_deref(), Some("Acme Ltda"));
        assert_eq!(field_text(&row, Field::Period).as_deref(), Some("2024-01"));
    }

    #[test]
    fn test_matching_is_case_and_accent_sensitive() {
        let row = RawRow::new(2).with("SAÍDA", "10").with("pIs", "5");
        assert_eq!(field_number(&row, Field::Outflow), None);
        assert_eq!(field_number(&row, Field::Pis), None);
    }

    #[test]
    fn test_blank_first_synonym_falls_through() {
        let row = RawRow::new(2).with("Empresa", "").with("Nome", "Beta");
        assert_eq!(field_text(&row, Field::CompanyName).as_deref(), Some("Beta"));
    }

    #[test]
    fn test_flags() {
        let row = RawRow::new(2).with("Sem Movimento", "Sim");
        assert_eq!(field_flag(&row, Field::NoActivity), Some(true));
        let row = RawRow::new(2).with("Sem Movimento", "Não");
        assert_eq!(field_flag(&row, Field::NoActivity), Some(false));
        let row = RawRow::new(2);
        assert_eq!(field_flag(&row, Field::NoActivity), None);
    }

    #[test]
    fn test_canonical_header_is_a_synonym() {
        for field in [Field::Period, Field::Outflow, Field::Services, Field::Regime] {
            assert!(field.matches(field.canonical_header()));
        }
    }
}
