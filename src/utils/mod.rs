//! Display formatting for Brazilian money and document numbers

use rust_decimal::Decimal;

/// Brazilian number formatting: `.` thousands, `,` decimals, two places.
///
/// # Examples
/// ```
/// use escritorio::utils::format_decimal_br;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_decimal_br(dec!(1234567.89)), "1.234.567,89");
/// assert_eq!(format_decimal_br(dec!(-50.5)), "-50,50");
/// ```
pub fn format_decimal_br(value: Decimal) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (integer, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if value.is_sign_negative() && !value.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{},{}", sign, grouped, fraction)
}

/// "R$ 1.234,56"
pub fn format_currency(value: Decimal) -> String {
    format!("R$ {}", format_decimal_br(value))
}

/// Currency for a figure that may be absent; absence is not zero
pub fn format_figure(value: Option<Decimal>) -> String {
    value.map(format_currency).unwrap_or_else(|| "-".to_string())
}

/// "12.345.678/0001-95" for a 14-digit CNPJ; anything else verbatim
pub fn format_cnpj(cnpj: &str) -> String {
    if cnpj.len() != 14 || !cnpj.chars().all(|c| c.is_ascii_digit()) {
        return cnpj.to_string();
    }
    format!(
        "{}.{}.{}/{}-{}",
        &cnpj[0..2],
        &cnpj[2..5],
        &cnpj[5..8],
        &cnpj[8..12],
        &cnpj[12..14]
    )
}
