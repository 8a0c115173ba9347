//! Numeric and string normalization utilities shared by the bank encoders
//!
//! Every width, separator and transliteration here is part of some bank's
//! wire contract; changes must be checked against the encoder tests.

use rust_decimal::{Decimal, RoundingStrategy};

/// Keep only ASCII decimal digits.
pub fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Digits-only value left-padded with zeros to `width`.
///
/// Values already longer than `width` are returned unchanged (the banks
/// reject them server-side; padding never truncates).
pub fn pad_left(s: &str, width: usize) -> String {
    let n = digits(s);
    if n.len() >= width {
        return n;
    }
    format!("{}{}", "0".repeat(width - n.len()), n)
}

/// Transliterate accented Latin characters to their base ASCII letter and
/// drop anything else outside ASCII. Idempotent on ASCII input.
pub fn ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => out.push('a'),
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => out.push('A'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'É' | 'È' | 'Ê' | 'Ë' => out.push('E'),
            'í' | 'ì' | 'î' | 'ï' => out.push('i'),
            'Í' | 'Ì' | 'Î' | 'Ï' => out.push('I'),
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => out.push('o'),
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => out.push('O'),
            'ú' | 'ù' | 'û' | 'ü' => out.push('u'),
            'Ú' | 'Ù' | 'Û' | 'Ü' => out.push('U'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'ñ' => out.push('n'),
            'Ñ' => out.push('N'),
            'ý' | 'ÿ' => out.push('y'),
            'Ý' => out.push('Y'),
            '`' | '^' | '~' | '\'' | '"' => {}
            c if c.is_ascii() => out.push(c),
            _ => {}
        }
    }
    out
}

/// Keep only `[a-zA-Z0-9 ]`, transliterating accents first.
pub fn alphanumeric(s: &str) -> String {
    ascii(s)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

/// First `max` characters of `s` (char-safe).
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Apply a `#`-mask over the digits of `s`, e.g. `("02514010", "#####-###")`
/// yields `"02514-010"`. Trailing mask positions with no digit left are kept
/// as literals only when they are not `#`.
pub fn mask(s: &str, mask: &str) -> String {
    let n = digits(s);
    if n.is_empty() {
        return n;
    }
    let mut src = n.chars();
    let mut out = String::with_capacity(mask.len());
    for m in mask.chars() {
        if m == '#' {
            if let Some(d) = src.next() {
                out.push(d);
            }
        } else {
            out.push(m);
        }
    }
    out
}

/// Landline or mobile classification of a Brazilian phone number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneKind {
    /// Mobile (first subscriber digit 7, 8 or 9)
    Mobile,
    /// Landline
    Landline,
}

/// A phone number split into area code and subscriber number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneParts {
    /// Mobile or landline
    pub kind: PhoneKind,
    /// Two-digit area code (DDD), when present
    pub area: Option<String>,
    /// Subscriber number
    pub number: String,
}

/// Split a free-form phone string into (kind, area code, number).
///
/// Strings of 12+ digits are assumed to carry a country prefix, which is
/// dropped. Returns `None` when no digits remain.
pub fn split_phone(s: &str) -> Option<PhoneParts> {
    let mut n = digits(s);
    if n.is_empty() {
        return None;
    }
    if n.len() >= 12 {
        n = n[2..].to_string();
    }
    let (area, number) = if n.len() >= 10 {
        (Some(n[..2].to_string()), n[2..].to_string())
    } else {
        (None, n)
    };
    let kind = match number.chars().next() {
        Some('7') | Some('8') | Some('9') => PhoneKind::Mobile,
        _ => PhoneKind::Landline,
    };
    Some(PhoneParts { kind, area, number })
}

fn fixed(v: Decimal, dp: u32) -> String {
    let mut r = v.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    r.rescale(dp);
    r.to_string()
}

/// Amount with two decimals and a dot separator: `100` -> `"100.00"`.
pub fn amount_fixed(v: Decimal) -> String {
    fixed(v, 2)
}

/// Amount with two decimals and no separator: `100` -> `"10000"`.
pub fn amount_cents(v: Decimal) -> String {
    fixed(v, 2).replace('.', "")
}

/// Rate with five decimals and a dot separator: `2` -> `"2.00000"`.
pub fn rate_fixed5(v: Decimal) -> String {
    fixed(v, 5)
}

/// Rate with five decimals, dot kept, zero-padded to width 8:
/// `2` -> `"02.00000"`.
pub fn rate_fixed5_padded(v: Decimal) -> String {
    let s = fixed(v, 5);
    if s.len() >= 8 {
        return s;
    }
    format!("{}{}", "0".repeat(8 - s.len()), s)
}

/// Rate with five decimals, separator removed, zero-padded to width 8:
/// `2` -> `"00200000"`.
pub fn rate_plain5_padded(v: Decimal) -> String {
    let s = fixed(v, 5).replace('.', "");
    if s.len() >= 8 {
        return s;
    }
    format!("{}{}", "0".repeat(8 - s.len()), s)
}

/// Whole days between `due` and `reference`, clamped to at least `min`.
///
/// Banks count the incidence window as an absolute day distance; several
/// reject zero, so the floor is bank-specific (1 for Bradesco, 0 for
/// Santander).
pub fn days_since(due: chrono::NaiveDate, reference: chrono::NaiveDate, min: i64) -> i64 {
    (reference - due).num_days().abs().max(min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_digits_strips_everything_else() {
        assert_eq!(digits("02514-010"), "02514010");
        assert_eq!(digits("(11) 98765-4321"), "11987654321");
        assert_eq!(digits(""), "");
    }

    #[test]
    fn test_pad_left_widths() {
        assert_eq!(pad_left("61", 4), "0061");
        assert_eq!(pad_left("3861", 4), "3861");
        assert_eq!(pad_left("41000", 14), "00000000041000");
        // longer than width: unchanged, never truncated
        assert_eq!(pad_left("123456", 4), "123456");
    }

    #[test]
    fn test_ascii_transliteration() {
        assert_eq!(ascii("São Paulo"), "Sao Paulo");
        assert_eq!(ascii("Convênio Inválido"), "Convenio Invalido");
        assert_eq!(ascii("Associação Ltda"), "Associacao Ltda");
    }

    #[test]
    fn test_ascii_idempotent() {
        let once = ascii("Votuporanga — Água Fría");
        assert_eq!(ascii(&once), once);
    }

    #[test]
    fn test_alphanumeric_filter() {
        assert_eq!(alphanumeric("Rua D. Pedro II, 15º"), "Rua D Pedro II 15");
    }

    #[test]
    fn test_mask_postal_code() {
        assert_eq!(mask("02514010", "#####-###"), "02514-010");
        assert_eq!(mask("02514-010", "#####-###"), "02514-010");
        assert_eq!(mask("", "#####-###"), "");
    }

    #[test]
    fn test_split_phone() {
        let p = split_phone("(11) 98765-4321").unwrap();
        assert_eq!(p.kind, PhoneKind::Mobile);
        assert_eq!(p.area.as_deref(), Some("11"));
        assert_eq!(p.number, "987654321");

        let p = split_phone("551130303030").unwrap();
        assert_eq!(p.kind, PhoneKind::Landline);
        assert_eq!(p.area.as_deref(), Some("11"));
        assert_eq!(p.number, "30303030");

        assert!(split_phone("n/a").is_none());
    }

    #[test]
    fn test_amount_formats() {
        assert_eq!(amount_fixed(dec!(100)), "100.00");
        assert_eq!(amount_cents(dec!(100)), "10000");
        assert_eq!(amount_cents(dec!(1234.5)), "123450");
        assert_eq!(rate_fixed5(dec!(2)), "2.00000");
        assert_eq!(rate_fixed5_padded(dec!(2)), "02.00000");
        assert_eq!(rate_plain5_padded(dec!(2)), "00200000");
    }

    #[test]
    fn test_days_since_floor() {
        let due = NaiveDate::from_ymd_opt(2024, 11, 30).unwrap();
        assert_eq!(days_since(due, due, 1), 1);
        assert_eq!(days_since(due, due, 0), 0);
        let later = NaiveDate::from_ymd_opt(2024, 12, 5).unwrap();
        assert_eq!(days_since(due, later, 1), 5);
    }
}
