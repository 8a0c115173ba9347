//! Shared boleto numerics: digitable line and barcode layouts, mod-11
//!
//! The 47-digit digitable line and the 44-digit barcode are two encodings
//! of the same data (FEBRABAN layout). Some banks only return one of them,
//! so the other is derived locally.

use crate::{Error, Result};

/// Convert a 47-digit digitable line into the 44-digit barcode.
///
/// Digitable layout (0-indexed): field 1 = 0..10 (check digit at 9),
/// field 2 = 10..21 (check digit at 20), field 3 = 21..32 (check digit at
/// 31), field 4 = general check digit at 32, field 5 = 33..47 (due-date
/// factor + amount). The barcode drops the three field check digits and
/// reorders: bank+currency, general check digit, factor+amount, free field.
pub fn digitable_to_barcode(digitable: &str) -> Result<String> {
    let d: String = digitable.chars().filter(|c| c.is_ascii_digit()).collect();
    if d.len() != 47 {
        return Err(Error::Encoding(format!(
            "Digitable line must have 47 digits, got {}",
            d.len()
        )));
    }

    let mut barcode = String::with_capacity(44);
    barcode.push_str(&d[0..4]); // bank (3) + currency (1)
    barcode.push_str(&d[32..33]); // general check digit
    barcode.push_str(&d[33..47]); // due-date factor (4) + amount (10)
    barcode.push_str(&d[4..9]); // free field, part 1
    barcode.push_str(&d[10..20]); // free field, part 2
    barcode.push_str(&d[21..31]); // free field, part 3

    Ok(barcode)
}

/// Mod-11 check digit over a digit string.
///
/// Weights cycle 2..=9 from the rightmost digit; remainders that would
/// produce 10 or 11 collapse to 0.
pub fn mod11_digit(number: &str) -> u32 {
    let mut weight = 2u32;
    let mut sum = 0u32;
    for c in number.chars().rev().filter(|c| c.is_ascii_digit()) {
        sum += c.to_digit(10).unwrap_or(0) * weight;
        weight = if weight == 9 { 2 } else { weight + 1 };
    }
    let dv = 11 - (sum % 11);
    if dv >= 10 {
        0
    } else {
        dv
    }
}
