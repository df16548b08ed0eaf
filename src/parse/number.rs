//! Lenient number parsing for noisy page fragments.
//!
//! Everything outside the outermost digits is trimmed; inside, digits and
//! the first decimal point are kept and all other characters (thousand
//! separators, spaces) are dropped, so adjacent digit runs merge.

use crate::types::ParseError;

/// Decimal places rendered before trailing zeros are trimmed.
const CANONICAL_PRECISION: usize = 6;

/// Convert noisy text such as `"ttt 12,300. zzz"` into a number.
pub fn to_number(data: &str) -> Result<f64, ParseError> {
    let bytes = data.as_bytes();
    let left = bytes
        .iter()
        .position(|b| b.is_ascii_digit())
        .ok_or_else(|| ParseError::NoDigits(data.to_string()))?;
    let right = bytes
        .iter()
        .rposition(|b| b.is_ascii_digit())
        .map_or(left, |i| i + 1);

    let mut buffer = String::with_capacity(right - left);
    let mut dot_found = false;
    for &b in &bytes[left..right] {
        match b {
            b'0'..=b'9' => buffer.push(char::from(b)),
            b'.' if dot_found => return Err(ParseError::InvalidNumber(data.to_string())),
            b'.' => {
                dot_found = true;
                buffer.push('.');
            }
            _ => {}
        }
    }

    buffer
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(data.to_string()))
}

/// Render a number in the form used for storage and comparison:
/// fixed precision with trailing zeros and a dangling point removed.
pub fn canonical_number(value: f64) -> String {
    let rendered = format!("{value:.prec$}", prec = CANONICAL_PRECISION);
    if rendered.contains('.') {
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        rendered
    }
}
