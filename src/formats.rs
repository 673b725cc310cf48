// src/formats.rs
//! WFDB signal storage format codes.
//!
//! Only the properties of a format that the header engine needs are modeled
//! here: the bit resolution cap each format can represent and whether the
//! format is difference-encoded. Decoding the sample payloads themselves is
//! out of scope for this crate.

use crate::error::{HeaderError, Result};

/// Maximum ADC resolution representable by each format code, in bits.
pub static BIT_RES: [(&str, u32); 10] = [
    ("8", 8),
    ("16", 16),
    ("24", 24),
    ("32", 32),
    ("61", 16),
    ("80", 8),
    ("160", 16),
    ("212", 12),
    ("310", 10),
    ("311", 10),
];

/// Formats that store first differences rather than amplitudes.
pub static DIFFERENCE_FMTS: [&str; 1] = ["8"];

/// The bit-resolution cap declared for a format code.
pub fn bit_resolution(fmt: &str) -> Result<u32> {
    BIT_RES
        .iter()
        .find(|(code, _)| *code == fmt)
        .map(|(_, res)| *res)
        .ok_or_else(|| HeaderError::UnknownFormat(fmt.to_string()))
}

/// Whether a format code is difference-encoded.
pub fn is_difference_fmt(fmt: &str) -> bool {
    DIFFERENCE_FMTS.contains(&fmt)
}

/// The effective ADC resolution implied by a format code when `adc_res`
/// is absent: 10 bits for difference formats, 12 otherwise, capped by
/// what the format can actually represent.
pub fn fmt_resolution(fmt: &str) -> Result<u32> {
    let base = if is_difference_fmt(fmt) { 10 } else { 12 };
    Ok(base.min(bit_resolution(fmt)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_resolution_caps_at_declared_bits() {
        assert_eq!(fmt_resolution("212").unwrap(), 12);
        assert_eq!(fmt_resolution("16").unwrap(), 12);
        assert_eq!(fmt_resolution("310").unwrap(), 10);
        assert_eq!(fmt_resolution("80").unwrap(), 8);
    }

    #[test]
    fn test_difference_format_base_resolution() {
        // fmt 8 is difference-encoded: base 10 bits, capped to 8
        assert!(is_difference_fmt("8"));
        assert_eq!(fmt_resolution("8").unwrap(), 8);
    }

    #[test]
    fn test_unknown_format() {
        match fmt_resolution("999").unwrap_err() {
            HeaderError::UnknownFormat(code) => assert_eq!(code, "999"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
