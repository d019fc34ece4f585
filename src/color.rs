use image::Rgba;
use thiserror::Error;

/// Opaque white, used whenever a color string cannot be understood.
pub const FALLBACK_HEX: &str = "FFFFFFFF";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("color string is empty")]
    Empty,

    #[error("invalid hex character {0:?} in color string")]
    InvalidCharacter(char),

    #[error("color must be 6 (RGB) or 8 (ARGB) hex digits, got {0}")]
    InvalidLength(usize),
}

fn strip_prefixes(color: &str) -> &str {
    let color = color.trim();
    let color = color.strip_prefix('#').unwrap_or(color);
    color
        .strip_prefix("0x")
        .or_else(|| color.strip_prefix("0X"))
        .unwrap_or(color)
}

/// Strip `#` / `0x` prefixes and check the remaining digits.
///
/// Accepts `RRGGBB` and `AARRGGBB` (alpha first). Returns the bare digits.
pub fn parse_hex(color: &str) -> Result<&str, ColorError> {
    let digits = strip_prefixes(color);
    if digits.is_empty() {
        return Err(ColorError::Empty);
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidCharacter(bad));
    }
    match digits.len() {
        6 | 8 => Ok(digits),
        other => Err(ColorError::InvalidLength(other)),
    }
}

pub fn validate(color: &str) -> bool {
    parse_hex(color).is_ok()
}

/// Canonical hex digits for `color`, or [`FALLBACK_HEX`] when it is invalid.
pub fn encode(color: &str) -> String {
    match parse_hex(color) {
        Ok(digits) => digits.to_string(),
        Err(e) => {
            tracing::warn!(color, error = %e, "Invalid color, falling back to white");
            FALLBACK_HEX.to_string()
        }
    }
}

pub fn encode_or_default(color: Option<&str>) -> String {
    color.map(encode).unwrap_or_else(|| FALLBACK_HEX.to_string())
}

pub fn parse_rgba(color: &str) -> Result<Rgba<u8>, ColorError> {
    let digits = parse_hex(color)?;
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0xFF);

    Ok(if digits.len() == 6 {
        Rgba([byte(0), byte(2), byte(4), 0xFF])
    } else {
        Rgba([byte(2), byte(4), byte(6), byte(0)])
    })
}

/// Engine color syntax is `0xRRGGBBAA`.
pub fn to_engine_color(color: &Rgba<u8>) -> String {
    let [r, g, b, a] = color.0;
    format!("0x{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
}
