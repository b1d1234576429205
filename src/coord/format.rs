use std::fmt::Write;

use crate::error::{GeoJsonEncoderError, Result};

/// Parses coordinate tokens and formats coordinate values as JSON number literals.
///
/// Each writer owns its formatter, including the scratch buffer the formatted text is written
/// to.
#[derive(Debug, Clone, Default)]
pub struct CoordinateFormatter {
    precision: usize,
    scratch: String,
}

impl CoordinateFormatter {
    /// `precision` is the number of fraction digits to keep, `0` writes the shortest
    /// representation that round-trips.
    pub fn new(precision: usize) -> Self {
        Self {
            precision,
            scratch: String::with_capacity(32),
        }
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Parses a coordinate token. Non-numeric and non-finite values are rejected.
    pub fn parse(token: &str) -> Result<f64> {
        match lexical_core::parse::<f64>(token.as_bytes()) {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(GeoJsonEncoderError::MalformedCoordinate {
                token: token.to_string(),
            }),
        }
    }

    /// Formats `value` as a JSON number. The returned text is valid until the next call.
    pub fn format(&mut self, value: f64) -> Result<&str> {
        if !value.is_finite() {
            return Err(GeoJsonEncoderError::MalformedCoordinate {
                token: value.to_string(),
            });
        }
        // normalizes -0.0
        let value = if value == 0.0 { 0.0 } else { value };

        self.scratch.clear();
        if self.precision == 0 {
            let mut buffer = [0u8; lexical_core::BUFFER_SIZE];
            let written = lexical_core::write(value, &mut buffer);
            let text = std::str::from_utf8(written).map_err(|err| {
                GeoJsonEncoderError::MalformedCoordinate {
                    token: err.to_string(),
                }
            })?;
            self.scratch.push_str(text);
        } else {
            write!(self.scratch, "{:.*}", self.precision, value).map_err(|err| {
                GeoJsonEncoderError::MalformedCoordinate {
                    token: err.to_string(),
                }
            })?;
            let trimmed = self.scratch.trim_end_matches('0').len();
            self.scratch.truncate(trimmed);
            if self.scratch.ends_with('.') {
                self.scratch.push('0');
            }
            if self.scratch == "-0.0" {
                self.scratch.remove(0);
            }
        }
        Ok(&self.scratch)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shortest_representation() {
        let mut formatter = CoordinateFormatter::new(0);
        assert_eq!(formatter.format(7.0).unwrap(), "7.0");
        assert_eq!(formatter.format(50.0).unwrap(), "50.0");
        assert_eq!(formatter.format(-0.125).unwrap(), "-0.125");
        assert_eq!(formatter.format(-0.0).unwrap(), "0.0");
    }

    #[test]
    fn precision_rounds_and_trims() {
        let mut formatter = CoordinateFormatter::new(3);
        assert_eq!(formatter.format(7.123456).unwrap(), "7.123");
        assert_eq!(formatter.format(7.1).unwrap(), "7.1");
        assert_eq!(formatter.format(7.0).unwrap(), "7.0");
        assert_eq!(formatter.format(2.9999).unwrap(), "3.0");
        assert_eq!(formatter.format(-0.0001).unwrap(), "0.0");
    }

    #[test]
    fn output_is_json_number() {
        let mut formatter = CoordinateFormatter::new(0);
        for value in [1e-9, 1e21, 123456.789, -3.5e-12] {
            let text = formatter.format(value).unwrap().to_string();
            let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed.as_f64().unwrap(), value);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(CoordinateFormatter::parse("12.5").unwrap(), 12.5);
        assert_eq!(CoordinateFormatter::parse("-3e2").unwrap(), -300.0);
        assert!(CoordinateFormatter::parse("12,5a").is_err());
        assert!(CoordinateFormatter::parse("NaN").is_err());
        assert!(CoordinateFormatter::parse("").is_err());
    }
}
