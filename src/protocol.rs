//! ==============================================================================
//! protocol.rs - greenhouse node wire format
//! ==============================================================================
//!
//! one message per line, ten comma-separated decimals in this order:
//!
//!     tDHT22,tDHT11,tLM35_1,tLM35_2,soil1,soil2,soil3,hDHT22,hDHT11,avgTemp
//!
//! no framing beyond the newline, no acknowledgement.
//!
//! ==============================================================================

use crate::domain::Reading;
use thiserror::Error;

/// number of comma-separated fields in a well-formed line
pub const FIELD_COUNT: usize = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("wrong number of fields: expected {expected}, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("field {index} is not a finite number: {value:?}")]
    InvalidNumber { index: usize, value: String },

    #[error("line exceeds {limit} bytes")]
    TooLong { limit: usize },

    #[error("line is not valid utf-8")]
    InvalidUtf8,

    #[error("connection closed before the line was terminated")]
    Unterminated,
}

/// parse one wire line into a reading stamped with `timestamp_ms`
///
/// the line must already have its terminator removed. fields are trimmed,
/// so `"24.1, 23.9, ..."` is accepted.
pub fn parse_line(line: &str, timestamp_ms: u64) -> Result<Reading, ParseError> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount {
            expected: FIELD_COUNT,
            found: parts.len(),
        });
    }

    let mut values = [0.0f64; FIELD_COUNT];
    for (index, part) in parts.iter().enumerate() {
        let raw = part.trim();
        values[index] = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::InvalidNumber {
                index,
                value: raw.to_string(),
            })?;
    }

    let [t_dht22, t_dht11, t_lm35_1, t_lm35_2, soil1, soil2, soil3, h_dht22, h_dht11, avg] = values;
    Ok(Reading {
        timestamp_ms,
        temperature_dht22: t_dht22,
        temperature_dht11: t_dht11,
        temperature_lm35_1: t_lm35_1,
        temperature_lm35_2: t_lm35_2,
        soil_moisture_1: soil1,
        soil_moisture_2: soil2,
        soil_moisture_3: soil3,
        humidity_dht22: h_dht22,
        humidity_dht11: h_dht11,
        average_temperature: avg,
    })
}

/// strip the line terminator (`\n` or `\r\n`) and surrounding whitespace
pub fn clean_line(raw: &str) -> &str {
    raw.trim_end_matches(['\n', '\r']).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "24.5,24.0,25.1,25.3,51.0,52.5,49.9,60.2,58.7,24.725";

    #[test]
    fn test_parse_well_formed() {
        let r = parse_line(GOOD, 42).unwrap();
        assert_eq!(r.timestamp_ms, 42);
        assert_eq!(r.temperature_dht22, 24.5);
        assert_eq!(r.temperature_lm35_2, 25.3);
        assert_eq!(r.soil_moisture_3, 49.9);
        assert_eq!(r.humidity_dht11, 58.7);
        assert_eq!(r.average_temperature, 24.725);
    }

    #[test]
    fn test_parse_trims_fields() {
        let r = parse_line(" 1, 2 ,3,4,5,6,7,8,9, -10 ", 0).unwrap();
        assert_eq!(r.temperature_dht22, 1.0);
        assert_eq!(r.temperature_dht11, 2.0);
        assert_eq!(r.average_temperature, -10.0);
    }

    #[test]
    fn test_parse_wrong_field_count() {
        assert_eq!(
            parse_line("1,2,3,4,5,6,7,8,9", 0),
            Err(ParseError::FieldCount { expected: 10, found: 9 })
        );
        assert_eq!(
            parse_line("1,2,3,4,5,6,7,8,9,10,11", 0),
            Err(ParseError::FieldCount { expected: 10, found: 11 })
        );
    }

    #[test]
    fn test_parse_non_numeric() {
        let err = parse_line("1,2,3,abc,5,6,7,8,9,10", 0).unwrap_err();
        assert_eq!(err, ParseError::InvalidNumber { index: 3, value: "abc".into() });

        // empty field between commas
        let err = parse_line("1,2,3,4,,6,7,8,9,10", 0).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { index: 4, .. }));
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert!(parse_line("NaN,2,3,4,5,6,7,8,9,10", 0).is_err());
        assert!(parse_line("1,2,3,4,5,6,7,8,9,inf", 0).is_err());
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("1,2\r\n"), "1,2");
        assert_eq!(clean_line("  \n"), "");
    }
}
