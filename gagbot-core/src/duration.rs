//! Mute duration parsing: `<digits><unit>` with unit `m`, `h`, or `w`.

use crate::error::{GagbotError, Result};
use chrono::Duration;

/// Fixed user-facing message for any malformed duration.
pub const DURATION_FORMAT_HINT: &str = "Invalid duration. Use formats like: 10m, 2h, 1w";

/// Parses a duration string matching `^(\d+)([mhw])$` into a [`Duration`].
///
/// The grammar is exact: no surrounding whitespace, no sign, no decimals.
/// Zero-valued spans are rejected: a restriction's expiry must be strictly
/// in the future. Every failure carries the same fixed message.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let (digits, unit) = match input.char_indices().last() {
        Some((idx, unit @ ('m' | 'h' | 'w'))) => (&input[..idx], unit),
        _ => return Err(GagbotError::Input(DURATION_FORMAT_HINT.to_string())),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GagbotError::Input(DURATION_FORMAT_HINT.to_string()));
    }
    let value: i64 = digits
        .parse()
        .map_err(|_| GagbotError::Input(DURATION_FORMAT_HINT.to_string()))?;
    if value == 0 {
        return Err(GagbotError::Input(DURATION_FORMAT_HINT.to_string()));
    }
    Ok(match unit {
        'm' => Duration::minutes(value),
        'h' => Duration::hours(value),
        _ => Duration::weeks(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes_hours_weeks() {
        assert_eq!(parse_duration("1m").unwrap(), Duration::minutes(1));
        assert_eq!(parse_duration("10m").unwrap(), Duration::minutes(10));
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_duration("1w").unwrap(), Duration::weeks(1));
    }

    #[test]
    fn test_parse_scales_by_unit() {
        assert_eq!(parse_duration("3h").unwrap(), Duration::minutes(180));
        assert_eq!(parse_duration("2w").unwrap(), Duration::days(14));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "", "m", "10", "10d", "10 m", " 10m", "10m ", "h10", "1.5h", "-5m", "5mm", "5m5",
        ] {
            let err = parse_duration(bad).unwrap_err();
            assert!(
                matches!(&err, GagbotError::Input(msg) if msg == DURATION_FORMAT_HINT),
                "expected input error for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_parse_rejects_zero() {
        assert!(parse_duration("0m").is_err());
        assert!(parse_duration("0h").is_err());
    }

    #[test]
    fn test_parse_accepts_large_values() {
        assert_eq!(parse_duration("10000m").unwrap(), Duration::minutes(10000));
    }
}
