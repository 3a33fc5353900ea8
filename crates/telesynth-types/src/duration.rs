//! Duration strings of the form `<int><unit>`, unit one of `s`, `m`, `h`, `d`.

use std::time::Duration;
use thiserror::Error;

/// Errors from [`parse_duration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("empty duration string")]
    Empty,

    #[error("duration {0:?} is missing its numeric part")]
    MissingAmount(String),

    #[error("duration {input:?} has unknown unit {unit:?} (expected s, m, h or d)")]
    UnknownUnit { input: String, unit: String },

    #[error("duration {0:?} has an invalid amount")]
    InvalidAmount(String),

    #[error("duration {0:?} overflows")]
    Overflow(String),
}

/// Parse `<int><unit>` into a [`Duration`].
///
/// Whitespace around the input is ignored. `0s` is accepted; callers that
/// need a positive duration check for zero themselves.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| DurationParseError::UnknownUnit {
            input: trimmed.to_string(),
            unit: String::new(),
        })?;
    let (amount, unit) = trimmed.split_at(split);

    if amount.is_empty() {
        return Err(DurationParseError::MissingAmount(trimmed.to_string()));
    }

    let multiplier: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other if other.starts_with(|c: char| c.is_ascii_punctuation()) => {
            return Err(DurationParseError::InvalidAmount(trimmed.to_string()))
        }
        other => {
            return Err(DurationParseError::UnknownUnit {
                input: trimmed.to_string(),
                unit: other.to_string(),
            })
        }
    };

    let amount: u64 = amount
        .parse()
        .map_err(|_| DurationParseError::Overflow(trimmed.to_string()))?;
    let secs = amount
        .checked_mul(multiplier)
        .ok_or_else(|| DurationParseError::Overflow(trimmed.to_string()))?;

    Ok(Duration::from_secs(secs))
}

/// Render a duration in the same grammar, using the largest exact unit.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }

    for (unit, size) in [("d", 86_400), ("h", 3_600), ("m", 60)] {
        if secs % size == 0 {
            return format!("{}{}", secs / size, unit);
        }
    }

    format!("{}s", secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration(" 7d ").unwrap(), Duration::from_secs(604_800));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_duration(""), Err(DurationParseError::Empty));
        assert!(matches!(
            parse_duration("h"),
            Err(DurationParseError::MissingAmount(_))
        ));
        assert!(matches!(
            parse_duration("10w"),
            Err(DurationParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_duration("0x"),
            Err(DurationParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_duration("60"),
            Err(DurationParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_duration("1.5h"),
            Err(DurationParseError::InvalidAmount(_))
        ));
        assert!(matches!(
            parse_duration("-5m"),
            Err(DurationParseError::MissingAmount(_))
        ));
        assert!(matches!(
            parse_duration("99999999999999999999d"),
            Err(DurationParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_format_picks_largest_unit() {
        assert_eq!(format_duration(Duration::from_secs(1)), "1s");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_secs(900)), "15m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(172_800)), "2d");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
