use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::schema::DeclaredType;

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%m-%d-%Y", "%Y%m%d",
    ];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %I:%M:%S %p",
        "%m/%d/%Y %I:%M %p",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_utc());
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

pub fn parse_temporal(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(date) = parse_naive_date(trimmed) {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default());
    }
    parse_naive_datetime(trimmed)
        .with_context(|| format!("Failed to parse '{trimmed}' as date or datetime"))
}

pub fn parse_integer(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Ok(parsed);
    }
    // Spreadsheet cells often carry integers as `12.0`.
    let decimal = Decimal::from_str(trimmed)
        .with_context(|| format!("Failed to parse '{trimmed}' as integer"))?;
    if !decimal.fract().is_zero() {
        bail!("Failed to parse '{trimmed}' as integer: fractional part present");
    }
    i64::try_from(decimal).with_context(|| format!("Integer '{trimmed}' out of range"))
}

pub fn parse_decimal(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .or_else(|_| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .and_then(Decimal::from_f64_retain)
                .ok_or_else(|| anyhow!("Failed to parse '{trimmed}' as decimal"))
        })
}

/// Accepts `0`, `1`, `true`, `false` in any case, plus the numeric forms
/// `0.0` and `1.0` that spreadsheet readers produce.
pub fn parse_bit(value: &str) -> Result<bool> {
    let lowered = value.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => match other.parse::<f64>() {
            Ok(number) if number == 1.0 => Ok(true),
            Ok(number) if number == 0.0 => Ok(false),
            _ => bail!("Failed to parse '{value}' as bit"),
        },
    }
}

/// Checks that a non-blank value coerces to `ty`. Text is never coerced.
pub fn coerce(value: &str, ty: DeclaredType) -> Result<()> {
    match ty {
        DeclaredType::Integer => parse_integer(value).map(|_| ()),
        DeclaredType::Decimal => parse_decimal(value).map(|_| ()),
        DeclaredType::Boolean => parse_bit(value).map(|_| ()),
        DeclaredType::Temporal => parse_temporal(value).map(|_| ()),
        DeclaredType::Text => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_naive_date_supports_multiple_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();
        assert_eq!(parse_naive_date("2024-05-16").unwrap(), expected);
        assert_eq!(parse_naive_date("05/16/2024").unwrap(), expected);
        assert_eq!(parse_naive_date("2024/05/16").unwrap(), expected);
        assert!(parse_naive_date("May the fourth").is_err());
    }

    #[test]
    fn parse_temporal_accepts_dates_datetimes_and_rfc3339() {
        assert!(parse_temporal("2024-05-06").is_ok());
        assert!(parse_temporal(" 2024-05-06 14:30:00 ").is_ok());
        assert!(parse_temporal("2024-05-06T14:30:00.250").is_ok());
        assert!(parse_temporal("2024-05-06T14:30:00Z").is_ok());
        assert!(parse_temporal("5/6/2024 2:30 PM").is_ok());
        assert!(parse_temporal("yesterday").is_err());
    }

    #[test]
    fn parse_integer_accepts_integral_decimals_only() {
        assert_eq!(parse_integer(" 42 ").unwrap(), 42);
        assert_eq!(parse_integer("12.0").unwrap(), 12);
        assert!(parse_integer("12.5").is_err());
        assert!(parse_integer("twelve").is_err());
    }

    #[test]
    fn parse_decimal_accepts_scientific_notation() {
        assert_eq!(parse_decimal("19.99").unwrap().to_string(), "19.99");
        assert!(parse_decimal("1.5e3").is_ok());
        assert!(parse_decimal("$19.99").is_err());
        assert!(parse_decimal("NaN").is_err());
    }

    #[test]
    fn parse_bit_is_case_insensitive() {
        assert!(parse_bit("TRUE").unwrap());
        assert!(!parse_bit("0").unwrap());
        assert!(parse_bit("1.0").unwrap());
        assert!(parse_bit("Maybe").is_err());
        assert!(parse_bit("yes").is_err());
        assert!(parse_bit("2").is_err());
    }

    #[test]
    fn coerce_never_rejects_text() {
        assert!(coerce("anything at all", DeclaredType::Text).is_ok());
        assert!(coerce("abc", DeclaredType::Integer).is_err());
    }
}
