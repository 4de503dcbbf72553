//! Human-readable duration formatting and parsing utilities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),
}

/// Duration wrapper with human-readable parsing ("500ms", "30s", "24h")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct DurationStr(pub Duration);

impl DurationStr {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn to_human_readable(&self) -> String {
        let ms = self.0.as_millis() as u64;
        const UNITS: &[(&str, u64)] = &[
            ("ms", 1),
            ("s", 1000),
            ("m", 60 * 1000),
            ("h", 3600 * 1000),
            ("d", 86400 * 1000),
        ];

        for &(unit, divisor) in UNITS.iter().rev() {
            if ms >= divisor && ms % divisor == 0 {
                return format!("{}{}", ms / divisor, unit);
            }
        }

        format!("{}ms", ms)
    }
}

impl From<DurationStr> for String {
    fn from(value: DurationStr) -> Self {
        value.to_human_readable()
    }
}

impl<'de> Deserialize<'de> for DurationStr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DurationStrVisitor;

        impl<'de> serde::de::Visitor<'de> for DurationStrVisitor {
            type Value = DurationStr;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as string (e.g., \"500ms\", \"30s\") or integer milliseconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(DurationStr::from_millis(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(DurationStr::from_millis)
                    .map_err(|_| serde::de::Error::custom("negative duration"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<DurationStr>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(DurationStrVisitor)
    }
}

impl FromStr for DurationStr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        // Plain number means milliseconds
        if let Ok(num) = s.parse::<u64>() {
            return Ok(DurationStr::from_millis(num));
        }

        let (num_str, unit) = if let Some(pos) = s.find(|c: char| !c.is_ascii_digit()) {
            (&s[..pos], &s[pos..])
        } else {
            return Err(ParseError::InvalidFormat(s.to_string()));
        };

        if num_str.is_empty() {
            return Err(ParseError::InvalidFormat(s.to_string()));
        }

        let num: u64 = num_str.parse()?;

        let multiplier_ms = match unit.trim() {
            "ms" => 1,
            "s" | "sec" => 1000,
            "m" | "min" => 60 * 1000,
            "h" | "hr" => 3600 * 1000,
            "d" => 86400 * 1000,
            _ => return Err(ParseError::InvalidUnit(unit.to_string())),
        };

        Ok(DurationStr::from_millis(num * multiplier_ms))
    }
}

impl fmt::Display for DurationStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_millis() {
        assert_eq!("500".parse::<DurationStr>().unwrap().0, Duration::from_millis(500));
        assert_eq!("500ms".parse::<DurationStr>().unwrap().0, Duration::from_millis(500));
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!("30s".parse::<DurationStr>().unwrap().0, Duration::from_secs(30));
        assert_eq!("30sec".parse::<DurationStr>().unwrap().0, Duration::from_secs(30));
    }

    #[test]
    fn test_parse_minutes_hours_days() {
        assert_eq!("5m".parse::<DurationStr>().unwrap().0, Duration::from_secs(300));
        assert_eq!("24h".parse::<DurationStr>().unwrap().0, Duration::from_secs(86400));
        assert_eq!("7d".parse::<DurationStr>().unwrap().0, Duration::from_secs(7 * 86400));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<DurationStr>().is_err());
        assert!("s".parse::<DurationStr>().is_err());
        assert!("10y".parse::<DurationStr>().is_err());
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(DurationStr::from_millis(500).to_human_readable(), "500ms");
        assert_eq!(DurationStr::from_millis(30_000).to_human_readable(), "30s");
        assert_eq!(DurationStr::from_millis(3_600_000).to_human_readable(), "1h");
        assert_eq!(DurationStr::from_millis(1500).to_human_readable(), "1500ms");
    }

    #[test]
    fn test_deserialize_string() {
        #[derive(Deserialize)]
        struct TestStruct {
            delay: DurationStr,
        }
        let parsed: TestStruct = serde_json::from_str(r#"{"delay": "2s"}"#).unwrap();
        assert_eq!(parsed.delay.as_duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_deserialize_number() {
        #[derive(Deserialize)]
        struct TestStruct {
            delay: DurationStr,
        }
        let parsed: TestStruct = serde_json::from_str(r#"{"delay": 250}"#).unwrap();
        assert_eq!(parsed.delay.as_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", DurationStr::from_millis(60_000)), "1m");
    }
}
