/// Utility functions and helpers
use std::time::Duration;

/// Serde adapter for durations written as (possibly fractional) milliseconds
pub mod duration_ms {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        super::millis_to_duration(millis).map_err(D::Error::custom)
    }
}

/// Same as [`duration_ms`] for optional fields; pair with `#[serde(default)]`
pub mod option_duration_ms {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_nanos() as f64 / 1_000_000.0)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<f64>::deserialize(deserializer)? {
            Some(millis) => super::millis_to_duration(millis)
                .map(Some)
                .map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// Convert a millisecond reading into a `Duration`, rejecting negative and non-finite values
pub fn millis_to_duration(millis: f64) -> Result<Duration, String> {
    if !millis.is_finite() || millis < 0.0 {
        return Err(format!("invalid millisecond value: {}", millis));
    }
    Ok(Duration::from_nanos((millis * 1_000_000.0).round() as u64))
}

/// Format duration for human-readable output
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_nanos() as f64 / 1_000_000.0;
    if millis < 1000.0 {
        format!("{:.1}ms", millis)
    } else {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{:.2}s", duration.as_secs_f64())
        } else {
            format!("{}m{}s", secs / 60, secs % 60)
        }
    }
}

/// Parse a `key=value,key=value` list into pairs
pub fn parse_pairs(input: &str) -> Result<Vec<(String, String)>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split(',')
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("empty key in '{}'", pair));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
