//! # Wire Timestamps
//!
//! Serde adapters for timestamps exchanged with the backend. Incoming values
//! may be RFC 3339 strings, naive ISO strings (assumed UTC), Firestore-style
//! `{seconds, nanoseconds}` objects or epoch milliseconds. Outgoing values are
//! always RFC 3339 with millisecond precision and a `Z` suffix.
//!
//! Use with `#[serde(with = "crate::core::timestamp")]`, or the `option`
//! submodule for optional fields.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Text(String),
    Firestore {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    Millis(i64),
}

impl WireTimestamp {
    fn into_datetime(self) -> Result<DateTime<Utc>, String> {
        match self {
            WireTimestamp::Text(text) => parse_text(&text),
            WireTimestamp::Firestore {
                seconds,
                nanoseconds,
            } => Utc
                .timestamp_opt(seconds, nanoseconds)
                .single()
                .ok_or_else(|| format!("timestamp out of range: {seconds}s {nanoseconds}ns")),
            WireTimestamp::Millis(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| format!("timestamp out of range: {millis}ms")),
        }
    }
}

/// Parse a textual timestamp, accepting RFC 3339 and naive ISO forms
pub fn parse_text(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(format!("invalid timestamp '{text}'"))
}

/// Format a timestamp the way the backend expects it
pub fn to_wire(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_wire(dt))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    WireTimestamp::deserialize(deserializer)?
        .into_datetime()
        .map_err(D::Error::custom)
}

pub mod option {
    use super::*;
    use serde::de::Error as _;

    pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(dt) => serializer.serialize_some(&to_wire(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<WireTimestamp>::deserialize(deserializer)?
            .map(|wire| wire.into_datetime().map_err(D::Error::custom))
            .transpose()
    }
}
