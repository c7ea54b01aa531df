//! Serde adapters that keep explicit optionals in memory and zero sentinels
//! on the wire.
//!
//! | Field | In memory | On the wire |
//! |-------|-----------|-------------|
//! | policy id | `Option<String>` | `""` when unset |
//! | expiry date | `Option<OffsetDateTime>` | RFC 3339, `0001-01-01T00:00:00Z` when unset |
//! | expiry period | `Option<Duration>` | integer nanoseconds, `0` when unset |

use time::format_description::well_known::Rfc3339;
use time::{Month, OffsetDateTime, Time, UtcOffset};

use crate::core::{Error, Result};

/// Wire form of an unset instant.
pub const UNSET_INSTANT: &str = "0001-01-01T00:00:00Z";

/// Parses an RFC 3339 instant and normalizes it to UTC.
pub fn parse_instant(input: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(input, &Rfc3339)
        .map(|instant| instant.to_offset(UtcOffset::UTC))
        .map_err(|_| Error::Parse {
            input: input.to_string(),
        })
}

pub fn format_instant(instant: OffsetDateTime) -> std::result::Result<String, time::error::Format> {
    instant.to_offset(UtcOffset::UTC).format(&Rfc3339)
}

fn is_unset_instant(instant: OffsetDateTime) -> bool {
    let utc = instant.to_offset(UtcOffset::UTC);
    utc.year() == 1
        && utc.month() == Month::January
        && utc.day() == 1
        && utc.time() == Time::MIDNIGHT
}

pub mod policy_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(if raw.is_empty() { None } else { Some(raw) })
    }
}

pub mod expiry_date {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::{OffsetDateTime, UtcOffset};

    use super::{format_instant, is_unset_instant, UNSET_INSTANT};

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(instant) => {
                let text = format_instant(*instant).map_err(S::Error::custom)?;
                serializer.serialize_str(&text)
            }
            None => serializer.serialize_str(UNSET_INSTANT),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let instant = OffsetDateTime::parse(&raw, &Rfc3339).map_err(D::Error::custom)?;
        if is_unset_instant(instant) {
            return Ok(None);
        }
        Ok(Some(instant.to_offset(UtcOffset::UTC)))
    }
}

pub mod expiry_period {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let nanos = match value {
            Some(period) => i64::try_from(period.as_nanos())
                .map_err(|_| S::Error::custom("expiry period exceeds i64 nanoseconds"))?,
            None => 0,
        };
        serializer.serialize_i64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let nanos = i64::deserialize(deserializer)?;
        match nanos {
            0 => Ok(None),
            n if n < 0 => Err(D::Error::custom(format!("negative expiry period {n}"))),
            n => Ok(Some(Duration::from_nanos(n as u64))),
        }
    }
}

pub mod timestamp {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::{OffsetDateTime, UtcOffset};

    use super::format_instant;

    pub fn serialize<S: Serializer>(
        value: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let text = format_instant(*value).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&raw, &Rfc3339)
            .map(|instant| instant.to_offset(UtcOffset::UTC))
            .map_err(D::Error::custom)
    }
}
