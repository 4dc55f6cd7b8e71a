//! A `Duration` newtype with human-readable (de)serialization (`"60s"`, `"5m"`, `"10h"`),
//! used for every timeout/backoff/interval knob in the engine's configuration and CRDs.
use std::{fmt, ops::Deref, str::FromStr, time::Duration as StdDuration};

use serde::{Deserialize, Serialize, de::Visitor};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[snafu(display("failed to parse {input:?} as a duration"))]
pub struct ParseDurationError {
    source: humantime::DurationError,
    input: String,
}

/// A thin wrapper around [`std::time::Duration`] that (de)serializes using the same
/// human-friendly syntax accepted on the command line (`humantime`), e.g. `"30s"`, `"10h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(StdDuration);

impl Duration {
    pub const fn from_std(duration: StdDuration) -> Self {
        Self(duration)
    }

    pub const fn as_std(self) -> StdDuration {
        self.0
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(StdDuration::from_secs(secs))
    }
}

impl Deref for Duration {
    type Target = StdDuration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<StdDuration> for Duration {
    fn from(duration: StdDuration) -> Self {
        Self(duration)
    }
}

impl From<Duration> for StdDuration {
    fn from(duration: Duration) -> Self {
        duration.0
    }
}

impl FromStr for Duration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let std_duration: StdDuration = s
            .parse::<humantime::Duration>()
            .context(ParseDurationSnafu { input: s })?
            .into();
        Ok(Self(std_duration))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a duration string such as \"30s\" or \"10h\"")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse::<Duration>().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(DurationVisitor)
    }
}

impl Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl schemars::JsonSchema for Duration {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "Duration".into()
    }

    fn json_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "description": "A duration in the humantime format, e.g. \"30s\" or \"10h\"",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_display_and_parse() {
        let d: Duration = "90s".parse().unwrap();
        assert_eq!(d.as_std(), StdDuration::from_secs(90));
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-duration".parse::<Duration>().is_err());
    }
}
