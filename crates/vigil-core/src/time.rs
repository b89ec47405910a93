//! Timestamp parsing and rendering shared by the status document and the
//! reporting projections.
//!
//! Status documents have been written by more than one generation of the
//! evaluator, so parsing accepts RFC 3339 as well as the space-separated
//! `YYYY-MM-DD HH:MM:SS[.fff]` form, and treats an empty string as absent.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Parse a timestamp in any of the accepted document formats.
pub fn parse_timestamp(s: &str) -> Result<Option<DateTime<Utc>>> {
  let s = s.trim();
  if s.is_empty() {
    return Ok(None);
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(Some(dt.with_timezone(&Utc)));
  }
  NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
    .map(|naive| Some(naive.and_utc()))
    .map_err(|_| Error::InvalidTimestamp(s.to_owned()))
}

/// Render an absolute timestamp as `YYYY-MM-DD HH:MM:SS` with up to five
/// fractional digits. Trailing zeros are trimmed and the dot is dropped when
/// nothing remains, so whole seconds render without a fraction.
///
/// Timestamps are normalized to UTC on parse, so the wall clock shown is
/// always UTC whatever offset the document was written with.
pub fn format_sendable_time(dt: DateTime<Utc>) -> String {
  let base = dt.format("%Y-%m-%d %H:%M:%S").to_string();
  let fraction = dt.timestamp_subsec_nanos() / 10_000;
  if fraction == 0 {
    return base;
  }
  let digits = format!("{fraction:05}");
  format!("{base}.{}", digits.trim_end_matches('0'))
}

/// The canonical encoding for timestamps written back into documents.
pub fn encode_timestamp(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ─── Free-form document times ────────────────────────────────────────────────

/// A timestamp from a free-form document field.
///
/// Text in a recognised format is parsed; anything else is kept verbatim so
/// one odd field cannot make the surrounding document unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentTime {
  Parsed(DateTime<Utc>),
  Verbatim(String),
}

impl DocumentTime {
  /// Parse `raw`, keeping the text when no format matches. Blank text is
  /// absent.
  pub fn from_text(raw: &str) -> Option<Self> {
    match parse_timestamp(raw) {
      Ok(parsed) => parsed.map(Self::Parsed),
      Err(_) => Some(Self::Verbatim(raw.to_owned())),
    }
  }

  pub fn parsed(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Parsed(dt) => Some(*dt),
      Self::Verbatim(_) => None,
    }
  }
}

impl From<DateTime<Utc>> for DocumentTime {
  fn from(dt: DateTime<Utc>) -> Self { Self::Parsed(dt) }
}

impl fmt::Display for DocumentTime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Parsed(dt) => f.write_str(&format_sendable_time(*dt)),
      Self::Verbatim(raw) => f.write_str(raw),
    }
  }
}

impl Serialize for DocumentTime {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Parsed(dt) => serializer.serialize_str(&encode_timestamp(*dt)),
      Self::Verbatim(raw) => serializer.serialize_str(raw),
    }
  }
}

/// Deserialize an optional [`DocumentTime`], reading `null` and blank text
/// as absent.
pub fn document_time<'de, D>(deserializer: D) -> Result<Option<DocumentTime>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(
    Option::<String>::deserialize(deserializer)?
      .and_then(|raw| DocumentTime::from_text(&raw)),
  )
}

/// Serde adapter for `Option<DateTime<Utc>>` fields using
/// [`parse_timestamp`] on the way in.
pub mod lenient {
  use chrono::{DateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de};

  pub fn serialize<S>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match value {
      Some(dt) => serializer.serialize_str(&super::encode_timestamp(*dt)),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D,
  ) -> Result<Option<DateTime<Utc>>, D::Error>
  where
    D: Deserializer<'de>,
  {
    match Option::<String>::deserialize(deserializer)? {
      Some(raw) => super::parse_timestamp(&raw).map_err(de::Error::custom),
      None => Ok(None),
    }
  }
}
