//! The alert status document — per-resource escalation state for one alert.
//!
//! The evaluator owns and rewrites a [`StatusDocument`] on every cycle and
//! persists it as a JSON column on the alert row. This crate only reads
//! snapshots of it (see [`crate::projector`]) and supplies the transition
//! rules the evaluator applies to each [`ResourceStatus`] cell (see
//! [`crate::escalation`]).
//!
//! Two generations of the document exist at rest:
//!
//! - **legacy (v1)**: no `version` field; field names may be PascalCase
//!   (`ResourceStatus`, `CurrentLevel`, …) and a document with no tracked
//!   resources stores `null` for the map.
//! - **current (v2)**: `"version": 2`, snake_case field names throughout.
//!
//! Both decode into the same types.

use std::{
  collections::{BTreeMap, VecDeque},
  fmt,
  str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
  Error, Result,
  time::{self, DocumentTime},
};

/// Schema version assumed for documents without a `version` field.
pub const LEGACY_VERSION: u32 = 1;

/// Schema version written by [`StatusDocument::encode`].
pub const CURRENT_VERSION: u32 = 2;

/// Upper bound on [`AggregatedAlerts::last_alert_values`].
pub const MAX_RECORDED_METRICS: usize = 5;

// ─── Level ───────────────────────────────────────────────────────────────────

/// Severity of a resource's alert condition.
///
/// Levels the evaluator emits that are not known here decode into
/// [`AlertLevel::Other`] rather than failing the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AlertLevel {
  /// The non-alerting baseline.
  #[default]
  Cleared,
  Warning,
  Minor,
  Major,
  Critical,
  Other(String),
}

impl AlertLevel {
  /// Every level except [`AlertLevel::Cleared`] counts as a positive.
  pub fn is_positive(&self) -> bool { !matches!(self, Self::Cleared) }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Cleared => "cleared",
      Self::Warning => "warning",
      Self::Minor => "minor",
      Self::Major => "major",
      Self::Critical => "critical",
      Self::Other(level) => level,
    }
  }
}

impl fmt::Display for AlertLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AlertLevel {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s.to_ascii_lowercase().as_str() {
      "cleared" => Self::Cleared,
      "warning" => Self::Warning,
      "minor" => Self::Minor,
      "major" => Self::Major,
      "critical" => Self::Critical,
      _ => Self::Other(s.to_owned()),
    })
  }
}

impl Serialize for AlertLevel {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for AlertLevel {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let Ok(level) = raw.parse::<AlertLevel>();
    Ok(level)
  }
}

// ─── Resource key ────────────────────────────────────────────────────────────

/// Identity of one cell: the rule that produced it and the resource it
/// tracks.
///
/// At rest the key is the string `"<rule_id> <resource_name>"`. Parsing
/// splits on the first space only, so resource names may contain spaces but
/// rule ids may not.
///
/// Stored keys that do not follow that shape still decode, as undelimited
/// keys: they have no rule id, keep their text as the resource name, and
/// belong to no rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
  rule_id:       Option<String>,
  resource_name: String,
}

impl ResourceKey {
  pub fn new(
    rule_id: impl Into<String>,
    resource_name: impl Into<String>,
  ) -> Result<Self> {
    let rule_id = rule_id.into();
    let resource_name = resource_name.into();
    if rule_id.is_empty() || rule_id.contains(' ') {
      return Err(Error::InvalidResourceKey(format!(
        "{rule_id} {resource_name}"
      )));
    }
    Ok(Self { rule_id: Some(rule_id), resource_name })
  }

  /// Split a stored key, falling back to an undelimited key.
  pub fn from_stored(raw: &str) -> Self {
    raw.parse().unwrap_or_else(|_| Self {
      rule_id:       None,
      resource_name: raw.to_owned(),
    })
  }

  /// `None` for an undelimited key.
  pub fn rule_id(&self) -> Option<&str> { self.rule_id.as_deref() }

  pub fn resource_name(&self) -> &str { &self.resource_name }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.rule_id {
      Some(rule_id) => write!(f, "{rule_id} {}", self.resource_name),
      None => f.write_str(&self.resource_name),
    }
  }
}

impl FromStr for ResourceKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.split_once(' ') {
      Some((rule_id, resource_name)) if !rule_id.is_empty() => Ok(Self {
        rule_id:       Some(rule_id.to_owned()),
        resource_name: resource_name.to_owned(),
      }),
      _ => Err(Error::InvalidResourceKey(s.to_owned())),
    }
  }
}

impl Serialize for ResourceKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ResourceKey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(Self::from_stored(&raw))
  }
}

// ─── Aggregation window ──────────────────────────────────────────────────────

/// One metric sample captured when a resource triggered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordedMetric {
  #[serde(default, alias = "RuleName")]
  pub rule_name:     String,
  #[serde(default, alias = "ResourceName")]
  pub resource_name: String,
  /// Raw observed samples, kept opaque; their shape belongs to the metric
  /// source.
  #[serde(default)]
  pub values:        Vec<serde_json::Value>,
}

/// Rolling summary of repeated triggers, condensed into one notification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatedAlerts {
  pub cumulated_count:   u32,
  #[serde(deserialize_with = "time::document_time")]
  pub first_alert_time:  Option<DocumentTime>,
  #[serde(deserialize_with = "time::document_time")]
  pub last_alert_time:   Option<DocumentTime>,
  #[serde(deserialize_with = "null_as_default")]
  pub last_alert_values: VecDeque<RecordedMetric>,
}

impl AggregatedAlerts {
  /// Fold one more trigger into the window, evicting the oldest sample once
  /// [`MAX_RECORDED_METRICS`] are held.
  ///
  /// `last_alert_time` never moves backwards, even for late samples.
  pub fn record(&mut self, sample: RecordedMetric, at: DateTime<Utc>) {
    self.cumulated_count = self.cumulated_count.saturating_add(1);
    let first = self.first_alert_time.get_or_insert(at.into()).parsed();
    let previous = self.last_alert_time.as_ref().and_then(DocumentTime::parsed);
    let last = [first, previous].into_iter().flatten().fold(at, |a, b| a.max(b));
    self.last_alert_time = Some(last.into());
    self.last_alert_values.push_back(sample);
    while self.last_alert_values.len() > MAX_RECORDED_METRICS {
      self.last_alert_values.pop_front();
    }
  }

  pub fn is_empty(&self) -> bool { self.cumulated_count == 0 }
}

impl fmt::Display for AggregatedAlerts {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let render = |t: &Option<DocumentTime>| {
      t.as_ref().map_or_else(|| "-".to_owned(), ToString::to_string)
    };
    write!(
      f,
      "count={} first={} last={} values=[",
      self.cumulated_count,
      render(&self.first_alert_time),
      render(&self.last_alert_time),
    )?;
    for (i, metric) in self.last_alert_values.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      let values = serde_json::to_string(&metric.values).map_err(|_| fmt::Error)?;
      write!(f, "{}/{}: {values}", metric.rule_name, metric.resource_name)?;
    }
    f.write_str("]")
  }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// Escalation state for one (rule, resource) pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceStatus {
  #[serde(alias = "CurrentLevel")]
  pub current_level:        AlertLevel,
  /// Consecutive positive evaluations since the cell last cleared.
  #[serde(alias = "PositiveCount")]
  pub positive_count:       u32,
  /// Notifications sent since the cell last cleared.
  #[serde(alias = "CumulatedSendCount")]
  pub cumulated_send_count: u32,
  /// Seconds to wait after the most recent send.
  #[serde(alias = "NextResendInterval")]
  pub next_resend_interval: u32,
  #[serde(alias = "NextSendableTime", with = "time::lenient")]
  pub next_sendable_time:   Option<DateTime<Utc>>,
  #[serde(alias = "AggregatedAlerts")]
  pub aggregated_alerts:    AggregatedAlerts,
}

// ─── Document ────────────────────────────────────────────────────────────────

/// The full escalation state of one alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDocument {
  #[serde(default = "legacy_version")]
  pub version:         u32,
  #[serde(
    default,
    alias = "ResourceStatus",
    deserialize_with = "null_as_default"
  )]
  pub resource_status: BTreeMap<ResourceKey, ResourceStatus>,
  #[serde(default, alias = "UpdateTime", with = "time::lenient")]
  pub update_time:     Option<DateTime<Utc>>,
}

fn legacy_version() -> u32 { LEGACY_VERSION }

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for StatusDocument {
  fn default() -> Self { Self::new() }
}

impl StatusDocument {
  /// An empty document at the current schema version.
  pub fn new() -> Self {
    Self {
      version:         CURRENT_VERSION,
      resource_status: BTreeMap::new(),
      update_time:     None,
    }
  }

  /// Decode a document as stored in the alert row.
  ///
  /// The version is checked before the shape so that a document from a
  /// newer writer reports [`Error::UnsupportedVersion`] instead of a shape
  /// mismatch.
  pub fn decode(raw: &str) -> Result<Self> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let Some(object) = value.as_object() else {
      return Err(Error::MalformedDocument("expected a JSON object".into()));
    };
    if let Some(version) = object.get("version").and_then(|v| v.as_u64())
      && version > u64::from(CURRENT_VERSION)
    {
      return Err(Error::UnsupportedVersion(
        u32::try_from(version).unwrap_or(u32::MAX),
      ));
    }
    Ok(serde_json::from_value(value)?)
  }

  /// Encode at [`CURRENT_VERSION`], regardless of the version decoded from.
  pub fn encode(&self) -> Result<String> {
    let mut value = serde_json::to_value(self)?;
    value["version"] = CURRENT_VERSION.into();
    Ok(value.to_string())
  }

  pub fn is_legacy(&self) -> bool { self.version < CURRENT_VERSION }

  /// All cells produced by `rule_id`, ordered by resource name.
  pub fn cells_for_rule<'a>(
    &'a self,
    rule_id: &'a str,
  ) -> impl Iterator<Item = (&'a ResourceKey, &'a ResourceStatus)> + 'a {
    let start = ResourceKey {
      rule_id:       Some(rule_id.to_owned()),
      resource_name: String::new(),
    };
    self
      .resource_status
      .range(start..)
      .take_while(move |(key, _)| key.rule_id() == Some(rule_id))
  }

  /// The cell for `key`, created in its cleared state on first use.
  pub fn cell_mut(&mut self, key: ResourceKey) -> &mut ResourceStatus {
    self.resource_status.entry(key).or_default()
  }

  /// Drop a cell whose resource no longer matches the rule's scope.
  pub fn evict(&mut self, key: &ResourceKey) -> Option<ResourceStatus> {
    self.resource_status.remove(key)
  }

  pub fn touch(&mut self, now: DateTime<Utc>) { self.update_time = Some(now); }
}
