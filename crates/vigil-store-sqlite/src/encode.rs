//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with microsecond precision.
//! Booleans are stored as INTEGER 0/1. Columns reached through a LEFT JOIN
//! are read as `Option` and default to the empty string.

use chrono::{DateTime, SecondsFormat, Utc};
use vigil_core::{
  alert::{Alert, AlertDetailRow, AlertStatusRow},
  status::AlertLevel,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns of an `alert` row joined with policy, resource filter,
/// resource type and action.
pub struct RawAlertDetail {
  pub alert_id:             String,
  pub alert_name:           String,
  pub disabled:             bool,
  pub create_time:          String,
  pub running_status:       String,
  pub alert_status:         Option<String>,
  pub policy_id:            Option<String>,
  pub rs_filter_name:       Option<String>,
  pub rs_filter_param:      Option<String>,
  pub rs_type_name:         Option<String>,
  pub executor_id:          String,
  pub policy_name:          Option<String>,
  pub policy_description:   Option<String>,
  pub policy_config:        Option<String>,
  pub creator:              Option<String>,
  pub available_start_time: Option<String>,
  pub available_end_time:   Option<String>,
  pub nf_address_list_id:   Option<String>,
}

impl RawAlertDetail {
  pub const COLUMNS: &'static str = "t1.alert_id, t1.alert_name, t1.disabled, t1.create_time,
    t1.running_status, t1.alert_status, t1.policy_id, t3.rs_filter_name,
    t3.rs_filter_param, t4.rs_type_name, t1.executor_id, t2.policy_name,
    t2.policy_description, t2.policy_config, t2.creator,
    t2.available_start_time, t2.available_end_time, t5.nf_address_list_id";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:             row.get(0)?,
      alert_name:           row.get(1)?,
      disabled:             row.get(2)?,
      create_time:          row.get(3)?,
      running_status:       row.get(4)?,
      alert_status:         row.get(5)?,
      policy_id:            row.get(6)?,
      rs_filter_name:       row.get(7)?,
      rs_filter_param:      row.get(8)?,
      rs_type_name:         row.get(9)?,
      executor_id:          row.get(10)?,
      policy_name:          row.get(11)?,
      policy_description:   row.get(12)?,
      policy_config:        row.get(13)?,
      creator:              row.get(14)?,
      available_start_time: row.get(15)?,
      available_end_time:   row.get(16)?,
      nf_address_list_id:   row.get(17)?,
    })
  }

  pub fn into_row(self) -> Result<AlertDetailRow> {
    Ok(AlertDetailRow {
      create_time:          decode_dt(&self.create_time)?,
      alert_id:             self.alert_id,
      alert_name:           self.alert_name,
      disabled:             self.disabled,
      running_status:       self.running_status,
      alert_status:         self.alert_status,
      policy_id:            self.policy_id.unwrap_or_default(),
      rs_filter_name:       self.rs_filter_name.unwrap_or_default(),
      rs_filter_param:      self.rs_filter_param.unwrap_or_default(),
      rs_type_name:         self.rs_type_name.unwrap_or_default(),
      executor_id:          self.executor_id,
      policy_name:          self.policy_name.unwrap_or_default(),
      policy_description:   self.policy_description.unwrap_or_default(),
      policy_config:        self.policy_config.unwrap_or_default(),
      creator:              self.creator.unwrap_or_default(),
      available_start_time: self.available_start_time.unwrap_or_default(),
      available_end_time:   self.available_end_time.unwrap_or_default(),
      nf_address_list_id:   self.nf_address_list_id.unwrap_or_default(),
    })
  }
}

/// Raw columns of an (alert, rule) pair joined with the rule's metric.
pub struct RawAlertStatus {
  pub alert_id:          String,
  pub rule_id:           String,
  pub rule_name:         String,
  pub disabled:          bool,
  pub monitor_periods:   u32,
  pub severity:          String,
  pub metrics_type:      String,
  pub condition_type:    String,
  pub thresholds:        String,
  pub unit:              String,
  pub consecutive_count: u32,
  pub inhibit:           bool,
  pub metric_name:       Option<String>,
  pub create_time:       String,
  pub update_time:       String,
  pub alert_status:      Option<String>,
}

impl RawAlertStatus {
  pub const COLUMNS: &'static str = "t1.alert_id, t2.rule_id, t2.rule_name, t2.disabled,
    t2.monitor_periods, t2.severity, t2.metrics_type, t2.condition_type,
    t2.thresholds, t2.unit, t2.consecutive_count, t2.inhibit, t3.metric_name,
    t2.create_time, t2.update_time, t1.alert_status";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:          row.get(0)?,
      rule_id:           row.get(1)?,
      rule_name:         row.get(2)?,
      disabled:          row.get(3)?,
      monitor_periods:   row.get(4)?,
      severity:          row.get(5)?,
      metrics_type:      row.get(6)?,
      condition_type:    row.get(7)?,
      thresholds:        row.get(8)?,
      unit:              row.get(9)?,
      consecutive_count: row.get(10)?,
      inhibit:           row.get(11)?,
      metric_name:       row.get(12)?,
      create_time:       row.get(13)?,
      update_time:       row.get(14)?,
      alert_status:      row.get(15)?,
    })
  }

  pub fn into_row(self) -> Result<AlertStatusRow> {
    let Ok(severity) = self.severity.parse::<AlertLevel>();
    Ok(AlertStatusRow {
      create_time: decode_dt(&self.create_time)?,
      update_time: decode_dt(&self.update_time)?,
      alert_id: self.alert_id,
      rule_id: self.rule_id,
      rule_name: self.rule_name,
      disabled: self.disabled,
      monitor_periods: self.monitor_periods,
      severity,
      metrics_type: self.metrics_type,
      condition_type: self.condition_type,
      thresholds: self.thresholds,
      unit: self.unit,
      consecutive_count: self.consecutive_count,
      inhibit: self.inhibit,
      metric_name: self.metric_name.unwrap_or_default(),
      alert_status: self.alert_status,
    })
  }
}

/// Raw columns of a bare `alert` row.
pub struct RawAlert {
  pub alert_id:       String,
  pub alert_name:     String,
  pub disabled:       bool,
  pub running_status: String,
  pub policy_id:      Option<String>,
  pub rs_filter_id:   Option<String>,
  pub executor_id:    String,
  pub create_time:    String,
  pub update_time:    String,
}

impl RawAlert {
  pub const COLUMNS: &'static str = "t1.alert_id, t1.alert_name, t1.disabled,
    t1.running_status, t1.policy_id, t1.rs_filter_id, t1.executor_id,
    t1.create_time, t1.update_time";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:       row.get(0)?,
      alert_name:     row.get(1)?,
      disabled:       row.get(2)?,
      running_status: row.get(3)?,
      policy_id:      row.get(4)?,
      rs_filter_id:   row.get(5)?,
      executor_id:    row.get(6)?,
      create_time:    row.get(7)?,
      update_time:    row.get(8)?,
    })
  }

  pub fn into_alert(self) -> Result<Alert> {
    Ok(Alert {
      create_time:    decode_dt(&self.create_time)?,
      update_time:    decode_dt(&self.update_time)?,
      alert_id:       self.alert_id,
      alert_name:     self.alert_name,
      disabled:       self.disabled,
      running_status: self.running_status,
      policy_id:      self.policy_id.unwrap_or_default(),
      rs_filter_id:   self.rs_filter_id.unwrap_or_default(),
      executor_id:    self.executor_id,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = encode_dt(Utc.with_ymd_and_hms(2024, 3, 1, 9, 59, 59).unwrap());
    let late = encode_dt(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    assert_eq!(early.len(), late.len());
    assert!(early < late);
    assert_eq!(late, "2024-03-01T10:00:00.000000Z");
  }

  #[test]
  fn timestamps_round_trip() {
    let dt = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
    assert_eq!(decode_dt(&encode_dt(dt)).unwrap(), dt);
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
