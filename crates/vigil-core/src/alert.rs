//! Relational records read by the reporter and the enriched views it
//! returns.
//!
//! `*Row` types are what an [`AlertStore`](crate::store::AlertStore) hands
//! back: relational columns plus the raw status document text. The reporter
//! turns them into [`AlertDetail`] and [`AlertStatus`], which carry the
//! projected counts and resource views instead of the raw document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  projector::{ResourceStatusView, StatusAvailability},
  status::AlertLevel,
};

/// One page of results plus the unpaginated match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub total: u64,
  pub items: Vec<T>,
}

impl<T> Page<T> {
  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page { total: self.total, items: self.items.into_iter().map(f).collect() }
  }
}

// ─── Alert ───────────────────────────────────────────────────────────────────

/// A binding of a policy to a resource filter and an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  pub alert_id:       String,
  pub alert_name:     String,
  pub disabled:       bool,
  pub running_status: String,
  pub policy_id:      String,
  pub rs_filter_id:   String,
  pub executor_id:    String,
  pub create_time:    DateTime<Utc>,
  pub update_time:    DateTime<Utc>,
}

// ─── Alert detail ────────────────────────────────────────────────────────────

/// An alert joined with its policy, resource filter, resource type and
/// notification action.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDetailRow {
  pub alert_id:             String,
  pub alert_name:           String,
  pub disabled:             bool,
  pub create_time:          DateTime<Utc>,
  pub running_status:       String,
  /// Raw status document; `None` when the column is NULL.
  pub alert_status:         Option<String>,
  pub policy_id:            String,
  pub rs_filter_name:       String,
  pub rs_filter_param:      String,
  pub rs_type_name:         String,
  pub executor_id:          String,
  pub policy_name:          String,
  pub policy_description:   String,
  pub policy_config:        String,
  pub creator:              String,
  pub available_start_time: String,
  pub available_end_time:   String,
  pub nf_address_list_id:   String,
}

/// The externally visible alert detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDetail {
  pub alert_id:               String,
  pub alert_name:             String,
  pub disabled:               bool,
  pub create_time:            DateTime<Utc>,
  pub running_status:         String,
  pub policy_id:              String,
  pub rs_filter_name:         String,
  pub rs_filter_param:        String,
  pub rs_type_name:           String,
  pub executor_id:            String,
  pub policy_name:            String,
  pub policy_description:     String,
  pub policy_config:          String,
  pub creator:                String,
  pub available_start_time:   String,
  pub available_end_time:     String,
  pub nf_address_list_id:     String,
  /// Metric names of the policy's rules; empty when the lookup failed.
  pub metrics:                Vec<String>,
  /// Number of tracked (rule, resource) cells.
  pub rules_count:            u32,
  /// Number of cells not at the cleared level.
  pub positives_count:        u32,
  /// Only looked up when `rules_count > 0`.
  pub most_recent_alert_time: Option<DateTime<Utc>>,
  pub status:                 StatusAvailability,
}

// ─── Alert status ────────────────────────────────────────────────────────────

/// One rule of an alert's policy, with the alert's raw status document.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertStatusRow {
  pub alert_id:          String,
  pub rule_id:           String,
  pub rule_name:         String,
  pub disabled:          bool,
  pub monitor_periods:   u32,
  pub severity:          AlertLevel,
  pub metrics_type:      String,
  pub condition_type:    String,
  pub thresholds:        String,
  pub unit:              String,
  pub consecutive_count: u32,
  pub inhibit:           bool,
  pub metric_name:       String,
  pub create_time:       DateTime<Utc>,
  pub update_time:       DateTime<Utc>,
  pub alert_status:      Option<String>,
}

/// The externally visible per-rule status with its tracked resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertStatus {
  pub alert_id:          String,
  pub rule_id:           String,
  pub rule_name:         String,
  pub disabled:          bool,
  pub monitor_periods:   u32,
  pub severity:          AlertLevel,
  pub metrics_type:      String,
  pub condition_type:    String,
  pub thresholds:        String,
  pub unit:              String,
  pub consecutive_count: u32,
  pub inhibit:           bool,
  pub metric_name:       String,
  pub resources:         Vec<ResourceStatusView>,
  pub create_time:       DateTime<Utc>,
  pub update_time:       DateTime<Utc>,
  pub status:            StatusAvailability,
}
