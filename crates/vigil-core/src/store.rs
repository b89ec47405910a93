//! The `AlertStore` trait — the relational boundary of the reporter.
//!
//! The trait is implemented by storage backends (e.g. `vigil-store-sqlite`).
//! Implementations execute already-normalized queries; defaulting, list
//! cleanup and sort-key validation happen before a query reaches them (see
//! [`crate::query`]).

use std::future::Future;

use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  alert::{Alert, AlertDetailRow, AlertStatusRow, Page},
  query::{AlertDetailsQuery, AlertStatusQuery},
  scope::ResourceScope,
};

/// Kinds of alert history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HistoryEvent {
  Triggered,
  SentSuccess,
  SentFailed,
  Recovered,
  Commented,
}

impl HistoryEvent {
  /// Events that count as the alert having fired.
  pub const ALERTING: [HistoryEvent; 3] =
    [Self::Triggered, Self::SentSuccess, Self::SentFailed];
}

/// Most metric names returned per alert.
pub const METRICS_PER_ALERT: u32 = 100;

/// Abstraction over the relational store holding alerts, policies, rules,
/// resource filters, metrics and alert history.
///
/// All methods are reads; status documents are written by the evaluator,
/// never through this trait.
pub trait AlertStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// One page of alerts joined with policy, resource filter, resource type
  /// and action, plus the total number of matches.
  fn scan_alert_details<'a>(
    &'a self,
    query: &'a AlertDetailsQuery,
  ) -> impl Future<Output = Result<Page<AlertDetailRow>, Self::Error>> + Send + 'a;

  /// One page of (alert, rule) pairs, plus the total number of matches.
  fn scan_alert_status<'a>(
    &'a self,
    query: &'a AlertStatusQuery,
  ) -> impl Future<Output = Result<Page<AlertStatusRow>, Self::Error>> + Send + 'a;

  /// Metric names used by the rules of the alert's policy, sorted by name,
  /// at most [`METRICS_PER_ALERT`].
  fn metrics_for_alert<'a>(
    &'a self,
    alert_id: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// The latest [`HistoryEvent::ALERTING`] event time across `alert_ids`, or
  /// `None` if there is none.
  fn most_recent_alert_time<'a>(
    &'a self,
    alert_ids: &'a [String],
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>, Self::Error>> + Send + 'a;

  /// Alerts whose name is in `names` (all alerts when empty), narrowed by
  /// `scope`, ordered by alert id descending.
  fn alerts_by_name<'a>(
    &'a self,
    scope: Option<&'a ResourceScope>,
    names: &'a [String],
  ) -> impl Future<Output = Result<Page<Alert>, Self::Error>> + Send + 'a;
}
