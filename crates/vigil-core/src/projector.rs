//! Read-side projections of a [`StatusDocument`].
//!
//! Every alert row is projected independently: a document that cannot be
//! decoded yields a [`StatusProjection`] that is unavailable for that row,
//! with the reason kept, and projects to zero counts and no resources.

use serde::Serialize;

use crate::{
  Error,
  status::{AlertLevel, ResourceStatus, StatusDocument},
  time::format_sendable_time,
};

/// Whether a record's status document could be used, and if not, why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusAvailability {
  Available,
  /// The alert has no document yet.
  NotEvaluated,
  Undecodable { message: String },
  UnsupportedVersion { version: u32 },
}

/// Cell counts of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
  /// Number of tracked cells.
  pub rules_count:     u32,
  /// Cells not at the cleared level.
  pub positives_count: u32,
}

/// One tracked resource of a rule, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceStatusView {
  pub resource_name:        String,
  pub current_level:        AlertLevel,
  pub positive_count:       u32,
  pub cumulated_send_count: u32,
  pub next_resend_interval: u32,
  /// Empty when the cell has never been throttled.
  pub next_sendable_time:   String,
  pub aggregated_alerts:    String,
}

impl ResourceStatusView {
  fn new(resource_name: &str, cell: &ResourceStatus) -> Self {
    Self {
      resource_name:        resource_name.to_owned(),
      current_level:        cell.current_level.clone(),
      positive_count:       cell.positive_count,
      cumulated_send_count: cell.cumulated_send_count,
      next_resend_interval: cell.next_resend_interval,
      next_sendable_time:   cell
        .next_sendable_time
        .map(format_sendable_time)
        .unwrap_or_default(),
      aggregated_alerts:    cell.aggregated_alerts.to_string(),
    }
  }
}

fn saturating_u32(n: usize) -> u32 { u32::try_from(n).unwrap_or(u32::MAX) }

/// Count tracked cells and the positive ones among them.
pub fn project_counts(document: &StatusDocument) -> StatusCounts {
  let positives = document
    .resource_status
    .values()
    .filter(|cell| cell.current_level.is_positive())
    .count();
  StatusCounts {
    rules_count:     saturating_u32(document.resource_status.len()),
    positives_count: saturating_u32(positives),
  }
}

/// The resources tracked under `rule_id`, ordered by resource name.
pub fn project_resources_for_rule(
  document: &StatusDocument,
  rule_id: &str,
) -> Vec<ResourceStatusView> {
  document
    .cells_for_rule(rule_id)
    .map(|(key, cell)| ResourceStatusView::new(key.resource_name(), cell))
    .collect()
}

// ─── Per-record projection ───────────────────────────────────────────────────

/// The outcome of decoding one record's status column.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusProjection {
  Available(StatusDocument),
  NotEvaluated,
  Undecodable(String),
  UnsupportedVersion(u32),
}

impl StatusProjection {
  /// Decode the raw column. NULL and blank text mean the evaluator has not
  /// written a document yet.
  pub fn from_raw(raw: Option<&str>) -> Self {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
      return Self::NotEvaluated;
    };
    match StatusDocument::decode(raw) {
      Ok(document) => Self::Available(document),
      Err(Error::UnsupportedVersion(version)) => Self::UnsupportedVersion(version),
      Err(e) => Self::Undecodable(e.to_string()),
    }
  }

  pub fn document(&self) -> Option<&StatusDocument> {
    match self {
      Self::Available(document) => Some(document),
      _ => None,
    }
  }

  pub fn availability(&self) -> StatusAvailability {
    match self {
      Self::Available(_) => StatusAvailability::Available,
      Self::NotEvaluated => StatusAvailability::NotEvaluated,
      Self::Undecodable(message) => {
        StatusAvailability::Undecodable { message: message.clone() }
      }
      Self::UnsupportedVersion(version) => {
        StatusAvailability::UnsupportedVersion { version: *version }
      }
    }
  }

  /// Zero counts unless the document is available.
  pub fn counts(&self) -> StatusCounts {
    self.document().map(project_counts).unwrap_or_default()
  }

  /// No resources unless the document is available.
  pub fn resources_for_rule(&self, rule_id: &str) -> Vec<ResourceStatusView> {
    self
      .document()
      .map(|document| project_resources_for_rule(document, rule_id))
      .unwrap_or_default()
  }
}
