//! Describe requests and the normalized queries handed to an
//! [`AlertStore`](crate::store::AlertStore).
//!
//! Requests arrive loosely shaped: zero means "default" for paging, sort keys
//! are free strings, identifier lists may contain blanks and duplicates, and
//! the resource scope is JSON text. [`DescribeAlertDetailsRequest::normalize`]
//! and [`DescribeAlertStatusRequest::normalize`] turn them into queries a
//! store can execute without further interpretation.

use strum::{AsRefStr, Display, EnumString};

use crate::scope::ResourceScope;

/// Offset used when a request leaves it at zero.
pub const DEFAULT_OFFSET: u32 = 0;

/// Page size used when a request leaves it at zero.
pub const DEFAULT_LIMIT: u32 = 20;

// ─── Paging ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
  pub offset: u32,
  pub limit:  u32,
}

impl Paging {
  pub fn normalize(offset: u32, limit: u32) -> Self {
    Self {
      offset: if offset == 0 { DEFAULT_OFFSET } else { offset },
      limit:  if limit == 0 { DEFAULT_LIMIT } else { limit },
    }
  }
}

impl Default for Paging {
  fn default() -> Self { Self::normalize(0, 0) }
}

// ─── Sorting ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
  Asc,
  #[default]
  Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
  pub key:       K,
  pub direction: Direction,
}

impl<K> Sort<K>
where
  K: Default + std::str::FromStr,
{
  /// No key sorts by `K::default()` descending. With a key, `reverse`
  /// selects descending order. An unknown key is logged and treated as
  /// absent.
  pub fn resolve(sort_key: Option<&str>, reverse: bool) -> Self {
    let requested = sort_key.map(str::trim).filter(|k| !k.is_empty());
    match requested.map(|k| (k, k.parse::<K>())) {
      Some((_, Ok(key))) => Self {
        key,
        direction: if reverse { Direction::Desc } else { Direction::Asc },
      },
      Some((raw, Err(_))) => {
        tracing::warn!(sort_key = raw, "unknown sort key; using default order");
        Self::default_order()
      }
      None => Self::default_order(),
    }
  }

  fn default_order() -> Self {
    Self { key: K::default(), direction: Direction::Desc }
  }
}

/// Sortable columns of the alert-detail listing.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum AlertDetailSortKey {
  #[default]
  AlertId,
  AlertName,
  CreateTime,
  RunningStatus,
  PolicyName,
  Creator,
}

/// Sortable columns of the per-rule alert-status listing.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum AlertStatusSortKey {
  RuleId,
  RuleName,
  Severity,
  MetricName,
  #[default]
  CreateTime,
  UpdateTime,
}

// ─── Identifier lists ────────────────────────────────────────────────────────

/// Trim every entry, drop blanks, and drop repeats, keeping the first
/// occurrence's position.
pub fn simplify_string_list(values: &[String]) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(values.len());
  for value in values {
    let value = value.trim();
    if !value.is_empty() && !out.iter().any(|seen| seen == value) {
      out.push(value.to_owned());
    }
  }
  out
}

/// Identifier-set filters shared by both describe operations. Empty lists do
/// not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
  pub alert_ids:       Vec<String>,
  pub alert_names:     Vec<String>,
  pub disabled:        Vec<bool>,
  pub running_status:  Vec<String>,
  pub policy_ids:      Vec<String>,
  pub creators:        Vec<String>,
  pub rs_filter_ids:   Vec<String>,
  pub executor_ids:    Vec<String>,
  /// Substring match on the alert name.
  pub search_word:     Option<String>,
  pub scope:           Option<ResourceScope>,
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Input of `describe_alert_details`.
#[derive(Debug, Clone, Default)]
pub struct DescribeAlertDetailsRequest {
  pub search_word:     String,
  pub sort_key:        String,
  pub reverse:         bool,
  pub offset:          u32,
  pub limit:           u32,
  /// JSON text of a [`ResourceScope`]; blank for none.
  pub resource_search: String,
  pub alert_id:        Vec<String>,
  pub alert_name:      Vec<String>,
  pub disabled:        Vec<bool>,
  pub running_status:  Vec<String>,
  pub policy_id:       Vec<String>,
  pub creator:         Vec<String>,
  pub rs_filter_id:    Vec<String>,
  pub executor_id:     Vec<String>,
}

/// Input of `describe_alert_status`: the alert selection of a details
/// request, narrowed further to specific rules.
#[derive(Debug, Clone, Default)]
pub struct DescribeAlertStatusRequest {
  pub alerts:  DescribeAlertDetailsRequest,
  pub rule_id: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDetailsQuery {
  pub filter: AlertFilter,
  pub paging: Paging,
  pub sort:   Sort<AlertDetailSortKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertStatusQuery {
  pub filter:   AlertFilter,
  pub rule_ids: Vec<String>,
  pub paging:   Paging,
  pub sort:     Sort<AlertStatusSortKey>,
}

impl DescribeAlertDetailsRequest {
  fn filter(&self) -> AlertFilter {
    let mut disabled = self.disabled.clone();
    disabled.sort_unstable();
    disabled.dedup();

    AlertFilter {
      alert_ids: simplify_string_list(&self.alert_id),
      alert_names: simplify_string_list(&self.alert_name),
      disabled,
      running_status: simplify_string_list(&self.running_status),
      policy_ids: simplify_string_list(&self.policy_id),
      creators: simplify_string_list(&self.creator),
      rs_filter_ids: simplify_string_list(&self.rs_filter_id),
      executor_ids: simplify_string_list(&self.executor_id),
      search_word: Some(self.search_word.trim())
        .filter(|w| !w.is_empty())
        .map(str::to_owned),
      scope: ResourceScope::parse_lenient(&self.resource_search),
    }
  }

  pub fn normalize(&self) -> AlertDetailsQuery {
    AlertDetailsQuery {
      filter: self.filter(),
      paging: Paging::normalize(self.offset, self.limit),
      sort:   Sort::resolve(Some(&self.sort_key), self.reverse),
    }
  }
}

impl DescribeAlertStatusRequest {
  pub fn normalize(&self) -> AlertStatusQuery {
    AlertStatusQuery {
      filter:   self.alerts.filter(),
      rule_ids: simplify_string_list(&self.rule_id),
      paging:   Paging::normalize(self.alerts.offset, self.alerts.limit),
      sort:     Sort::resolve(Some(&self.alerts.sort_key), self.alerts.reverse),
    }
  }
}
