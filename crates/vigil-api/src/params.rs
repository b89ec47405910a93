//! Query-string parameters of the describe endpoints.
//!
//! List filters are accepted as comma-separated strings, e.g.
//! `?alert_id=al-1,al-2&disabled=false`. Blank entries and repeats are
//! dropped later, during request normalization.

use serde::Deserialize;
use vigil_core::query::{DescribeAlertDetailsRequest, DescribeAlertStatusRequest};

use crate::error::ApiError;

fn split(list: Option<String>) -> Vec<String> {
  list
    .map(|s| s.split(',').map(str::to_owned).collect())
    .unwrap_or_default()
}

fn parse_flags(list: Option<String>) -> Result<Vec<bool>, ApiError> {
  split(list)
    .iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .map(|s| {
      s.parse::<bool>().map_err(|_| {
        tracing::warn!(value = s, "rejected disabled flag");
        ApiError::BadRequest(format!("disabled: expected true or false, got {s:?}"))
      })
    })
    .collect()
}

#[derive(Debug, Deserialize, Default)]
pub struct DescribeParams {
  /// Substring of the alert name.
  pub search_word:     Option<String>,
  pub sort_key:        Option<String>,
  pub reverse:         Option<bool>,
  pub offset:          Option<u32>,
  pub limit:           Option<u32>,
  /// JSON scope object, e.g. `{"rs_type_name":"pod","ns_name":"default"}`.
  pub resource_search: Option<String>,
  pub alert_id:        Option<String>,
  pub alert_name:      Option<String>,
  pub disabled:        Option<String>,
  pub running_status:  Option<String>,
  pub policy_id:       Option<String>,
  pub creator:         Option<String>,
  pub rs_filter_id:    Option<String>,
  pub executor_id:     Option<String>,
  /// Only used by `/alert_status`.
  pub rule_id:         Option<String>,
}

impl DescribeParams {
  pub fn into_details_request(self) -> Result<DescribeAlertDetailsRequest, ApiError> {
    Ok(DescribeAlertDetailsRequest {
      search_word:     self.search_word.unwrap_or_default(),
      sort_key:        self.sort_key.unwrap_or_default(),
      reverse:         self.reverse.unwrap_or(false),
      offset:          self.offset.unwrap_or(0),
      limit:           self.limit.unwrap_or(0),
      resource_search: self.resource_search.unwrap_or_default(),
      alert_id:        split(self.alert_id),
      alert_name:      split(self.alert_name),
      disabled:        parse_flags(self.disabled)?,
      running_status:  split(self.running_status),
      policy_id:       split(self.policy_id),
      creator:         split(self.creator),
      rs_filter_id:    split(self.rs_filter_id),
      executor_id:     split(self.executor_id),
    })
  }

  pub fn into_status_request(mut self) -> Result<DescribeAlertStatusRequest, ApiError> {
    let rule_id = split(self.rule_id.take());
    Ok(DescribeAlertStatusRequest { alerts: self.into_details_request()?, rule_id })
  }
}

/// Parameters of `GET /alerts`.
#[derive(Debug, Deserialize, Default)]
pub struct AlertsByNameParams {
  /// Comma-separated alert names; absent or blank lists every alert.
  pub alert_name:      Option<String>,
  pub resource_search: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lists_are_split_on_commas() {
    let params = DescribeParams {
      alert_id: Some("al-1,al-2,".into()),
      disabled: Some("true, false".into()),
      rule_id: Some("rl-1".into()),
      ..Default::default()
    };
    let request = params.into_status_request().unwrap();
    assert_eq!(request.alerts.alert_id, ["al-1", "al-2", ""]);
    assert_eq!(request.alerts.disabled, [true, false]);
    assert_eq!(request.rule_id, ["rl-1"]);
    assert!(request.alerts.policy_id.is_empty());
  }

  #[test]
  fn bad_flags_are_rejected() {
    let params = DescribeParams { disabled: Some("maybe".into()), ..Default::default() };
    assert!(matches!(params.into_details_request(), Err(ApiError::BadRequest(_))));
  }
}
