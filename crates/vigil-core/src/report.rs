//! The status reporter: describe operations over any [`AlertStore`].
//!
//! Each operation normalizes its request, runs the primary store query, and
//! enriches every returned row from its status document. Only a failure of
//! the primary query fails the request; secondary lookups (metric names,
//! alert history) degrade to empty values, and undecodable documents degrade
//! to an unavailable projection for that row alone.
//!
//! Counts and `most_recent_alert_time` come from separate reads, so a
//! concurrent evaluator write between them may leave the two slightly out
//! of step.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
  alert::{Alert, AlertDetail, AlertDetailRow, AlertStatus, Page},
  projector::StatusProjection,
  query::{DescribeAlertDetailsRequest, DescribeAlertStatusRequest, simplify_string_list},
  scope::ResourceScope,
  store::AlertStore,
};

#[derive(Debug, Clone, Serialize)]
pub struct DescribeAlertDetailsResponse {
  pub total:           u64,
  pub alertdetail_set: Vec<AlertDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribeAlertStatusResponse {
  pub total:           u64,
  pub alertstatus_set: Vec<AlertStatus>,
}

fn project_logged(alert_id: &str, raw: Option<&str>) -> StatusProjection {
  let projection = StatusProjection::from_raw(raw);
  match &projection {
    StatusProjection::Undecodable(message) => {
      tracing::debug!(alert_id, error = %message, "status document undecodable");
    }
    StatusProjection::UnsupportedVersion(version) => {
      tracing::debug!(alert_id, version, "status document from a newer schema");
    }
    StatusProjection::Available(_) | StatusProjection::NotEvaluated => {}
  }
  projection
}

// ─── Alert details ───────────────────────────────────────────────────────────

/// Describe alerts with their policy, scope, metrics and status summary.
pub async fn describe_alert_details<S: AlertStore>(
  store: &S,
  request: &DescribeAlertDetailsRequest,
) -> Result<DescribeAlertDetailsResponse, S::Error> {
  let query = request.normalize();
  let Page { total, items } = store
    .scan_alert_details(&query)
    .await
    .inspect_err(|e| {
      tracing::error!(?request, error = %e, "failed to describe alert details");
    })?;

  let mut details = Vec::with_capacity(items.len());
  for row in items {
    details.push(enrich_detail(store, row).await);
  }

  tracing::debug!(total, returned = details.len(), "described alert details");
  Ok(DescribeAlertDetailsResponse { total, alertdetail_set: details })
}

async fn enrich_detail<S: AlertStore>(store: &S, row: AlertDetailRow) -> AlertDetail {
  let metrics = store
    .metrics_for_alert(&row.alert_id)
    .await
    .unwrap_or_else(|e| {
      tracing::warn!(alert_id = %row.alert_id, error = %e, "metric lookup failed");
      Vec::new()
    });

  let projection = project_logged(&row.alert_id, row.alert_status.as_deref());
  let counts = projection.counts();

  let most_recent_alert_time = if counts.rules_count > 0 {
    let ids = [row.alert_id.clone()];
    store.most_recent_alert_time(&ids).await.unwrap_or_else(|e| {
      tracing::warn!(alert_id = %row.alert_id, error = %e, "history lookup failed");
      None
    })
  } else {
    None
  };

  AlertDetail {
    alert_id: row.alert_id,
    alert_name: row.alert_name,
    disabled: row.disabled,
    create_time: row.create_time,
    running_status: row.running_status,
    policy_id: row.policy_id,
    rs_filter_name: row.rs_filter_name,
    rs_filter_param: row.rs_filter_param,
    rs_type_name: row.rs_type_name,
    executor_id: row.executor_id,
    policy_name: row.policy_name,
    policy_description: row.policy_description,
    policy_config: row.policy_config,
    creator: row.creator,
    available_start_time: row.available_start_time,
    available_end_time: row.available_end_time,
    nf_address_list_id: row.nf_address_list_id,
    metrics,
    rules_count: counts.rules_count,
    positives_count: counts.positives_count,
    most_recent_alert_time,
    status: projection.availability(),
  }
}

// ─── Alert status ────────────────────────────────────────────────────────────

/// Describe the rules of matching alerts with the resources each rule
/// currently tracks.
pub async fn describe_alert_status<S: AlertStore>(
  store: &S,
  request: &DescribeAlertStatusRequest,
) -> Result<DescribeAlertStatusResponse, S::Error> {
  let query = request.normalize();
  let Page { total, items } = store
    .scan_alert_status(&query)
    .await
    .inspect_err(|e| {
      tracing::error!(?request, error = %e, "failed to describe alert status");
    })?;

  // Rows of the same alert share one document; decode it once.
  let mut projections: HashMap<String, StatusProjection> = HashMap::new();
  let mut statuses = Vec::with_capacity(items.len());

  for row in items {
    let projection = projections
      .entry(row.alert_id.clone())
      .or_insert_with(|| project_logged(&row.alert_id, row.alert_status.as_deref()));

    statuses.push(AlertStatus {
      resources: projection.resources_for_rule(&row.rule_id),
      status: projection.availability(),
      alert_id: row.alert_id,
      rule_id: row.rule_id,
      rule_name: row.rule_name,
      disabled: row.disabled,
      monitor_periods: row.monitor_periods,
      severity: row.severity,
      metrics_type: row.metrics_type,
      condition_type: row.condition_type,
      thresholds: row.thresholds,
      unit: row.unit,
      consecutive_count: row.consecutive_count,
      inhibit: row.inhibit,
      metric_name: row.metric_name,
      create_time: row.create_time,
      update_time: row.update_time,
    });
  }

  tracing::debug!(total, returned = statuses.len(), "described alert status");
  Ok(DescribeAlertStatusResponse { total, alertstatus_set: statuses })
}

// ─── Alerts by name ──────────────────────────────────────────────────────────

/// Look up alerts by a comma-separated list of names within a resource
/// scope. A malformed scope is ignored.
pub async fn get_alerts_by_name<S: AlertStore>(
  store: &S,
  resource_search: &str,
  alert_names: &str,
) -> Result<Page<Alert>, S::Error> {
  let scope = ResourceScope::parse_lenient(resource_search);
  let split: Vec<String> = alert_names.split(',').map(str::to_owned).collect();
  let names = simplify_string_list(&split);

  store
    .alerts_by_name(scope.as_ref(), &names)
    .await
    .inspect_err(|e| {
      tracing::error!(alert_names, error = %e, "failed to get alerts by name");
    })
}
