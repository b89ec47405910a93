//! Integration tests for `SqliteStore` against an in-memory database, driven
//! through the status reporter.

use chrono::{DateTime, TimeZone, Utc};
use vigil_core::{
  projector::StatusAvailability,
  query::{DescribeAlertDetailsRequest, DescribeAlertStatusRequest},
  report::{describe_alert_details, describe_alert_status, get_alerts_by_name},
  status::{AlertLevel, RecordedMetric, ResourceKey, StatusDocument},
  store::{AlertStore, HistoryEvent},
};

use crate::{Error, SqliteStore};

const FIXTURE: &str = r#"
INSERT INTO resource_type VALUES ('rt-pod', 'pod'), ('rt-node', 'node');

INSERT INTO resource_filter VALUES
  ('rf-pod-default', 'default pods', '{"ns_name":"default","node_id":"node-1"}', 'rt-pod', '2024-03-01T09:00:00.000000Z'),
  ('rf-pod-kube',    'system pods',  '{"ns_name":"kube-system"}',              'rt-pod', '2024-03-01T09:00:00.000000Z'),
  ('rf-node',        'all nodes',    '{}',                                     'rt-node', '2024-03-01T09:00:00.000000Z');

INSERT INTO metric VALUES
  ('m-cpu',  'pod_cpu_usage',    'rt-pod'),
  ('m-mem',  'pod_memory_usage', 'rt-pod'),
  ('m-load', 'node_load',        'rt-node');

INSERT INTO policy (policy_id, policy_name, creator, create_time) VALUES
  ('pl-1', 'pod policy',  'alice', '2024-03-01T09:00:00.000000Z'),
  ('pl-2', 'node policy', 'bob',   '2024-03-01T09:00:00.000000Z');

INSERT INTO rule (rule_id, rule_name, severity, consecutive_count, policy_id, metric_id, create_time, update_time) VALUES
  ('rl-1', 'cpu high',    'critical', 2, 'pl-1', 'm-cpu',  '2024-03-01T10:00:00.000000Z', '2024-03-01T10:00:00.000000Z'),
  ('rl-2', 'memory high', 'warning',  1, 'pl-1', 'm-mem',  '2024-03-01T10:01:00.000000Z', '2024-03-01T10:01:00.000000Z'),
  ('rl-3', 'load high',   'major',    1, 'pl-2', 'm-load', '2024-03-01T10:02:00.000000Z', '2024-03-01T10:02:00.000000Z');

INSERT INTO action VALUES ('ac-1', 'pl-1', 'nf-1');

INSERT INTO alert (alert_id, alert_name, disabled, running_status, alert_status, policy_id, rs_filter_id, executor_id, create_time, update_time) VALUES
  ('al-1', 'cpu-default', 0, 'active',
   '{"resource_status":{"rl-1 podA":{"current_level":"critical","positive_count":3},"rl-1 podB":{"current_level":"cleared"}},"update_time":"2024-03-01T10:05:00Z"}',
   'pl-1', 'rf-pod-default', 'ex-1', '2024-03-01T10:00:00.000000Z', '2024-03-01T10:05:00.000000Z'),
  ('al-2', 'cpu-kube', 1, 'active', '{broken', 'pl-1', 'rf-pod-kube', 'ex-1',
   '2024-03-01T10:00:00.000000Z', '2024-03-01T10:00:00.000000Z'),
  ('al-3', 'node-load', 0, 'adding', NULL, 'pl-2', 'rf-node', 'ex-2',
   '2024-03-01T10:00:00.000000Z', '2024-03-01T10:00:00.000000Z');
"#;

async fn store() -> SqliteStore {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  store.execute_batch(FIXTURE).await.expect("fixture");
  store
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
  items.iter().map(|i| id(i).to_owned()).collect()
}

async fn detail_ids(s: &SqliteStore, request: DescribeAlertDetailsRequest) -> Vec<String> {
  let response = describe_alert_details(s, &request).await.unwrap();
  ids(&response.alertdetail_set, |d| d.alert_id.as_str())
}

// ─── Alert details ───────────────────────────────────────────────────────────

#[tokio::test]
async fn details_default_to_alert_id_descending() {
  let s = store().await;
  let response = describe_alert_details(&s, &DescribeAlertDetailsRequest::default())
    .await
    .unwrap();

  assert_eq!(response.total, 3);
  assert_eq!(
    ids(&response.alertdetail_set, |d| d.alert_id.as_str()),
    ["al-3", "al-2", "al-1"]
  );
}

#[tokio::test]
async fn details_carry_joined_columns_and_projection() {
  let s = store().await;
  let response = describe_alert_details(&s, &DescribeAlertDetailsRequest::default())
    .await
    .unwrap();
  let [node, broken, healthy] = response.alertdetail_set.as_slice() else {
    panic!("expected three details");
  };

  assert_eq!(healthy.rules_count, 2);
  assert_eq!(healthy.positives_count, 1);
  assert_eq!(healthy.metrics, ["pod_cpu_usage", "pod_memory_usage"]);
  assert_eq!(healthy.policy_name, "pod policy");
  assert_eq!(healthy.creator, "alice");
  assert_eq!(healthy.rs_type_name, "pod");
  assert_eq!(healthy.nf_address_list_id, "nf-1");
  assert_eq!(healthy.status, StatusAvailability::Available);

  assert!(broken.disabled);
  assert_eq!((broken.rules_count, broken.positives_count), (0, 0));
  assert!(matches!(broken.status, StatusAvailability::Undecodable { .. }));

  assert_eq!(node.status, StatusAvailability::NotEvaluated);
  assert_eq!(node.nf_address_list_id, "");
  assert_eq!(node.metrics, ["node_load"]);
}

#[tokio::test]
async fn most_recent_alert_time_uses_alerting_events() {
  let s = store().await;
  s.record_event("al-1", HistoryEvent::Triggered, at(11, 0)).await.unwrap();
  s.record_event("al-1", HistoryEvent::SentFailed, at(11, 30)).await.unwrap();
  s.record_event("al-1", HistoryEvent::Recovered, at(12, 0)).await.unwrap();
  s.record_event("al-2", HistoryEvent::SentSuccess, at(13, 0)).await.unwrap();

  assert_eq!(
    s.most_recent_alert_time(&["al-1".into()]).await.unwrap(),
    Some(at(11, 30))
  );
  assert_eq!(
    s.most_recent_alert_time(&["al-1".into(), "al-2".into()]).await.unwrap(),
    Some(at(13, 0))
  );
  assert_eq!(s.most_recent_alert_time(&["al-3".into()]).await.unwrap(), None);
  assert_eq!(s.most_recent_alert_time(&[]).await.unwrap(), None);

  let response = describe_alert_details(&s, &DescribeAlertDetailsRequest::default())
    .await
    .unwrap();
  let by_id = |id: &str| {
    response
      .alertdetail_set
      .iter()
      .find(|d| d.alert_id == id)
      .unwrap()
      .most_recent_alert_time
  };
  assert_eq!(by_id("al-1"), Some(at(11, 30)));
  // Undecodable document: no tracked resources, so no history lookup.
  assert_eq!(by_id("al-2"), None);
}

#[tokio::test]
async fn details_paging() {
  let s = store().await;

  let first = describe_alert_details(
    &s,
    &DescribeAlertDetailsRequest { limit: 2, ..Default::default() },
  )
  .await
  .unwrap();
  assert_eq!(first.total, 3);
  assert_eq!(ids(&first.alertdetail_set, |d| d.alert_id.as_str()), ["al-3", "al-2"]);

  let second = describe_alert_details(
    &s,
    &DescribeAlertDetailsRequest { offset: 2, limit: 2, ..Default::default() },
  )
  .await
  .unwrap();
  assert_eq!(second.total, 3);
  assert_eq!(ids(&second.alertdetail_set, |d| d.alert_id.as_str()), ["al-1"]);
}

#[tokio::test]
async fn details_sorting() {
  let s = store().await;

  let asc = DescribeAlertDetailsRequest {
    sort_key: "alert_name".into(),
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, asc).await, ["al-1", "al-2", "al-3"]);

  let desc = DescribeAlertDetailsRequest {
    sort_key: "policy_name".into(),
    reverse: true,
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, desc).await, ["al-2", "al-1", "al-3"]);

  let unknown = DescribeAlertDetailsRequest {
    sort_key: "alert_id; DROP TABLE alert".into(),
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, unknown).await, ["al-3", "al-2", "al-1"]);
}

#[tokio::test]
async fn details_filters() {
  let s = store().await;

  let disabled = DescribeAlertDetailsRequest {
    disabled: vec![true],
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, disabled).await, ["al-2"]);

  let creator = DescribeAlertDetailsRequest {
    creator: vec!["bob".into(), " ".into()],
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, creator).await, ["al-3"]);

  let search = DescribeAlertDetailsRequest {
    search_word: "cpu".into(),
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, search).await, ["al-2", "al-1"]);

  let literal = DescribeAlertDetailsRequest {
    search_word: "%".into(),
    ..Default::default()
  };
  assert!(detail_ids(&s, literal).await.is_empty());

  let by_id = DescribeAlertDetailsRequest {
    alert_id: vec!["al-1".into(), "al-3".into(), "al-1".into()],
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, by_id).await, ["al-3", "al-1"]);
}

#[tokio::test]
async fn details_scope() {
  let s = store().await;

  let pods = DescribeAlertDetailsRequest {
    resource_search: r#"{"rs_type_name":"pod"}"#.into(),
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, pods).await, ["al-2", "al-1"]);

  let default_ns = DescribeAlertDetailsRequest {
    resource_search: r#"{"rs_type_name":"pod","ns_name":"default","node_id":""}"#.into(),
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, default_ns).await, ["al-1"]);

  let other_node = DescribeAlertDetailsRequest {
    resource_search: r#"{"rs_type_name":"pod","node_id":"node-9"}"#.into(),
    ..Default::default()
  };
  assert!(detail_ids(&s, other_node).await.is_empty());

  let malformed = DescribeAlertDetailsRequest {
    resource_search: r#"{"rs_type_name":"galaxy"}"#.into(),
    ..Default::default()
  };
  assert_eq!(detail_ids(&s, malformed).await, ["al-3", "al-2", "al-1"]);
}

// ─── Alert status ────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_lists_rules_by_create_time_descending() {
  let s = store().await;
  let response = describe_alert_status(&s, &DescribeAlertStatusRequest::default())
    .await
    .unwrap();

  assert_eq!(response.total, 5);
  let pairs: Vec<(&str, &str)> = response
    .alertstatus_set
    .iter()
    .map(|r| (r.alert_id.as_str(), r.rule_id.as_str()))
    .collect();
  assert_eq!(
    pairs,
    [
      ("al-3", "rl-3"),
      ("al-2", "rl-2"),
      ("al-1", "rl-2"),
      ("al-2", "rl-1"),
      ("al-1", "rl-1"),
    ]
  );
}

#[tokio::test]
async fn status_rows_project_their_rule() {
  let s = store().await;
  let request = DescribeAlertStatusRequest {
    alerts:  DescribeAlertDetailsRequest {
      alert_id: vec!["al-1".into()],
      ..Default::default()
    },
    rule_id: vec!["rl-1".into()],
  };
  let response = describe_alert_status(&s, &request).await.unwrap();

  assert_eq!(response.total, 1);
  let row = &response.alertstatus_set[0];
  assert_eq!(row.severity, AlertLevel::Critical);
  assert_eq!(row.metric_name, "pod_cpu_usage");
  assert_eq!(row.consecutive_count, 2);
  let names: Vec<_> = row.resources.iter().map(|r| r.resource_name.as_str()).collect();
  assert_eq!(names, ["podA", "podB"]);
  assert_eq!(row.resources[0].positive_count, 3);
  assert_eq!(row.resources[1].current_level, AlertLevel::Cleared);
}

#[tokio::test]
async fn status_scope_matches_metric_resource_type() {
  let s = store().await;
  let request = DescribeAlertStatusRequest {
    alerts: DescribeAlertDetailsRequest {
      resource_search: r#"{"rs_type_name":"node"}"#.into(),
      ..Default::default()
    },
    ..Default::default()
  };
  let response = describe_alert_status(&s, &request).await.unwrap();
  assert_eq!(response.total, 1);
  assert_eq!(response.alertstatus_set[0].rule_id, "rl-3");
  assert!(response.alertstatus_set[0].resources.is_empty());
}

#[tokio::test]
async fn status_total_counts_all_matches() {
  let s = store().await;
  let request = DescribeAlertStatusRequest {
    alerts: DescribeAlertDetailsRequest { limit: 2, ..Default::default() },
    ..Default::default()
  };
  let response = describe_alert_status(&s, &request).await.unwrap();
  assert_eq!(response.total, 5);
  assert_eq!(response.alertstatus_set.len(), 2);
}

// ─── Alerts by name ──────────────────────────────────────────────────────────

#[tokio::test]
async fn alerts_by_name() {
  let s = store().await;

  let page = get_alerts_by_name(&s, "", "cpu-default, node-load,,").await.unwrap();
  assert_eq!(page.total, 2);
  assert_eq!(ids(&page.items, |a| a.alert_id.as_str()), ["al-3", "al-1"]);
  assert_eq!(page.items[1].rs_filter_id, "rf-pod-default");

  let scoped =
    get_alerts_by_name(&s, r#"{"rs_type_name":"pod"}"#, "cpu-default,node-load")
      .await
      .unwrap();
  assert_eq!(ids(&scoped.items, |a| a.alert_id.as_str()), ["al-1"]);

  let all = get_alerts_by_name(&s, "", "").await.unwrap();
  assert_eq!(all.total, 3);
}

// ─── Evaluator writes ────────────────────────────────────────────────────────

#[tokio::test]
async fn written_documents_are_reported() {
  let s = store().await;

  let mut document = StatusDocument::new();
  let cell = document.cell_mut(ResourceKey::new("rl-3", "node-1").unwrap());
  cell.observe(AlertLevel::Major, RecordedMetric::default(), at(10, 10));
  document.touch(at(10, 10));
  s.put_alert_status("al-3", &document).await.unwrap();

  let response = describe_alert_details(
    &s,
    &DescribeAlertDetailsRequest { alert_id: vec!["al-3".into()], ..Default::default() },
  )
  .await
  .unwrap();
  let detail = &response.alertdetail_set[0];
  assert_eq!(detail.status, StatusAvailability::Available);
  assert_eq!((detail.rules_count, detail.positives_count), (1, 1));

  let missing = s.put_alert_status("al-404", &document).await;
  assert!(matches!(missing, Err(Error::AlertNotFound(id)) if id == "al-404"));
}

#[tokio::test]
async fn legacy_documents_are_reported() {
  let s = store().await;
  s.execute_batch(
    r#"UPDATE alert SET alert_status =
         '{"ResourceStatus":{"rl-3 node 1":{"CurrentLevel":"major","PositiveCount":2}},"UpdateTime":""}'
       WHERE alert_id = 'al-3';"#,
  )
  .await
  .unwrap();

  let request = DescribeAlertStatusRequest {
    rule_id: vec!["rl-3".into()],
    ..Default::default()
  };
  let response = describe_alert_status(&s, &request).await.unwrap();
  let resources = &response.alertstatus_set[0].resources;
  assert_eq!(resources.len(), 1);
  assert_eq!(resources[0].resource_name, "node 1");
  assert_eq!(resources[0].positive_count, 2);
}
