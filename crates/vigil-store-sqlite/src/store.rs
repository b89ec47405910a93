//! [`SqliteStore`] — the SQLite implementation of [`AlertStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use vigil_core::{
  alert::{Alert, AlertDetailRow, AlertStatusRow, Page},
  query::{
    AlertDetailSortKey, AlertDetailsQuery, AlertStatusQuery, AlertStatusSortKey,
    Paging,
  },
  scope::ResourceScope,
  status::StatusDocument,
  store::{AlertStore, HistoryEvent, METRICS_PER_ALERT},
};

use crate::{
  Error, Result,
  encode::{RawAlert, RawAlertDetail, RawAlertStatus, decode_dt, encode_dt},
  filter::{Aliases, Conditions, direction_sql},
  schema::SCHEMA,
};

// ─── Joins ───────────────────────────────────────────────────────────────────

const DETAIL_FROM: &str = "FROM alert t1
  LEFT JOIN policy t2          ON t2.policy_id = t1.policy_id
  LEFT JOIN resource_filter t3 ON t3.rs_filter_id = t1.rs_filter_id
  LEFT JOIN resource_type t4   ON t4.rs_type_id = t3.rs_type_id
  LEFT JOIN action t5          ON t5.policy_id = t1.policy_id";

const DETAIL_ALIASES: Aliases = Aliases {
  alert:           "t1",
  policy:          "t2",
  resource_filter: "t3",
  resource_type:   "t4",
};

// The scope's resource type is matched against the rule's metric, the
// sub-filters against the alert's resource filter.
const STATUS_FROM: &str = "FROM alert t1
  JOIN rule t2                 ON t2.policy_id = t1.policy_id
  LEFT JOIN metric t3          ON t3.metric_id = t2.metric_id
  LEFT JOIN resource_filter t4 ON t4.rs_filter_id = t1.rs_filter_id
  LEFT JOIN resource_type t5   ON t5.rs_type_id = t3.rs_type_id
  LEFT JOIN policy t6          ON t6.policy_id = t1.policy_id";

const STATUS_ALIASES: Aliases = Aliases {
  alert:           "t1",
  policy:          "t6",
  resource_filter: "t4",
  resource_type:   "t5",
};

const BY_NAME_FROM: &str = "FROM alert t1
  LEFT JOIN resource_filter t2 ON t2.rs_filter_id = t1.rs_filter_id
  LEFT JOIN resource_type t3   ON t3.rs_type_id = t2.rs_type_id";

fn detail_sort_column(key: AlertDetailSortKey) -> &'static str {
  match key {
    AlertDetailSortKey::AlertId => "t1.alert_id",
    AlertDetailSortKey::AlertName => "t1.alert_name",
    AlertDetailSortKey::CreateTime => "t1.create_time",
    AlertDetailSortKey::RunningStatus => "t1.running_status",
    AlertDetailSortKey::PolicyName => "t2.policy_name",
    AlertDetailSortKey::Creator => "t2.creator",
  }
}

fn status_sort_column(key: AlertStatusSortKey) -> &'static str {
  match key {
    AlertStatusSortKey::RuleId => "t2.rule_id",
    AlertStatusSortKey::RuleName => "t2.rule_name",
    AlertStatusSortKey::Severity => "t2.severity",
    AlertStatusSortKey::MetricName => "t3.metric_name",
    AlertStatusSortKey::CreateTime => "t2.create_time",
    AlertStatusSortKey::UpdateTime => "t2.update_time",
  }
}

/// Run the count and page queries of one listing on the same connection.
fn scan_page<T>(
  conn: &rusqlite::Connection,
  select: &str,
  from: &str,
  conds: &Conditions,
  order_by: &str,
  paging: Option<Paging>,
  map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<(u64, Vec<T>)> {
  let where_clause = conds.where_clause();

  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) {from} {where_clause}"),
    rusqlite::params_from_iter(conds.params()),
    |r| r.get(0),
  )?;

  let mut params = conds.params().to_vec();
  let mut sql = format!("SELECT {select} {from} {where_clause} ORDER BY {order_by}");
  if let Some(paging) = paging {
    sql.push_str(" LIMIT ? OFFSET ?");
    params.push(Value::Integer(paging.limit.into()));
    params.push(Value::Integer(paging.offset.into()));
  }

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params_from_iter(params), map)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok((u64::try_from(total).unwrap_or_default(), rows))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vigil alert store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Evaluator write path ──────────────────────────────────────────────

  /// Replace an alert's status document.
  pub async fn put_alert_status(
    &self,
    alert_id: &str,
    document: &StatusDocument,
  ) -> Result<()> {
    let encoded = document.encode()?;
    let now = encode_dt(Utc::now());
    let id = alert_id.to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE alert SET alert_status = ?1, update_time = ?2 WHERE alert_id = ?3",
          rusqlite::params![encoded, now, id],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::AlertNotFound(alert_id.to_owned()));
    }
    Ok(())
  }

  /// Append an event to an alert's history.
  pub async fn record_event(
    &self,
    alert_id: &str,
    event: HistoryEvent,
    at: DateTime<Utc>,
  ) -> Result<()> {
    let id = alert_id.to_owned();
    let event = event.to_string();
    let at = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO history (alert_id, event, create_time) VALUES (?1, ?2, ?3)",
          rusqlite::params![id, event, at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &str) -> Result<()> {
    let sql = sql.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── AlertStore impl ─────────────────────────────────────────────────────────

impl AlertStore for SqliteStore {
  type Error = Error;

  async fn scan_alert_details(
    &self,
    query: &AlertDetailsQuery,
  ) -> Result<Page<AlertDetailRow>> {
    let mut conds = Conditions::new();
    conds.alert_filter(&query.filter, DETAIL_ALIASES);

    let mut order_by = format!(
      "{} {}",
      detail_sort_column(query.sort.key),
      direction_sql(query.sort.direction)
    );
    if query.sort.key != AlertDetailSortKey::AlertId {
      order_by.push_str(", t1.alert_id DESC");
    }
    let paging = query.paging;

    let (total, raws) = self
      .conn
      .call(move |conn| {
        Ok(scan_page(
          conn,
          RawAlertDetail::COLUMNS,
          DETAIL_FROM,
          &conds,
          &order_by,
          Some(paging),
          RawAlertDetail::from_row,
        )?)
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawAlertDetail::into_row)
      .collect::<Result<_>>()?;
    Ok(Page { total, items })
  }

  async fn scan_alert_status(
    &self,
    query: &AlertStatusQuery,
  ) -> Result<Page<AlertStatusRow>> {
    let mut conds = Conditions::new();
    conds
      .alert_filter(&query.filter, STATUS_ALIASES)
      .where_in("t2.rule_id", &query.rule_ids);

    let order_by = format!(
      "{} {}, t1.alert_id DESC, t2.rule_id ASC",
      status_sort_column(query.sort.key),
      direction_sql(query.sort.direction)
    );
    let paging = query.paging;

    let (total, raws) = self
      .conn
      .call(move |conn| {
        Ok(scan_page(
          conn,
          RawAlertStatus::COLUMNS,
          STATUS_FROM,
          &conds,
          &order_by,
          Some(paging),
          RawAlertStatus::from_row,
        )?)
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawAlertStatus::into_row)
      .collect::<Result<_>>()?;
    Ok(Page { total, items })
  }

  async fn metrics_for_alert(&self, alert_id: &str) -> Result<Vec<String>> {
    let id = alert_id.to_owned();

    let names = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT t3.metric_name
           FROM alert t1
           JOIN rule t2   ON t2.policy_id = t1.policy_id
           JOIN metric t3 ON t3.metric_id = t2.metric_id
           WHERE t1.alert_id = ?1
           ORDER BY t3.metric_name ASC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id, METRICS_PER_ALERT], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(names)
  }

  async fn most_recent_alert_time(
    &self,
    alert_ids: &[String],
  ) -> Result<Option<DateTime<Utc>>> {
    if alert_ids.is_empty() {
      return Ok(None);
    }

    let events: Vec<String> =
      HistoryEvent::ALERTING.iter().map(ToString::to_string).collect();
    let mut conds = Conditions::new();
    conds.where_in("alert_id", alert_ids).where_in("event", &events);

    let latest: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT MAX(create_time) FROM history {}", conds.where_clause()),
          rusqlite::params_from_iter(conds.params()),
          |r| r.get(0),
        )?)
      })
      .await?;

    latest.as_deref().map(decode_dt).transpose()
  }

  async fn alerts_by_name(
    &self,
    scope: Option<&ResourceScope>,
    names: &[String],
  ) -> Result<Page<Alert>> {
    let mut conds = Conditions::new();
    if let Some(scope) = scope {
      conds.scope(scope, "t3.rs_type_name", "t2.rs_filter_param");
    }
    conds.where_in("t1.alert_name", names);

    let (total, raws) = self
      .conn
      .call(move |conn| {
        Ok(scan_page(
          conn,
          RawAlert::COLUMNS,
          BY_NAME_FROM,
          &conds,
          "t1.alert_id DESC",
          None,
          RawAlert::from_row,
        )?)
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawAlert::into_alert)
      .collect::<Result<_>>()?;
    Ok(Page { total, items })
  }
}
