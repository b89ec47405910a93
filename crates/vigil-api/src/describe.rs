//! Handlers for the describe endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/alert_details` | Alerts with policy, scope, metrics and status counts |
//! | `GET`  | `/alert_status`  | Per-rule rows with tracked resources; accepts `rule_id` |
//! | `GET`  | `/alerts`        | `?alert_name=a,b[&resource_search=...]` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use vigil_core::{
  alert::{Alert, Page},
  report::{self, DescribeAlertDetailsResponse, DescribeAlertStatusResponse},
  store::AlertStore,
};

use crate::{
  error::ApiError,
  params::{AlertsByNameParams, DescribeParams},
};

/// `GET /alert_details`
pub async fn alert_details<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DescribeParams>,
) -> Result<Json<DescribeAlertDetailsResponse>, ApiError>
where
  S: AlertStore,
{
  let request = params.into_details_request()?;
  let response = report::describe_alert_details(store.as_ref(), &request)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(response))
}

/// `GET /alert_status`
pub async fn alert_status<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DescribeParams>,
) -> Result<Json<DescribeAlertStatusResponse>, ApiError>
where
  S: AlertStore,
{
  let request = params.into_status_request()?;
  let response = report::describe_alert_status(store.as_ref(), &request)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(response))
}

/// `GET /alerts`
pub async fn alerts_by_name<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<AlertsByNameParams>,
) -> Result<Json<Page<Alert>>, ApiError>
where
  S: AlertStore,
{
  let page = report::get_alerts_by_name(
    store.as_ref(),
    params.resource_search.as_deref().unwrap_or_default(),
    params.alert_name.as_deref().unwrap_or_default(),
  )
  .await
  .map_err(ApiError::store)?;
  Ok(Json(page))
}
