//! Resource scope filters.
//!
//! Clients narrow describe queries with a JSON object such as
//! `{"rs_type_name":"pod","ns_name":"default","node_id":"node-1"}`. Each
//! resource type only carries the sub-filters that make sense for it; keys
//! that do not belong to the declared type are ignored.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result};

/// The kinds of resource an alert can be scoped to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceTypeName {
  Cluster,
  Node,
  Workspace,
  Namespace,
  Workload,
  Pod,
  Container,
}

/// A typed resource scope selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rs_type_name", rename_all = "lowercase")]
pub enum ResourceScope {
  Cluster,
  Node,
  Workspace {
    #[serde(default)]
    ws_name: Option<String>,
  },
  Namespace {
    #[serde(default)]
    ns_name: Option<String>,
  },
  Workload {
    #[serde(default)]
    ns_name: Option<String>,
  },
  Pod {
    #[serde(default)]
    ns_name: Option<String>,
    #[serde(default)]
    node_id: Option<String>,
  },
  Container {
    #[serde(default)]
    ns_name:  Option<String>,
    #[serde(default)]
    node_id:  Option<String>,
    #[serde(default)]
    pod_name: Option<String>,
  },
}

impl ResourceScope {
  /// Parse a scope from its JSON text. Blank input means "no scope".
  pub fn parse(raw: &str) -> Result<Option<Self>> {
    if raw.trim().is_empty() {
      return Ok(None);
    }
    serde_json::from_str(raw)
      .map(Some)
      .map_err(|e| Error::InvalidScope(e.to_string()))
  }

  /// Like [`ResourceScope::parse`], but a malformed scope is logged and
  /// dropped so the query runs without that narrowing.
  pub fn parse_lenient(raw: &str) -> Option<Self> {
    match Self::parse(raw) {
      Ok(scope) => scope,
      Err(e) => {
        tracing::warn!(resource_search = raw, error = %e, "ignoring resource scope");
        None
      }
    }
  }

  pub fn type_name(&self) -> ResourceTypeName {
    match self {
      Self::Cluster => ResourceTypeName::Cluster,
      Self::Node => ResourceTypeName::Node,
      Self::Workspace { .. } => ResourceTypeName::Workspace,
      Self::Namespace { .. } => ResourceTypeName::Namespace,
      Self::Workload { .. } => ResourceTypeName::Workload,
      Self::Pod { .. } => ResourceTypeName::Pod,
      Self::Container { .. } => ResourceTypeName::Container,
    }
  }

  /// The non-empty sub-filters as `(filter-param key, value)` pairs, matched
  /// against the resource filter's JSON parameters.
  pub fn param_filters(&self) -> Vec<(&'static str, &str)> {
    let candidates: Vec<(&'static str, &Option<String>)> = match self {
      Self::Cluster | Self::Node => Vec::new(),
      Self::Workspace { ws_name } => vec![("ws_name", ws_name)],
      Self::Namespace { ns_name } | Self::Workload { ns_name } => {
        vec![("ns_name", ns_name)]
      }
      Self::Pod { ns_name, node_id } => {
        vec![("ns_name", ns_name), ("node_id", node_id)]
      }
      Self::Container { ns_name, node_id, pod_name } => vec![
        ("ns_name", ns_name),
        ("node_id", node_id),
        ("pod_name", pod_name),
      ],
    };

    candidates
      .into_iter()
      .filter_map(|(key, value)| {
        value.as_deref().filter(|v| !v.is_empty()).map(|v| (key, v))
      })
      .collect()
  }
}
