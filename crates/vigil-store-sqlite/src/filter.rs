//! Dynamic WHERE-clause construction.
//!
//! Column names and JSON paths come from code, never from requests; every
//! request value is bound as a positional `?` parameter.

use rusqlite::types::Value;
use vigil_core::{
  query::{AlertFilter, Direction},
  scope::ResourceScope,
};

/// Table aliases used by the join a filter is applied to.
#[derive(Debug, Clone, Copy)]
pub struct Aliases {
  pub alert:           &'static str,
  pub policy:          &'static str,
  pub resource_filter: &'static str,
  pub resource_type:   &'static str,
}

#[derive(Debug, Default)]
pub struct Conditions {
  clauses: Vec<String>,
  params:  Vec<Value>,
}

impl Conditions {
  pub fn new() -> Self { Self::default() }

  /// `column IN (?, ?, ...)`; an empty set adds nothing.
  pub fn where_in<T>(&mut self, column: &str, values: &[T]) -> &mut Self
  where
    T: Clone + Into<Value>,
  {
    if values.is_empty() {
      return self;
    }
    let placeholders = vec!["?"; values.len()].join(", ");
    self.clauses.push(format!("{column} IN ({placeholders})"));
    self.params.extend(values.iter().cloned().map(Into::into));
    self
  }

  pub fn eq(&mut self, expr: &str, value: impl Into<Value>) -> &mut Self {
    self.clauses.push(format!("{expr} = ?"));
    self.params.push(value.into());
    self
  }

  /// Case-sensitive substring match; `%` and `_` in `needle` match
  /// literally.
  pub fn contains(&mut self, column: &str, needle: &str) -> &mut Self {
    let escaped = needle
      .replace('\\', "\\\\")
      .replace('%', "\\%")
      .replace('_', "\\_");
    self.clauses.push(format!("{column} LIKE ? ESCAPE '\\'"));
    self.params.push(format!("%{escaped}%").into());
    self
  }

  /// `json_extract(column, '$.<key>') = value`.
  pub fn json_eq(&mut self, column: &str, key: &str, value: &str) -> &mut Self {
    self.clauses.push(format!("json_extract({column}, ?) = ?"));
    self.params.push(format!("$.{key}").into());
    self.params.push(value.to_owned().into());
    self
  }

  /// Restrict to a resource type and its non-empty sub-filters.
  pub fn scope(
    &mut self,
    scope: &ResourceScope,
    type_column: &str,
    param_column: &str,
  ) -> &mut Self {
    self.eq(type_column, scope.type_name().to_string());
    for (key, value) in scope.param_filters() {
      self.json_eq(param_column, key, value);
    }
    self
  }

  /// The identifier-set, search and scope filters shared by the describe
  /// queries.
  pub fn alert_filter(&mut self, filter: &AlertFilter, t: Aliases) -> &mut Self {
    let a = t.alert;
    self
      .where_in(&format!("{a}.alert_id"), &filter.alert_ids)
      .where_in(&format!("{a}.alert_name"), &filter.alert_names)
      .where_in(&format!("{a}.disabled"), &filter.disabled)
      .where_in(&format!("{a}.running_status"), &filter.running_status)
      .where_in(&format!("{a}.policy_id"), &filter.policy_ids)
      .where_in(&format!("{a}.rs_filter_id"), &filter.rs_filter_ids)
      .where_in(&format!("{a}.executor_id"), &filter.executor_ids)
      .where_in(&format!("{}.creator", t.policy), &filter.creators);

    if let Some(word) = &filter.search_word {
      self.contains(&format!("{a}.alert_name"), word);
    }
    if let Some(scope) = &filter.scope {
      self.scope(
        scope,
        &format!("{}.rs_type_name", t.resource_type),
        &format!("{}.rs_filter_param", t.resource_filter),
      );
    }
    self
  }

  /// `WHERE a AND b ...`, or the empty string.
  pub fn where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }

  pub fn params(&self) -> &[Value] { &self.params }
}

pub fn direction_sql(direction: Direction) -> &'static str {
  match direction {
    Direction::Asc => "ASC",
    Direction::Desc => "DESC",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_conditions_have_no_where() {
    let conds = Conditions::new();
    assert_eq!(conds.where_clause(), "");
    assert!(conds.params().is_empty());
  }

  #[test]
  fn in_lists_bind_every_value() {
    let mut conds = Conditions::new();
    conds
      .where_in("t1.alert_id", &["a".to_owned(), "b".to_owned()])
      .where_in::<String>("t1.alert_name", &[])
      .where_in("t1.disabled", &[false]);
    assert_eq!(
      conds.where_clause(),
      "WHERE t1.alert_id IN (?, ?) AND t1.disabled IN (?)"
    );
    assert_eq!(conds.params().len(), 3);
    assert_eq!(conds.params()[2], Value::Integer(0));
  }

  #[test]
  fn scope_adds_type_and_sub_filters() {
    let scope = ResourceScope::Pod {
      ns_name: Some("default".into()),
      node_id: Some(String::new()),
    };
    let mut conds = Conditions::new();
    conds.scope(&scope, "t4.rs_type_name", "t3.rs_filter_param");
    assert_eq!(
      conds.where_clause(),
      "WHERE t4.rs_type_name = ? AND json_extract(t3.rs_filter_param, ?) = ?"
    );
    assert_eq!(
      conds.params(),
      [
        Value::Text("pod".into()),
        Value::Text("$.ns_name".into()),
        Value::Text("default".into()),
      ]
    );
  }

  #[test]
  fn search_word_is_escaped() {
    let mut conds = Conditions::new();
    conds.contains("t1.alert_name", "100%_cpu");
    assert_eq!(conds.params(), [Value::Text("%100\\%\\_cpu%".into())]);
  }
}
