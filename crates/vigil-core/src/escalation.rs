//! Transition rules for a [`ResourceStatus`] cell.
//!
//! The evaluator calls [`ResourceStatus::observe`] once per evaluation cycle
//! and, when [`ResourceStatus::should_notify`] allows it, hands the drained
//! window from [`ResourceStatus::record_send`] to the notifier. The rules keep
//! these invariants:
//!
//! - a cleared cell has `positive_count == 0` and no send history;
//! - `next_sendable_time` never moves backwards while the cell stays
//!   positive;
//! - the aggregation window stays bounded (see
//!   [`AggregatedAlerts::record`](crate::status::AggregatedAlerts::record)).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{AggregatedAlerts, AlertLevel, RecordedMetric, ResourceStatus};

// ─── Repeat policy ───────────────────────────────────────────────────────────

/// How often a still-positive cell may notify again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "repeat_type", rename_all = "snake_case")]
pub enum RepeatPolicy {
  /// Notify once per positive episode.
  Once,
  /// Wait the same interval after every send.
  Fixed { interval_secs: u32 },
  /// Double the interval after every send, capped at `max_secs`.
  Increasing { initial_secs: u32, max_secs: u32 },
}

impl RepeatPolicy {
  /// Seconds to wait after the `sends`-th notification of an episode.
  pub fn interval_after(&self, sends: u32) -> u32 {
    match *self {
      Self::Once => 0,
      Self::Fixed { interval_secs } => interval_secs,
      Self::Increasing { initial_secs, max_secs } => {
        let factor = 1u32
          .checked_shl(sends.saturating_sub(1))
          .unwrap_or(u32::MAX);
        initial_secs.saturating_mul(factor).min(max_secs)
      }
    }
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// What a single observation did to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Cleared before, still cleared.
  Quiet,
  /// Cleared before, positive now.
  Raised,
  /// Positive before and now, at a different level.
  LevelChanged,
  /// Positive before and now, at the same level.
  Persisting,
  /// Positive before, cleared now.
  Resolved,
}

impl ResourceStatus {
  pub fn is_positive(&self) -> bool { self.current_level.is_positive() }

  /// Apply one evaluation result. Positive observations fold `sample` into
  /// the aggregation window; a cleared observation resets the cell.
  pub fn observe(
    &mut self,
    level: AlertLevel,
    sample: RecordedMetric,
    now: DateTime<Utc>,
  ) -> Transition {
    let was_positive = self.is_positive();

    if !level.is_positive() {
      *self = ResourceStatus::default();
      return if was_positive { Transition::Resolved } else { Transition::Quiet };
    }

    let transition = match (was_positive, self.current_level == level) {
      (false, _) => Transition::Raised,
      (true, false) => Transition::LevelChanged,
      (true, true) => Transition::Persisting,
    };

    self.current_level = level;
    self.positive_count = self.positive_count.saturating_add(1);
    self.aggregated_alerts.record(sample, now);
    transition
  }

  /// Whether a notification may go out at `now`.
  ///
  /// `required_consecutive` is the rule's consecutive-count threshold; a value
  /// of zero behaves like one.
  pub fn should_notify(
    &self,
    now: DateTime<Utc>,
    required_consecutive: u32,
    policy: &RepeatPolicy,
  ) -> bool {
    if !self.is_positive() || self.positive_count < required_consecutive.max(1) {
      return false;
    }
    if matches!(policy, RepeatPolicy::Once) && self.cumulated_send_count > 0 {
      return false;
    }
    self.next_sendable_time.is_none_or(|t| now >= t)
  }

  /// Record a notification sent at `now` and return the window it
  /// summarized. The next sendable time only ever moves forward.
  pub fn record_send(
    &mut self,
    now: DateTime<Utc>,
    policy: &RepeatPolicy,
  ) -> AggregatedAlerts {
    self.cumulated_send_count = self.cumulated_send_count.saturating_add(1);
    self.next_resend_interval = policy.interval_after(self.cumulated_send_count);

    let candidate = now + Duration::seconds(i64::from(self.next_resend_interval));
    self.next_sendable_time = Some(match self.next_sendable_time {
      Some(previous) => previous.max(candidate),
      None => candidate,
    });

    std::mem::take(&mut self.aggregated_alerts)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  fn sample() -> RecordedMetric {
    RecordedMetric {
      rule_name:     "mem-high".into(),
      resource_name: "node-1".into(),
      values:        vec![serde_json::json!({ "t": 0, "v": "0.93" })],
    }
  }

  #[test]
  fn increasing_policy_doubles_and_caps() {
    let policy = RepeatPolicy::Increasing { initial_secs: 60, max_secs: 600 };
    let intervals: Vec<_> = (1..=6).map(|n| policy.interval_after(n)).collect();
    assert_eq!(intervals, [60, 120, 240, 480, 600, 600]);
    assert_eq!(policy.interval_after(64), 600);
  }

  #[test]
  fn repeat_policy_reads_from_policy_config() {
    let policy: RepeatPolicy = serde_json::from_str(
      r#"{"repeat_type":"increasing","initial_secs":300,"max_secs":3600}"#,
    )
    .unwrap();
    assert_eq!(
      policy,
      RepeatPolicy::Increasing { initial_secs: 300, max_secs: 3600 }
    );
  }

  #[test]
  fn observe_tracks_transitions() {
    let mut cell = ResourceStatus::default();
    assert_eq!(cell.observe(AlertLevel::Cleared, sample(), at(0)), Transition::Quiet);
    assert_eq!(cell.observe(AlertLevel::Major, sample(), at(60)), Transition::Raised);
    assert_eq!(cell.observe(AlertLevel::Major, sample(), at(120)), Transition::Persisting);
    assert_eq!(
      cell.observe(AlertLevel::Critical, sample(), at(180)),
      Transition::LevelChanged
    );
    assert_eq!(cell.positive_count, 3);
    assert_eq!(cell.aggregated_alerts.cumulated_count, 3);
    assert_eq!(cell.aggregated_alerts.first_alert_time, Some(at(60).into()));
    assert_eq!(cell.aggregated_alerts.last_alert_time, Some(at(180).into()));
  }

  #[test]
  fn clearing_resets_the_cell() {
    let policy = RepeatPolicy::Fixed { interval_secs: 300 };
    let mut cell = ResourceStatus::default();
    cell.observe(AlertLevel::Critical, sample(), at(0));
    cell.record_send(at(0), &policy);

    assert_eq!(cell.observe(AlertLevel::Cleared, sample(), at(60)), Transition::Resolved);
    assert_eq!(cell.positive_count, 0);
    assert_eq!(cell.cumulated_send_count, 0);
    assert!(cell.next_sendable_time.is_none());
    assert!(cell.aggregated_alerts.is_empty());
  }

  #[test]
  fn notify_waits_for_consecutive_positives() {
    let policy = RepeatPolicy::Fixed { interval_secs: 60 };
    let mut cell = ResourceStatus::default();
    cell.observe(AlertLevel::Warning, sample(), at(0));
    assert!(!cell.should_notify(at(0), 2, &policy));
    cell.observe(AlertLevel::Warning, sample(), at(30));
    assert!(cell.should_notify(at(30), 2, &policy));
  }

  #[test]
  fn resend_backoff_never_shrinks() {
    let policy = RepeatPolicy::Increasing { initial_secs: 60, max_secs: 3600 };
    let mut cell = ResourceStatus::default();
    cell.observe(AlertLevel::Critical, sample(), at(0));

    let mut now = at(0);
    let mut last_sendable = None;
    for _ in 0..5 {
      assert!(cell.should_notify(now, 1, &policy));
      let summary = cell.record_send(now, &policy);
      assert!(cell.next_sendable_time >= last_sendable);
      last_sendable = cell.next_sendable_time;

      // Suppressed until the backoff elapses.
      assert!(!cell.should_notify(now, 1, &policy));
      now = cell.next_sendable_time.unwrap();
      cell.observe(AlertLevel::Critical, sample(), now);
      assert!(summary.cumulated_count >= 1);
    }
    assert_eq!(cell.cumulated_send_count, 5);
    assert_eq!(cell.next_resend_interval, 960);
  }

  #[test]
  fn send_drains_the_window() {
    let policy = RepeatPolicy::Fixed { interval_secs: 60 };
    let mut cell = ResourceStatus::default();
    cell.observe(AlertLevel::Critical, sample(), at(0));
    cell.observe(AlertLevel::Critical, sample(), at(10));

    let summary = cell.record_send(at(10), &policy);
    assert_eq!(summary.cumulated_count, 2);
    assert!(cell.aggregated_alerts.is_empty());
    assert_eq!(cell.next_sendable_time, Some(at(70)));
  }

  #[test]
  fn once_policy_sends_a_single_notification() {
    let policy = RepeatPolicy::Once;
    let mut cell = ResourceStatus::default();
    cell.observe(AlertLevel::Major, sample(), at(0));
    assert!(cell.should_notify(at(0), 1, &policy));
    cell.record_send(at(0), &policy);
    cell.observe(AlertLevel::Major, sample(), at(3600));
    assert!(!cell.should_notify(at(3600), 1, &policy));
  }
}
