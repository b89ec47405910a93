//! SQL schema for the Vigil SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 UTC text, so lexical order is
/// chronological order.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS resource_type (
    rs_type_id   TEXT PRIMARY KEY,
    rs_type_name TEXT NOT NULL UNIQUE   -- cluster | node | workspace | ...
);

CREATE TABLE IF NOT EXISTS resource_filter (
    rs_filter_id    TEXT PRIMARY KEY,
    rs_filter_name  TEXT NOT NULL DEFAULT '',
    rs_filter_param TEXT NOT NULL DEFAULT '{}',   -- JSON scope parameters
    rs_type_id      TEXT REFERENCES resource_type(rs_type_id),
    create_time     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS metric (
    metric_id   TEXT PRIMARY KEY,
    metric_name TEXT NOT NULL,
    rs_type_id  TEXT REFERENCES resource_type(rs_type_id)
);

CREATE TABLE IF NOT EXISTS policy (
    policy_id            TEXT PRIMARY KEY,
    policy_name          TEXT NOT NULL DEFAULT '',
    policy_description   TEXT NOT NULL DEFAULT '',
    policy_config        TEXT NOT NULL DEFAULT '{}',
    creator              TEXT NOT NULL DEFAULT '',
    available_start_time TEXT NOT NULL DEFAULT '',
    available_end_time   TEXT NOT NULL DEFAULT '',
    create_time          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rule (
    rule_id           TEXT PRIMARY KEY,
    rule_name         TEXT NOT NULL DEFAULT '',
    disabled          INTEGER NOT NULL DEFAULT 0,
    monitor_periods   INTEGER NOT NULL DEFAULT 1,
    severity          TEXT NOT NULL DEFAULT 'minor',
    metrics_type      TEXT NOT NULL DEFAULT '',
    condition_type    TEXT NOT NULL DEFAULT '',
    thresholds        TEXT NOT NULL DEFAULT '',
    unit              TEXT NOT NULL DEFAULT '',
    consecutive_count INTEGER NOT NULL DEFAULT 1,
    inhibit           INTEGER NOT NULL DEFAULT 0,
    policy_id         TEXT NOT NULL REFERENCES policy(policy_id),
    metric_id         TEXT REFERENCES metric(metric_id),
    create_time       TEXT NOT NULL,
    update_time       TEXT NOT NULL
);

-- At most one notification action per policy.
CREATE TABLE IF NOT EXISTS action (
    action_id          TEXT PRIMARY KEY,
    policy_id          TEXT NOT NULL UNIQUE REFERENCES policy(policy_id),
    nf_address_list_id TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS alert (
    alert_id       TEXT PRIMARY KEY,
    alert_name     TEXT NOT NULL,
    disabled       INTEGER NOT NULL DEFAULT 0,
    running_status TEXT NOT NULL DEFAULT '',
    alert_status   TEXT,                   -- status document; NULL until evaluated
    policy_id      TEXT REFERENCES policy(policy_id),
    rs_filter_id   TEXT REFERENCES resource_filter(rs_filter_id),
    executor_id    TEXT NOT NULL DEFAULT '',
    create_time    TEXT NOT NULL,
    update_time    TEXT NOT NULL
);

-- Append-only event log written by the evaluator.
CREATE TABLE IF NOT EXISTS history (
    history_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id      TEXT NOT NULL REFERENCES alert(alert_id),
    rule_id       TEXT NOT NULL DEFAULT '',
    resource_name TEXT NOT NULL DEFAULT '',
    event         TEXT NOT NULL,   -- triggered | sent_success | sent_failed | ...
    content       TEXT NOT NULL DEFAULT '',
    create_time   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS alert_policy_idx      ON alert(policy_id);
CREATE INDEX IF NOT EXISTS alert_name_idx        ON alert(alert_name);
CREATE INDEX IF NOT EXISTS rule_policy_idx       ON rule(policy_id);
CREATE INDEX IF NOT EXISTS history_alert_idx     ON history(alert_id, event);
CREATE INDEX IF NOT EXISTS history_create_idx    ON history(create_time);

PRAGMA user_version = 1;
";
