//! Core types for Vigil: the per-alert escalation state, its read-side
//! projections, and the status reporter.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::AlertStore`]; the describe operations in [`report`]
//! run against any such backend.

// Native `async fn` in traits; the trait methods spell out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod error;
pub mod escalation;
pub mod projector;
pub mod query;
pub mod report;
pub mod scope;
pub mod status;
pub mod store;
pub mod time;

pub use error::{Error, Result};
