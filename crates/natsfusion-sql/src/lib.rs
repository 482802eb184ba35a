//! # NatsFusion SQL
//!
//! DataFusion surface for scanning NATS JetStream streams with SQL. The
//! `nats_scan` table function exposes a stream's sequence window as a
//! relation whose schema combines fixed metadata columns with projected
//! JSON or protobuf payload fields:
//!
//! ```sql
//! SELECT seq, subject, device_id
//! FROM nats_scan('telemetry', 'subject=sensors.', 'json_extract=device_id')
//! ORDER BY seq;
//! ```
//!
//! ```rust,no_run
//! use datafusion::prelude::SessionContext;
//! use natsfusion_sql::register_nats_scan;
//!
//! let ctx = SessionContext::new();
//! register_nats_scan(&ctx);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

mod args;

/// Execution plan for a NATS stream scan
pub mod exec;

/// The `nats_scan` table function
pub mod function;

/// Table provider for a bound scan
pub mod provider;

pub use exec::NatsScanExec;
pub use function::{register_nats_scan, NatsScanFunc};
pub use provider::NatsStreamProvider;
