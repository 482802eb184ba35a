//! # NatsFusion Connector
//!
//! Core machinery for scanning NATS JetStream streams as Arrow record
//! batches: scan configuration, output schema synthesis, JSON and
//! protobuf payload projection, wall-clock to sequence resolution, and
//! the sequence-cursor scan driver.
//!
//! This crate is engine-independent; the DataFusion surface lives in
//! `natsfusion-sql`.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

/// Row-batch assembly and extraction cell values
pub mod batch;

/// Scan configuration and validation
pub mod config;

/// Scan error types
pub mod error;

/// Broker fetch abstraction and its JetStream implementation
pub mod fetch;

/// JSON payload projection
pub mod json;

/// Protobuf schema compilation, type mapping, and payload projection
pub mod proto;

/// Output schema synthesis
pub mod schema;

/// The stream scan driver
pub mod scan;

mod range;
#[cfg(test)]
mod testing;

pub use batch::CellValue;
pub use config::{ScanConfig, DEFAULT_URL};
pub use error::{ScanError, ScanResult};
pub use fetch::{FetchedMessage, NatsFetcher, StreamBounds, StreamFetcher};
pub use proto::{ProtoProjection, ProtoProjector};
pub use scan::{StreamScan, DEFAULT_BATCH_SIZE};
pub use schema::{output_schema, FIXED_COLUMNS};
