//! Scan configuration.
//!
//! [`ScanConfig`] captures everything a `nats_scan` call binds: the stream
//! to read, the broker endpoint, an optional sequence or wall-clock window,
//! and the payload extraction mode. The configuration is immutable once a
//! scan starts; [`ScanConfig::validate`] enforces the cross-field rules
//! that do not require the protobuf schema to be loaded.

use crate::error::{ScanError, ScanResult};

/// Default broker endpoint.
pub const DEFAULT_URL: &str = "nats://localhost:4222";

/// Configuration for a single stream scan.
///
/// Sequence bounds are inclusive. `end_seq` defaults to `u64::MAX`, a
/// sentinel meaning "clamp to the stream's last sequence once known".
/// Time bounds are nanoseconds since the Unix epoch; `0` means unset.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Name of the JetStream stream to scan.
    pub stream_name: String,
    /// Substring filter applied to each message's subject. Empty disables.
    pub subject_filter: String,
    /// Broker endpoint URL.
    pub url: String,
    /// First sequence to scan (inclusive). `0` means "from the start".
    pub start_seq: u64,
    /// Last sequence to scan (inclusive).
    pub end_seq: u64,
    /// Scan from the first message at or after this timestamp (ns).
    pub start_time_ns: i64,
    /// Scan up to the first message at or after this timestamp (ns).
    pub end_time_ns: i64,
    /// Top-level JSON field names to project as columns.
    pub json_fields: Vec<String>,
    /// Path to a `.proto` schema file.
    pub proto_file: String,
    /// Message type name within the schema file.
    pub proto_message: String,
    /// Dotted leaf field paths to project as columns.
    pub proto_fields: Vec<String>,
}

impl ScanConfig {
    /// Creates a configuration for the given stream with all options at
    /// their defaults.
    #[must_use]
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            subject_filter: String::new(),
            url: DEFAULT_URL.to_string(),
            start_seq: 0,
            end_seq: u64::MAX,
            start_time_ns: 0,
            end_time_ns: 0,
            json_fields: Vec::new(),
            proto_file: String::new(),
            proto_message: String::new(),
            proto_fields: Vec::new(),
        }
    }

    /// Returns whether JSON field extraction is requested.
    #[must_use]
    pub fn has_json_extraction(&self) -> bool {
        !self.json_fields.is_empty()
    }

    /// Returns whether protobuf field extraction is requested.
    #[must_use]
    pub fn has_proto_extraction(&self) -> bool {
        !self.proto_fields.is_empty()
    }

    /// Returns whether a sequence window was explicitly supplied.
    #[must_use]
    pub fn has_sequence_window(&self) -> bool {
        self.start_seq > 0 || self.end_seq != u64::MAX
    }

    /// Returns whether a wall-clock window was supplied.
    #[must_use]
    pub fn has_time_window(&self) -> bool {
        self.start_time_ns > 0 || self.end_time_ns > 0
    }

    /// Checks the cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Argument`] when the stream name is empty, when
    /// both a sequence window and a time window are supplied, when both
    /// JSON and protobuf extraction are requested, or when protobuf
    /// extraction is requested without a schema file or message name.
    pub fn validate(&self) -> ScanResult<()> {
        if self.stream_name.is_empty() {
            return Err(ScanError::Argument(
                "stream name must not be empty".into(),
            ));
        }
        if self.has_sequence_window() && self.has_time_window() {
            return Err(ScanError::Argument(
                "cannot mix sequence-based (start_seq/end_seq) and time-based \
                 (start_time/end_time) windows"
                    .into(),
            ));
        }
        if self.has_json_extraction() && self.has_proto_extraction() {
            return Err(ScanError::Argument(
                "cannot use both json_extract and proto_extract".into(),
            ));
        }
        if self.has_proto_extraction() {
            if self.proto_file.is_empty() {
                return Err(ScanError::Argument(
                    "proto_file is required when using proto_extract".into(),
                ));
            }
            if self.proto_message.is_empty() {
                return Err(ScanError::Argument(
                    "proto_message is required when using proto_extract".into(),
                ));
            }
        }
        Ok(())
    }
}
