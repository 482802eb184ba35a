//! Broker access for sequence-addressed message fetches.
//!
//! [`StreamFetcher`] is the seam between the scan driver and the broker:
//! `open` yields the stream's sequence bounds, `fetch` returns the message
//! at one sequence or `None` when that sequence is absent (purged or
//! deleted). [`NatsFetcher`] implements it over a JetStream direct get,
//! one round-trip per sequence; a batched or server-filtered fetch can be
//! swapped in behind the same trait without touching the driver.

use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::stream::DirectGetErrorKind;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};

/// Timeout applied to the initial broker connect.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// First and last sequence of a stream, snapshot at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBounds {
    /// First sequence currently present in the stream.
    pub first_seq: u64,
    /// Last sequence currently present in the stream.
    pub last_seq: u64,
}

/// One message fetched by sequence.
///
/// The sequence itself is not carried: the caller addressed the fetch and
/// already knows it.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// The message's subject.
    pub subject: String,
    /// Raw payload bytes.
    pub payload: Bytes,
    /// Broker receive timestamp, nanoseconds since the Unix epoch.
    pub timestamp_ns: i64,
}

/// Sequence-addressed access to one stream.
#[async_trait]
pub trait StreamFetcher: Send {
    /// Connects (if needed) and returns the stream's sequence bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Connection`] when the broker is unreachable or
    /// the stream is unknown.
    async fn open(&mut self) -> ScanResult<StreamBounds>;

    /// Fetches the message at `sequence`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Fetch`] for any broker failure other than the
    /// sequence being absent.
    async fn fetch(&mut self, sequence: u64) -> ScanResult<Option<FetchedMessage>>;
}

/// [`StreamFetcher`] over a NATS JetStream direct get.
pub struct NatsFetcher {
    url: String,
    stream_name: String,
    stream: Option<jetstream::stream::Stream>,
}

impl NatsFetcher {
    /// Creates a fetcher for the configured stream. No connection is made
    /// until [`StreamFetcher::open`].
    #[must_use]
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            url: config.url.clone(),
            stream_name: config.stream_name.clone(),
            stream: None,
        }
    }
}

impl std::fmt::Debug for NatsFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsFetcher")
            .field("url", &self.url)
            .field("stream_name", &self.stream_name)
            .field("connected", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StreamFetcher for NatsFetcher {
    async fn open(&mut self) -> ScanResult<StreamBounds> {
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(CONNECT_TIMEOUT)
            .connect(self.url.as_str())
            .await
            .map_err(|err| {
                ScanError::Connection(format!("failed to connect to {}: {err}", self.url))
            })?;
        let context = jetstream::new(client);
        let stream = context.get_stream(&self.stream_name).await.map_err(|err| {
            ScanError::Connection(format!(
                "failed to get stream info for '{}': {err}",
                self.stream_name
            ))
        })?;

        let state = &stream.cached_info().state;
        let bounds = StreamBounds {
            first_seq: state.first_sequence,
            last_seq: state.last_sequence,
        };
        info!(
            url = %self.url,
            stream = %self.stream_name,
            first_seq = bounds.first_seq,
            last_seq = bounds.last_seq,
            "connected to JetStream"
        );
        self.stream = Some(stream);
        Ok(bounds)
    }

    #[allow(clippy::cast_possible_truncation)] // i128 nanoseconds fit i64 until year 2262
    async fn fetch(&mut self, sequence: u64) -> ScanResult<Option<FetchedMessage>> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| ScanError::Connection("fetcher is not open".into()))?;

        match stream.direct_get(sequence).await {
            Ok(message) => Ok(Some(FetchedMessage {
                subject: message.subject.to_string(),
                timestamp_ns: message.time.unix_timestamp_nanos() as i64,
                payload: message.payload,
            })),
            Err(err) if matches!(err.kind(), DirectGetErrorKind::NotFound) => {
                debug!(sequence, "sequence absent, skipping");
                Ok(None)
            }
            Err(err) => Err(ScanError::Fetch {
                sequence,
                message: err.to_string(),
            }),
        }
    }
}
