//! The stream scan driver.
//!
//! [`StreamScan`] owns the per-query cursor state and drives the fetch
//! loop: connect lazily on the first batch request, clamp the sequence
//! window to the stream's bounds, resolve any wall-clock bounds to
//! sequences, then fetch messages one sequence at a time, filter by
//! subject, project payloads, and emit fixed-size record batches.
//!
//! The phase machine is monotone:
//!
//! ```text
//! Uninitialised -> Scanning -> Done
//! ```
//!
//! `next_batch` returning `Ok(None)` signals Done. Rows are emitted in
//! strictly ascending sequence order; absent sequences are skipped
//! silently.

use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use tracing::debug;

use crate::batch::{CellValue, RowBatchBuilder};
use crate::config::ScanConfig;
use crate::error::ScanResult;
use crate::fetch::StreamFetcher;
use crate::json::JsonProjector;
use crate::proto::{ProtoProjection, ProtoProjector};
use crate::range::first_sequence_at_or_after;

/// Default rows per emitted batch when the host engine does not dictate one.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    Uninitialised,
    Scanning,
    Done,
}

/// The payload projector selected at bind time, if any.
enum Projector {
    Json(JsonProjector),
    Proto(ProtoProjector),
}

impl Projector {
    fn project(&self, payload: &[u8]) -> Vec<Option<CellValue>> {
        match self {
            Self::Json(projector) => projector
                .project(payload)
                .into_iter()
                .map(|cell| cell.map(CellValue::Str))
                .collect(),
            Self::Proto(projector) => projector.project(payload),
        }
    }
}

/// A single scan over one stream's sequence window.
///
/// Construct one per query; the driver is single-threaded and pulled.
/// All broker work happens inside [`next_batch`](Self::next_batch) so
/// construction is cheap and infallible.
pub struct StreamScan {
    config: Arc<ScanConfig>,
    schema: SchemaRef,
    projector: Option<Projector>,
    fetcher: Box<dyn StreamFetcher>,
    batch_size: usize,
    phase: ScanPhase,
    current_seq: u64,
    end_seq: u64,
}

impl StreamScan {
    /// Creates a scan over `fetcher` with the bound configuration.
    ///
    /// `schema` must be the output schema synthesised for this
    /// configuration, and `proto` the projection compiled from it when
    /// protobuf extraction is active.
    #[must_use]
    pub fn new(
        config: Arc<ScanConfig>,
        proto: Option<ProtoProjection>,
        schema: SchemaRef,
        fetcher: Box<dyn StreamFetcher>,
        batch_size: usize,
    ) -> Self {
        let projector = match proto {
            Some(projection) => Some(Projector::Proto(ProtoProjector::new(projection))),
            None if config.has_json_extraction() => {
                Some(Projector::Json(JsonProjector::new(config.json_fields.clone())))
            }
            None => None,
        };
        let end_seq = config.end_seq;

        Self {
            config,
            schema,
            projector,
            fetcher,
            batch_size: batch_size.max(1),
            phase: ScanPhase::Uninitialised,
            current_seq: 0,
            end_seq,
        }
    }

    /// Produces the next batch, or `None` once the window is exhausted.
    ///
    /// The first call connects to the broker and resolves any time bounds;
    /// later calls resume the fetch loop at the saved cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ScanError`] on connection failure, on any
    /// fetch failure other than an absent sequence, or on batch assembly
    /// failure. Payload decode failures never error.
    pub async fn next_batch(&mut self) -> ScanResult<Option<RecordBatch>> {
        if self.phase == ScanPhase::Uninitialised {
            self.open().await?;
        }
        if self.phase == ScanPhase::Done {
            return Ok(None);
        }
        self.fill_batch().await
    }

    /// Connects, snapshots stream bounds, and resolves the scan window.
    async fn open(&mut self) -> ScanResult<()> {
        let bounds = self.fetcher.open().await?;

        if self.end_seq == u64::MAX {
            self.end_seq = bounds.last_seq;
        }
        self.current_seq = self.config.start_seq.max(1);

        if self.config.start_time_ns > 0 {
            let resolved = first_sequence_at_or_after(
                self.fetcher.as_mut(),
                self.config.start_time_ns,
                bounds.first_seq,
                bounds.last_seq,
            )
            .await?;
            match resolved {
                Some(seq) => self.current_seq = seq,
                None => {
                    // Nothing at or after the start bound: the scan is empty.
                    self.phase = ScanPhase::Done;
                    return Ok(());
                }
            }
        }

        if self.config.end_time_ns > 0 {
            // The window is inclusive: the last in-window sequence is one
            // before the first message strictly after the end bound.
            let resolved = first_sequence_at_or_after(
                self.fetcher.as_mut(),
                self.config.end_time_ns + 1,
                bounds.first_seq,
                bounds.last_seq,
            )
            .await?;
            if let Some(seq) = resolved {
                self.end_seq = seq.saturating_sub(1);
            }
        }

        debug!(
            current_seq = self.current_seq,
            end_seq = self.end_seq,
            "scan window resolved"
        );
        self.phase = ScanPhase::Scanning;
        Ok(())
    }

    /// Fetches messages until the batch is full or the window is exhausted.
    async fn fill_batch(&mut self) -> ScanResult<Option<RecordBatch>> {
        let mut builder = RowBatchBuilder::new(self.schema.clone())?;

        while builder.rows() < self.batch_size && self.current_seq <= self.end_seq {
            let seq = self.current_seq;
            let Some(message) = self.fetcher.fetch(seq).await? else {
                self.current_seq += 1;
                continue;
            };

            if !self.config.subject_filter.is_empty()
                && !message.subject.contains(&self.config.subject_filter)
            {
                self.current_seq += 1;
                continue;
            }

            let cells = match &self.projector {
                Some(projector) => projector.project(&message.payload),
                None => Vec::new(),
            };
            builder.append_row(
                &self.config.stream_name,
                &message.subject,
                seq,
                message.timestamp_ns / 1000,
                &message.payload,
                cells,
            );
            self.current_seq += 1;
        }

        if self.current_seq > self.end_seq {
            self.phase = ScanPhase::Done;
        }
        if builder.rows() == 0 {
            return Ok(None);
        }
        debug!(rows = builder.rows(), next_seq = self.current_seq, "emitted batch");
        Ok(Some(builder.finish()?))
    }
}

impl std::fmt::Debug for StreamScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamScan")
            .field("stream", &self.config.stream_name)
            .field("phase", &self.phase)
            .field("current_seq", &self.current_seq)
            .field("end_seq", &self.end_seq)
            .finish_non_exhaustive()
    }
}
