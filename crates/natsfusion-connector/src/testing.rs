//! In-memory fetcher for driver and resolver tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ScanError, ScanResult};
use crate::fetch::{FetchedMessage, StreamBounds, StreamFetcher};

/// A [`StreamFetcher`] over an in-memory message map. Sequences absent
/// from the map behave like purged sequences on a real stream.
pub(crate) struct MemoryFetcher {
    bounds: StreamBounds,
    messages: BTreeMap<u64, FetchedMessage>,
    /// Sequence at which `fetch` fails with a broker error, if any.
    poisoned: Option<u64>,
}

impl MemoryFetcher {
    pub(crate) fn new(first_seq: u64, last_seq: u64) -> Self {
        Self {
            bounds: StreamBounds {
                first_seq,
                last_seq,
            },
            messages: BTreeMap::new(),
            poisoned: None,
        }
    }

    pub(crate) fn insert(
        &mut self,
        seq: u64,
        subject: &str,
        payload: impl Into<Bytes>,
        timestamp_ns: i64,
    ) -> &mut Self {
        self.messages.insert(
            seq,
            FetchedMessage {
                subject: subject.to_string(),
                payload: payload.into(),
                timestamp_ns,
            },
        );
        self
    }

    pub(crate) fn poison(&mut self, seq: u64) -> &mut Self {
        self.poisoned = Some(seq);
        self
    }
}

#[async_trait]
impl StreamFetcher for MemoryFetcher {
    async fn open(&mut self) -> ScanResult<StreamBounds> {
        Ok(self.bounds)
    }

    async fn fetch(&mut self, sequence: u64) -> ScanResult<Option<FetchedMessage>> {
        if self.poisoned == Some(sequence) {
            return Err(ScanError::Fetch {
                sequence,
                message: "injected broker failure".into(),
            });
        }
        Ok(self.messages.get(&sequence).cloned())
    }
}
