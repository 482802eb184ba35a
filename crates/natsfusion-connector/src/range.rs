//! Wall-clock to sequence resolution.
//!
//! JetStream streams have no timestamp index, but timestamps of present
//! messages are non-decreasing in sequence order, so a time bound can be
//! resolved by binary search over `[first_seq, last_seq]` with direct-get
//! probes. Absent sequences (retention, explicit deletes) are expected:
//! a not-found probe advances the left edge without narrowing the right,
//! which keeps the search correct on gappy streams.

use tracing::debug;

use crate::error::ScanResult;
use crate::fetch::StreamFetcher;

/// Finds the smallest sequence whose timestamp is at or after `target_ns`,
/// or `None` if no present message qualifies.
///
/// # Errors
///
/// Propagates any probe failure other than an absent sequence.
pub(crate) async fn first_sequence_at_or_after(
    fetcher: &mut dyn StreamFetcher,
    target_ns: i64,
    first_seq: u64,
    last_seq: u64,
) -> ScanResult<Option<u64>> {
    let mut left = first_seq;
    let mut right = last_seq;
    let mut found = None;

    while left <= right {
        let mid = left + (right - left) / 2;
        match fetcher.fetch(mid).await? {
            None => {
                // Gap: the dense midpoint is purged. Only the left edge
                // moves, so present messages to the right stay reachable.
                left = mid + 1;
            }
            Some(message) if message.timestamp_ns >= target_ns => {
                found = Some(mid);
                let Some(next_right) = mid.checked_sub(1) else {
                    break;
                };
                right = next_right;
            }
            Some(_) => {
                left = mid + 1;
            }
        }
    }

    debug!(target_ns, resolved = ?found, "resolved time bound");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryFetcher;

    fn dense_fetcher() -> MemoryFetcher {
        // Sequences 1..=5 with timestamps 1000..=5000.
        let mut fetcher = MemoryFetcher::new(1, 5);
        for seq in 1..=5u64 {
            #[allow(clippy::cast_possible_wrap)]
            fetcher.insert(seq, "a.x", "{}", (seq * 1000) as i64);
        }
        fetcher
    }

    #[tokio::test]
    async fn test_exact_timestamp_match() {
        let mut fetcher = dense_fetcher();
        let seq = first_sequence_at_or_after(&mut fetcher, 3000, 1, 5)
            .await
            .unwrap();
        assert_eq!(seq, Some(3));
    }

    #[tokio::test]
    async fn test_between_timestamps_rounds_up() {
        let mut fetcher = dense_fetcher();
        let seq = first_sequence_at_or_after(&mut fetcher, 1500, 1, 5)
            .await
            .unwrap();
        assert_eq!(seq, Some(2));
    }

    #[tokio::test]
    async fn test_before_first_returns_first() {
        let mut fetcher = dense_fetcher();
        let seq = first_sequence_at_or_after(&mut fetcher, 1, 1, 5)
            .await
            .unwrap();
        assert_eq!(seq, Some(1));
    }

    #[tokio::test]
    async fn test_after_last_returns_none() {
        let mut fetcher = dense_fetcher();
        let seq = first_sequence_at_or_after(&mut fetcher, 9000, 1, 5)
            .await
            .unwrap();
        assert_eq!(seq, None);
    }

    #[tokio::test]
    async fn test_gaps_are_skipped() {
        // Present: {1, 2, 6, 7}; 3..=5 purged.
        let mut fetcher = MemoryFetcher::new(1, 7);
        fetcher
            .insert(1, "a", "{}", 1000)
            .insert(2, "a", "{}", 2000)
            .insert(6, "a", "{}", 6000)
            .insert(7, "a", "{}", 7000);

        let seq = first_sequence_at_or_after(&mut fetcher, 2500, 1, 7)
            .await
            .unwrap();
        assert_eq!(seq, Some(6));
    }

    #[tokio::test]
    async fn test_predecessor_is_before_target() {
        // The resolved sequence's predecessor (if present) must be < target.
        let mut fetcher = dense_fetcher();
        for target in [500, 1000, 1001, 2999, 3000, 5000] {
            let seq = first_sequence_at_or_after(&mut fetcher, target, 1, 5)
                .await
                .unwrap()
                .unwrap();
            if seq > 1 {
                let prev = fetcher.fetch(seq - 1).await.unwrap().unwrap();
                assert!(prev.timestamp_ns < target);
            }
        }
    }

    #[tokio::test]
    async fn test_probe_failure_aborts() {
        let mut fetcher = dense_fetcher();
        fetcher.poison(3);
        let err = first_sequence_at_or_after(&mut fetcher, 3000, 1, 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("sequence 3"));
    }
}
