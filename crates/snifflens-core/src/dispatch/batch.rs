//! Batch decoding over worker threads.
//!
//! Packets decode independently, so the batch layer only has to fan raw
//! packets out, collect results and put them back in capture order. Workers
//! share the decoder read-only; the only coordination is the pair of
//! channels and a cancellation flag checked before each packet is issued.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::Decoder;
use crate::feed::{FeedError, PacketFeed};
use crate::{DecodedPacket, ParseStatus, RawPacket};

/// Cooperative batch-abort flag.
///
/// Cancelling stops new packets from being issued; packets already handed
/// to a worker finish decoding. The decoded prefix is kept and reported.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Tuning for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads to decode on. Values of 0 and 1 both decode on the
    /// calling thread.
    pub workers: usize,
    /// Abort flag shared with the caller, if batch cancellation is wanted.
    pub cancel: Option<CancelToken>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            cancel: None,
        }
    }
}

/// Status breakdown and time bounds for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: u64,
    pub success: u64,
    pub with_errors: u64,
    pub not_parsed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// Everything a batch run produced, packets in capture order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub packets: Vec<DecodedPacket>,
}

impl Decoder {
    /// Decode a batch, preserving capture order in the report.
    ///
    /// Every packet yields exactly one [`DecodedPacket`]; malformed
    /// payloads are downgraded per packet and never end the batch. A
    /// cancelled batch reports the decoded prefix only.
    pub fn decode_batch(&self, packets: Vec<RawPacket>, options: &BatchOptions) -> BatchReport {
        let workers = options.workers.min(packets.len()).max(1);
        let cancel = options.cancel.as_ref();

        let decoded = if workers <= 1 {
            self.decode_on_caller(packets, cancel)
        } else {
            self.decode_on_workers(packets, workers, cancel)
        };

        let report = build_report(decoded);
        tracing::info!(
            total = report.summary.total,
            success = report.summary.success,
            with_errors = report.summary.with_errors,
            not_parsed = report.summary.not_parsed,
            "batch decoded"
        );
        report
    }

    /// Drain a feed, then decode everything it produced as one batch.
    pub fn decode_feed<F: PacketFeed>(
        &self,
        mut feed: F,
        options: &BatchOptions,
    ) -> Result<BatchReport, FeedError> {
        let mut packets = Vec::new();
        while let Some(raw) = feed.next_packet()? {
            packets.push(raw);
        }
        Ok(self.decode_batch(packets, options))
    }

    fn decode_on_caller(
        &self,
        packets: Vec<RawPacket>,
        cancel: Option<&CancelToken>,
    ) -> Vec<DecodedPacket> {
        let mut decoded = Vec::with_capacity(packets.len());
        for raw in packets {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                break;
            }
            decoded.push(self.decode(raw));
        }
        decoded
    }

    fn decode_on_workers(
        &self,
        packets: Vec<RawPacket>,
        workers: usize,
        cancel: Option<&CancelToken>,
    ) -> Vec<DecodedPacket> {
        let total = packets.len();
        let (work_tx, work_rx) = bounded::<(usize, RawPacket)>(workers * 2);
        let (done_tx, done_rx) = unbounded::<(usize, DecodedPacket)>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for (index, raw) in work_rx {
                        if done_tx.send((index, self.decode(raw))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(work_rx);
            drop(done_tx);

            for (index, raw) in packets.into_iter().enumerate() {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    break;
                }
                if work_tx.send((index, raw)).is_err() {
                    break;
                }
            }
            drop(work_tx);

            // Issued indices are a gapless prefix of 0..total, so flattening
            // the slots restores capture order and drops only unissued tails.
            let mut slots: Vec<Option<DecodedPacket>> = Vec::new();
            slots.resize_with(total, || None);
            for (index, decoded) in done_rx {
                slots[index] = Some(decoded);
            }
            slots.into_iter().flatten().collect()
        })
    }
}

fn build_report(packets: Vec<DecodedPacket>) -> BatchReport {
    let mut summary = BatchSummary {
        total: packets.len() as u64,
        success: 0,
        with_errors: 0,
        not_parsed: 0,
        time_start: None,
        time_end: None,
    };
    let mut first_ts = None;
    let mut last_ts = None;
    for packet in &packets {
        match packet.status {
            ParseStatus::Success => summary.success += 1,
            ParseStatus::WithErrors => summary.with_errors += 1,
            ParseStatus::NotParsed => summary.not_parsed += 1,
        }
        update_ts_bounds(&mut first_ts, &mut last_ts, packet.source.timestamp);
    }
    summary.time_start = ts_to_rfc3339(first_ts);
    summary.time_end = ts_to_rfc3339(last_ts);
    BatchReport { summary, packets }
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let ts = match ts {
        Some(ts) => ts,
        None => return,
    };
    match first {
        None => *first = Some(ts),
        Some(existing) => {
            if ts < *existing {
                *first = Some(ts);
            }
        }
    }
    match last {
        None => *last = Some(ts),
        Some(existing) => {
            if ts > *existing {
                *last = Some(ts);
            }
        }
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::decode::DecodeContext;
    use crate::registry::{RegistryBuilder, RouteKey};
    use crate::store::{MemoryStore, RecordStore};
    use crate::wire::WireError;
    use crate::{BuildId, Direction, FieldRecord, MemoryFeed, VersionRange};

    const OPCODE: u32 = 0x0100;

    fn flags(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
        ctx.read_u32("Flags")?;
        Ok(())
    }

    fn keyed(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
        let id = ctx.read_i32("Id")?;
        ctx.store_record("sample", i64::from(id), Vec::new());
        Ok(())
    }

    fn decoder(routine: crate::DecodeFn, store: Arc<dyn RecordStore>) -> Decoder {
        let mut routes = RegistryBuilder::new();
        routes.register(
            RouteKey::new(OPCODE, Direction::ServerToClient),
            VersionRange::since(BuildId(0)),
            "SMSG_SAMPLE",
            routine,
        );
        Decoder::new(
            routes.freeze().unwrap(),
            RegistryBuilder::new().freeze().unwrap(),
            store,
        )
    }

    fn packet(sequence: u64, payload: Vec<u8>) -> RawPacket {
        RawPacket {
            opcode: OPCODE,
            direction: Direction::ServerToClient,
            build: BuildId(19033),
            sequence,
            timestamp: None,
            payload,
        }
    }

    #[test]
    fn one_truncated_packet_does_not_end_the_batch() {
        let decoder = decoder(flags, Arc::new(MemoryStore::new()));
        let mut packets: Vec<RawPacket> = (0..100)
            .map(|i| packet(i, vec![1, 0, 0, 0]))
            .collect();
        packets[57].payload.truncate(2);

        let report = decoder.decode_batch(packets, &BatchOptions::default());

        assert_eq!(report.summary.total, 100);
        assert_eq!(report.summary.success, 99);
        assert_eq!(report.summary.not_parsed, 1);
        assert_eq!(report.packets.len(), 100);
        for (i, decoded) in report.packets.iter().enumerate() {
            assert_eq!(decoded.source.sequence, i as u64);
        }
        assert_eq!(report.packets[57].status, ParseStatus::NotParsed);
    }

    #[test]
    fn parallel_report_matches_sequential() {
        let decoder = decoder(flags, Arc::new(MemoryStore::new()));
        let packets: Vec<RawPacket> = (0..32)
            .map(|i| {
                let mut payload = vec![i as u8, 0, 0, 0];
                if i % 5 == 0 {
                    payload.push(0xEE);
                }
                packet(i, payload)
            })
            .collect();

        let sequential = decoder.decode_batch(
            packets.clone(),
            &BatchOptions {
                workers: 1,
                cancel: None,
            },
        );
        let parallel = decoder.decode_batch(
            packets,
            &BatchOptions {
                workers: 4,
                cancel: None,
            },
        );

        assert_eq!(
            serde_json::to_value(&parallel).unwrap(),
            serde_json::to_value(&sequential).unwrap()
        );
    }

    #[test]
    fn pre_cancelled_batch_reports_nothing() {
        let decoder = decoder(flags, Arc::new(MemoryStore::new()));
        let cancel = CancelToken::new();
        cancel.cancel();
        let packets = vec![packet(0, vec![1, 0, 0, 0]), packet(1, vec![2, 0, 0, 0])];

        let report = decoder.decode_batch(
            packets,
            &BatchOptions {
                workers: 2,
                cancel: Some(cancel),
            },
        );

        assert_eq!(report.summary.total, 0);
        assert!(report.packets.is_empty());
    }

    // Fires the cancel flag from inside a decode, so the caller-thread path
    // sees it between packets at a deterministic point.
    struct CancelAfter {
        inner: MemoryStore,
        after: usize,
        seen: AtomicUsize,
        cancel: CancelToken,
    }

    impl RecordStore for CancelAfter {
        fn put(&self, table: &'static str, key: i64, fields: Vec<FieldRecord>) {
            self.inner.put(table, key, fields);
            if self.seen.fetch_add(1, Ordering::Relaxed) + 1 == self.after {
                self.cancel.cancel();
            }
        }

        fn remove(&self, table: &'static str, key: i64) {
            self.inner.remove(table, key);
        }
    }

    #[test]
    fn cancellation_keeps_the_decoded_prefix() {
        let cancel = CancelToken::new();
        let store = Arc::new(CancelAfter {
            inner: MemoryStore::new(),
            after: 3,
            seen: AtomicUsize::new(0),
            cancel: cancel.clone(),
        });
        let decoder = decoder(keyed, store);
        let packets: Vec<RawPacket> = (0..10).map(|i| packet(i, vec![i as u8, 0, 0, 0])).collect();

        let report = decoder.decode_batch(
            packets,
            &BatchOptions {
                workers: 1,
                cancel: Some(cancel),
            },
        );

        assert_eq!(report.summary.total, 3);
        let sequences: Vec<u64> = report.packets.iter().map(|p| p.source.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn summary_counts_and_time_bounds() {
        let decoder = decoder(flags, Arc::new(MemoryStore::new()));
        let mut ok = packet(0, vec![1, 0, 0, 0]);
        ok.timestamp = Some(1_700_000_010.0);
        let mut trailing = packet(1, vec![1, 0, 0, 0, 0xFF]);
        trailing.timestamp = Some(1_700_000_000.0);
        let mut unroutable = packet(2, vec![]);
        unroutable.opcode = 0xDEAD;

        let report = decoder.decode_batch(
            vec![ok, trailing, unroutable],
            &BatchOptions {
                workers: 1,
                cancel: None,
            },
        );

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.success, 1);
        assert_eq!(report.summary.with_errors, 1);
        assert_eq!(report.summary.not_parsed, 1);
        assert_eq!(
            report.summary.time_start.as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
        assert_eq!(
            report.summary.time_end.as_deref(),
            Some("2023-11-14T22:13:30Z")
        );
    }

    #[test]
    fn feed_is_drained_in_order() {
        let decoder = decoder(flags, Arc::new(MemoryStore::new()));
        let feed = MemoryFeed::new((0..3).map(|i| packet(i, vec![1, 0, 0, 0])));

        let report = decoder
            .decode_feed(feed, &BatchOptions::default())
            .unwrap();

        assert_eq!(report.summary.total, 3);
        let sequences: Vec<u64> = report.packets.iter().map(|p| p.source.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }
}
