//! Capture ingestion seam.
//!
//! The decoder does not parse capture containers; whatever produced the
//! session (a sniffer file loader, a live tap, a replay tool) implements
//! [`PacketFeed`] and hands over finished [`RawPacket`] values one at a
//! time.

use std::collections::VecDeque;

use thiserror::Error;

use crate::RawPacket;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("capture read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed capture: {0}")]
    Capture(String),
}

/// Pull-based supply of raw packets in capture order.
pub trait PacketFeed {
    /// Next packet, or `None` once the capture is exhausted.
    fn next_packet(&mut self) -> Result<Option<RawPacket>, FeedError>;
}

/// A [`PacketFeed`] over packets already in memory, mostly for tests and
/// replay.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    packets: VecDeque<RawPacket>,
}

impl MemoryFeed {
    pub fn new(packets: impl IntoIterator<Item = RawPacket>) -> Self {
        Self {
            packets: packets.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

impl PacketFeed for MemoryFeed {
    fn next_packet(&mut self) -> Result<Option<RawPacket>, FeedError> {
        Ok(self.packets.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuildId, Direction};

    fn packet(sequence: u64) -> RawPacket {
        RawPacket {
            opcode: 0x1000,
            direction: Direction::ServerToClient,
            build: BuildId(19033),
            sequence,
            timestamp: None,
            payload: Vec::new(),
        }
    }

    #[test]
    fn drains_in_insertion_order() {
        let mut feed = MemoryFeed::new([packet(1), packet(2)]);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.next_packet().unwrap().unwrap().sequence, 1);
        assert_eq!(feed.next_packet().unwrap().unwrap().sequence, 2);
        assert!(feed.next_packet().unwrap().is_none());
        assert!(feed.is_empty());
    }
}
