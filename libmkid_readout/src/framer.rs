//! Packet reassembly from the unaligned datagram byte stream.
//!
//! The boards emit variable-length packets that routinely straddle datagram
//! boundaries, so the aggregator keeps every unconsumed byte in one buffer
//! and re-scans it as data arrives. The central invariant: between parse
//! passes the buffer is either empty or begins on an 8-byte boundary that is
//! a packet header. Appends at the tail preserve it; both compaction paths
//! below preserve it by construction.

use super::constants::{MAX_PACKET_WORDS, WORD_SIZE};
use super::wire;

/// Reassembles wire packets from arbitrarily-chunked bytes.
#[derive(Debug, Default)]
pub struct PacketFramer {
    buf: Vec<u8>,
    oversize_packets: u64,
}

impl PacketFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes at the tail of the buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Unconsumed bytes waiting on a packet boundary.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Number of packets that exceeded [`MAX_PACKET_WORDS`]; they are parsed
    /// anyway since the excess words are real photons from a lost boundary.
    pub fn oversize_packets(&self) -> u64 {
        self.oversize_packets
    }

    /// Scan for the end of the packet at the head of the buffer and detach
    /// it. Returns `None` until the packet's terminating boundary (the next
    /// header, or an EOF word) has arrived.
    pub fn next_packet(&mut self) -> Option<Vec<u8>> {
        // need the current header plus at least one whole word to inspect
        if self.buf.len() < 2 * WORD_SIZE {
            return None;
        }
        let words = self.buf.len() / WORD_SIZE;
        for i in 1..words {
            let word = wire::load_word(&self.buf[i * WORD_SIZE..]);
            if wire::is_packet_start(word) {
                // the next packet starts here; everything before it is ours
                if i > MAX_PACKET_WORDS {
                    self.oversize_packets += 1;
                    spdlog::warn!(
                        "Oversize packet: {} words, likely a lost header in a dropped datagram",
                        i
                    );
                }
                return Some(self.detach(i * WORD_SIZE, 0));
            } else if wire::is_eof_word(word) {
                // short packet; the terminator itself is discarded
                return Some(self.detach(i * WORD_SIZE, WORD_SIZE));
            }
        }
        None
    }

    /// Split off the leading `len` bytes as a packet and drop `skip` further
    /// bytes. The byte that becomes the new head is a header word in both
    /// callers, keeping the framing invariant.
    fn detach(&mut self, len: usize, skip: usize) -> Vec<u8> {
        let packet = self.buf[..len].to_vec();
        self.buf.drain(..len + skip);
        packet
    }
}
