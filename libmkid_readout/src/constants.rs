//! Wire protocol and detector geometry constants.
//!
//! The readout boards emit 8-byte big-endian words over UDP. Every constant
//! here is derived from the on-wire format of the board firmware and must not
//! be changed without a matching firmware change.

/// Number of pixel columns in the detector array
pub const XPIX: usize = 80;
/// Number of pixel rows in the detector array
pub const YPIX: usize = 125;
/// Number of readout boards streaming packets
pub const NUM_BOARDS: usize = 10;

/// UDP port the boards transmit to
pub const DATA_PORT: u16 = 50000;
/// Largest datagram a board will emit
pub const DATAGRAM_MAX: usize = 1500;

/// Every wire word is 8 bytes, big-endian
pub const WORD_SIZE: usize = 8;
/// A packet is one header word plus at most 103 data words
pub const MAX_PACKET_WORDS: usize = 104;
/// Per-board frame counters are 12 bits and wrap here
pub const FRAME_WRAP: u16 = 4096;

/// `start` byte marking a packet header word
pub const PACKET_START: u8 = 0xFF;
/// `start` byte of the EOF terminator word
pub const EOF_START: u8 = 0x7F;
/// `board` byte of the EOF terminator word
pub const EOF_BOARD: u8 = 0xFF;

/// Size in bytes of one flushed image (XPIX * YPIX little-endian u16 cells)
pub const IMAGE_BYTES: usize = XPIX * YPIX * 2;

/// Kernel receive buffer requested for the UDP socket. The board array can
/// burst faster than the aggregator drains, and an overflowing default-sized
/// buffer silently drops datagrams mid-packet.
pub const RECV_BUFFER_BYTES: usize = 32 * 1024 * 1024;
/// Socket receive timeout; bounds how long the ingestor goes between
/// shutdown polls.
pub const RECV_TIMEOUT_SECS: u64 = 3;

/// Default depth, in datagrams, of each inter-worker byte stream
pub const STREAM_DEPTH: usize = 8192;
