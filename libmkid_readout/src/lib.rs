//! # mkid_readout
//!
//! mkid_readout is the realtime ingest pipeline for an MKID photon-counting
//! detector array, written in Rust. Ten readout boards stream bit-packed
//! photon events over UDP; the pipeline receives the datagrams at line rate,
//! echoes the raw bytes to bulk storage in one-second file segments, and
//! continuously assembles a 2D photon-count image that is flushed and handed
//! to a PNG renderer once per wall-clock second.
//!
//! ## Architecture
//!
//! Three workers run inside one process and share two bounded
//! single-producer/single-consumer byte streams:
//!
//! - The **ingestor** owns the UDP socket and fans every received datagram
//!   out to both streams without inspecting it.
//! - The **recorder** drains one stream to `<dir>/<epoch-seconds>.bin`
//!   segments, gated by `START`/`STOP` control files.
//! - The **cuber** (aggregator) drains the other stream, reassembles
//!   variable-length packets across datagram boundaries, accumulates the
//!   photon-count image and flushes `<ramdisk>/<epoch-seconds>.img` every
//!   second.
//!
//! The supervisor wires the streams up, spawns the workers and brokers the
//! global shutdown signal: the appearance of a `QUIT` file on the ramdisk.
//!
//! ## Wire format
//!
//! Boards emit 8-byte big-endian words. A packet is one header word
//! (`start:8 | board:8 | frame:12 | timestamp:36`, `start == 0xFF`) followed
//! by up to 103 data words
//! (`xcoord:10 | ycoord:10 | timestamp:9 | wavelength:18 | baseline:17`).
//! Short packets are closed by an EOF word (`start == 0x7F`, board byte all
//! ones) which the parser consumes and discards. Packets routinely straddle
//! datagram boundaries; the reassembly buffer always begins on a packet
//! header between parse passes.
//!
//! ## Configuration
//!
//! Configurations are YAML files read with serde_yaml:
//!
//! ```yml
//! ramdisk_path: /mnt/ramdisk
//! port: 50000
//! recv_buffer_bytes: 33554432
//! stream_depth: 8192
//! renderer_path: /opt/mkid/Bin2PNG
//! ```
//!
//! ## Output
//!
//! - `<capture-dir>/<epoch-seconds>.bin` — raw concatenated UDP payloads,
//!   one file per second while a capture is active. No header, no framing.
//! - `<ramdisk>/<epoch-seconds>.img` — the photon-count image: 80 x 125
//!   cells, column-major, little-endian u16, exactly 20000 bytes.

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod constants;
pub mod control;
pub mod error;
pub mod feeder;
pub mod framer;
pub mod image;
pub mod ingestor;
pub mod recorder;
pub mod render;
pub mod sequence;
pub mod stream;
pub mod supervisor;
pub mod wire;
