//! Synthetic packet source for running the pipeline without the detector.
//!
//! Replaces the UDP ingestor and pushes realistic board traffic down both
//! byte streams: half the packets are full 100-photon packets, half are
//! random-length short packets closed by an EOF word. Per-board frame
//! counters advance modulo 4096 just like the firmware.

use rand::Rng;

use super::clock::epoch_seconds;
use super::constants::{FRAME_WRAP, NUM_BOARDS, XPIX, YPIX};
use super::control::ControlPlane;
use super::error::{IngestorError, StreamError};
use super::stream::StreamWriter;
use super::wire::{eof_word, DataWord, HeaderWord};

/// Board timestamps count half-millisecond ticks from this epoch
/// (2016-01-01T00:00:00Z), mirroring the firmware clock.
const TICK_EPOCH_SECS: u64 = 1_451_606_400;
const TICKS_PER_SEC: u64 = 2000;

pub struct Feeder {
    frames: [u16; NUM_BOARDS],
}

impl Default for Feeder {
    fn default() -> Self {
        Self::new()
    }
}

impl Feeder {
    pub fn new() -> Self {
        Self {
            frames: [0; NUM_BOARDS],
        }
    }

    /// Emit packets at roughly the hardware's kHz cadence until shutdown.
    pub fn run(
        mut self,
        mut recorder_stream: StreamWriter,
        mut cuber_stream: StreamWriter,
        control: &ControlPlane,
    ) -> Result<(), IngestorError> {
        let mut rng = rand::thread_rng();
        spdlog::info!("Feeder: generating synthetic board traffic");
        while !control.quit_requested() {
            let packet = self.next_packet(&mut rng);
            for stream in [&mut recorder_stream, &mut cuber_stream] {
                match stream.write(&packet) {
                    Ok(()) | Err(StreamError::Full(_)) => (),
                    Err(StreamError::Disconnected) => return Err(IngestorError::StreamsClosed),
                }
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        spdlog::info!("Feeder: closing");
        Ok(())
    }

    fn next_packet(&mut self, rng: &mut impl Rng) -> Vec<u8> {
        let board = rng.gen_range(0..NUM_BOARDS as u8);
        let ticks = epoch_seconds().saturating_sub(TICK_EPOCH_SECS) * TICKS_PER_SEC;
        let header = HeaderWord {
            board,
            frame: self.frames[board as usize],
            timestamp: ticks & 0xF_FFFF_FFFF,
        };
        self.frames[board as usize] = (self.frames[board as usize] + 1) % FRAME_WRAP;

        let mut bytes = header.to_be_bytes().to_vec();
        let full = rng.gen_bool(0.5);
        let photons: u16 = if full { 100 } else { rng.gen_range(1..100) };
        for i in 0..photons {
            let word = DataWord {
                xcoord: rng.gen_range(0..XPIX as u16),
                ycoord: rng.gen_range(0..YPIX as u16),
                timestamp: (i * 4) & 0x1FF,
                wavelength: rng.gen_range(0..16384),
                baseline: rng.gen_range(0..16384),
            };
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        if !full {
            bytes.extend_from_slice(&eof_word().to_be_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_PACKET_WORDS, WORD_SIZE};
    use crate::framer::PacketFramer;
    use crate::wire::{is_packet_start, load_word};

    #[test]
    fn packets_are_whole_words_and_bounded() {
        let mut feeder = Feeder::new();
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let packet = feeder.next_packet(&mut rng);
            assert_eq!(packet.len() % WORD_SIZE, 0);
            assert!(packet.len() <= (MAX_PACKET_WORDS + 1) * WORD_SIZE);
            assert!(is_packet_start(load_word(&packet)));
        }
    }

    #[test]
    fn frames_advance_per_board() {
        let mut feeder = Feeder::new();
        let mut rng = rand::thread_rng();
        let mut emitted = [0u32; NUM_BOARDS];
        for _ in 0..50 {
            let packet = feeder.next_packet(&mut rng);
            let header = crate::wire::HeaderWord::decode(load_word(&packet));
            assert_eq!(header.frame as u32, emitted[header.board as usize] % 4096);
            emitted[header.board as usize] += 1;
        }
    }

    #[test]
    fn generated_stream_reframes_cleanly() {
        let mut feeder = Feeder::new();
        let mut rng = rand::thread_rng();
        let mut framer = PacketFramer::new();
        for _ in 0..50 {
            framer.extend(&feeder.next_packet(&mut rng));
        }
        let mut parsed = 0;
        while let Some(packet) = framer.next_packet() {
            assert!(is_packet_start(load_word(&packet)));
            parsed += 1;
        }
        // every packet except a possibly-unterminated trailing one detaches
        assert!(parsed >= 49);
        assert_eq!(framer.oversize_packets(), 0);
    }
}
