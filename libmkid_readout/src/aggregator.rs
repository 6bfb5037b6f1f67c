//! The cuber: reframes the byte stream into packets and accumulates the
//! per-second photon-count image.

use super::clock::epoch_seconds;
use super::config::Config;
use super::constants::WORD_SIZE;
use super::control::ControlPlane;
use super::error::{AggregatorError, StreamError};
use super::framer::PacketFramer;
use super::image::CountImage;
use super::render::Renderer;
use super::sequence::FrameSequence;
use super::stream::StreamReader;
use super::wire::{load_word, DataWord, HeaderWord};

/// Single-threaded cooperative worker that owns the image, the per-board
/// frame counters and the reassembly buffer.
///
/// Parse anomalies are never fatal here: a dropped datagram shows up as a
/// frame mismatch and possibly an oversize packet, and the framer resyncs on
/// the next header sentinel by itself. Only shutdown ends the loop, and the
/// partial second in flight is discarded, not flushed.
#[derive(Debug)]
pub struct Aggregator {
    stream: StreamReader,
    control: ControlPlane,
    config: Config,
    framer: PacketFramer,
    image: CountImage,
    frames: FrameSequence,
    renderer: Renderer,
    /// Wall-clock second the current image started accumulating
    accum_second: u64,
    packets_this_second: u64,
}

impl Aggregator {
    pub fn new(stream: StreamReader, control: ControlPlane, config: &Config) -> Self {
        Self {
            stream,
            control,
            config: config.clone(),
            framer: PacketFramer::new(),
            image: CountImage::new(),
            frames: FrameSequence::new(),
            renderer: Renderer::new(config.renderer_path.clone()),
            accum_second: 0,
            packets_this_second: 0,
        }
    }

    pub fn run(mut self) -> Result<(), AggregatorError> {
        self.accum_second = epoch_seconds();
        loop {
            if self.control.quit_requested() {
                spdlog::info!("Cuber: closing");
                return Ok(());
            }

            let now = epoch_seconds();
            if now > self.accum_second {
                self.finish_second(now);
            }

            match self.stream.try_read() {
                Ok(Some(chunk)) => self.framer.extend(&chunk),
                Ok(None) => (),
                Err(StreamError::Disconnected) => {
                    if self.control.quit_requested() {
                        spdlog::info!("Cuber: closing");
                        return Ok(());
                    }
                    return Err(AggregatorError::StreamError(StreamError::Disconnected));
                }
                Err(e) => return Err(e.into()),
            }

            while let Some(packet) = self.framer.next_packet() {
                self.parse_packet(&packet);
            }
        }
    }

    /// A new wall-clock second began: flush the finished slice, hand it to
    /// the renderer and reset the accumulator.
    fn finish_second(&mut self, now: u64) {
        let img_path = self.config.image_path(self.accum_second);
        match self.image.write_to(&img_path) {
            Ok(()) => {
                self.renderer
                    .trigger(&img_path, &self.config.png_path(self.accum_second));
            }
            // a lost slice is recoverable; the raw capture still has the data
            Err(e) => spdlog::error!("Cuber: could not write {}: {}", img_path.display(), e),
        }
        if self.image.saturated() {
            spdlog::warn!("Cuber: image cells saturated during second {}", self.accum_second);
        }
        spdlog::info!(
            "Cuber: parse rate = {} pkts/sec, {} bytes buffered",
            self.packets_this_second,
            self.framer.buffered()
        );
        self.image.clear();
        self.packets_this_second = 0;
        self.accum_second = now;
    }

    /// Decode one detached packet: header bookkeeping, then one image count
    /// per data word. The wavelength and baseline fields ride along for
    /// consumers of the raw capture and are not aggregated here.
    fn parse_packet(&mut self, packet: &[u8]) {
        let header = HeaderWord::decode(load_word(packet));
        if let Some(expected) = self.frames.observe(header.board, header.frame) {
            spdlog::debug!(
                "Cuber: board {} expected frame {}, received {}",
                header.board,
                expected,
                header.frame
            );
        }
        for word in packet[WORD_SIZE..].chunks_exact(WORD_SIZE) {
            let photon = DataWord::decode(load_word(word));
            self.image.record(photon.xcoord, photon.ycoord);
        }
        self.packets_this_second += 1;
    }
}
