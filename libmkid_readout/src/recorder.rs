//! Bulk capture of the raw byte stream to one-second file segments.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::clock::epoch_seconds;
use super::control::ControlPlane;
use super::error::{RecorderError, StreamError};
use super::stream::StreamReader;

/// One open `.bin` segment of the capture.
#[derive(Debug)]
struct Segment {
    file: File,
    dir: PathBuf,
    second: u64,
    bytes_this_second: u64,
}

impl Segment {
    fn open(dir: &Path, second: u64) -> Result<Self, std::io::Error> {
        let path = segment_path(dir, second);
        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        spdlog::info!("Recorder: writing to {}", path.display());
        Ok(Self {
            file,
            dir: dir.to_path_buf(),
            second,
            bytes_this_second: 0,
        })
    }

    /// Close the current file and open the next second's segment.
    fn rotate(&mut self, now: u64) {
        let path = segment_path(&self.dir, now);
        spdlog::info!(
            "Recorder: writing to {}, rate = {}/sec",
            path.display(),
            human_bytes::human_bytes(self.bytes_this_second as f64)
        );
        match OpenOptions::new().append(true).create(true).open(&path) {
            Ok(file) => self.file = file,
            // keep appending to the old segment and retry next second
            Err(e) => spdlog::error!("Recorder: could not open {}: {}", path.display(), e),
        }
        self.second = now;
        self.bytes_this_second = 0;
    }

    /// Append bytes verbatim. The file is a byte-for-byte echo of the wire,
    /// so a short write is logged and skipped rather than retried.
    fn append(&mut self, bytes: &[u8]) {
        match self.file.write(bytes) {
            Ok(written) => {
                self.bytes_this_second += written as u64;
                if written < bytes.len() {
                    spdlog::warn!(
                        "Recorder: short write, {} of {} bytes",
                        written,
                        bytes.len()
                    );
                }
            }
            Err(e) => spdlog::error!("Recorder: write failed: {}", e),
        }
    }
}

fn segment_path(dir: &Path, second: u64) -> PathBuf {
    dir.join(format!("{second}.bin"))
}

/// Drains byte stream A to disk, gated by the control plane.
///
/// State machine: Idle (drain and discard) -> Opening (destination read from
/// `START`) -> Active (append and rotate every wall-clock second) -> back to
/// Idle on `STOP`. `QUIT` in any state closes the open segment, deletes all
/// control files and terminates.
#[derive(Debug)]
pub struct Recorder {
    stream: StreamReader,
    control: ControlPlane,
}

impl Recorder {
    pub fn new(stream: StreamReader, control: ControlPlane) -> Self {
        Self { stream, control }
    }

    pub fn run(self) -> Result<(), RecorderError> {
        let mut segment: Option<Segment> = None;

        loop {
            if self.control.quit_requested() {
                drop(segment);
                if let Err(e) = self.control.remove_all() {
                    spdlog::warn!("Recorder: could not clear control files: {}", e);
                }
                spdlog::info!("Recorder: closing");
                return Ok(());
            }

            match segment {
                None => {
                    // Idle: watch for START, keep the stream drained
                    if let Some(dest) = self.control.take_start()? {
                        match Segment::open(&dest, epoch_seconds()) {
                            Ok(seg) => segment = Some(seg),
                            // stay idle; the operator can retry with a new START
                            Err(e) => {
                                spdlog::error!(
                                    "Recorder: cannot open capture in {}: {}",
                                    dest.display(),
                                    e
                                );
                            }
                        }
                    } else {
                        self.discard_one()?;
                    }
                }
                Some(ref mut seg) => {
                    // Active
                    if self.control.take_stop()? {
                        spdlog::info!("Recorder: capture stopped");
                        segment = None;
                        continue;
                    }
                    let now = epoch_seconds();
                    if now > seg.second {
                        seg.rotate(now);
                    }
                    match self.stream.try_read() {
                        Ok(Some(chunk)) => seg.append(&chunk),
                        Ok(None) => (),
                        Err(StreamError::Disconnected) => {
                            return self.stream_closed(segment);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }

    fn discard_one(&self) -> Result<(), RecorderError> {
        match self.stream.try_read() {
            Ok(_) => Ok(()),
            Err(StreamError::Disconnected) => self.stream_closed(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The producer hung up. During shutdown that is the normal exit; at any
    /// other time the capture session is lost. The pipeline is tearing down
    /// either way, so the control files are cleared on both paths.
    fn stream_closed(&self, segment: Option<Segment>) -> Result<(), RecorderError> {
        drop(segment);
        if let Err(e) = self.control.remove_all() {
            spdlog::warn!("Recorder: could not clear control files: {}", e);
        }
        spdlog::info!("Recorder: closing");
        if self.control.quit_requested() {
            Ok(())
        } else {
            Err(RecorderError::StreamError(StreamError::Disconnected))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::byte_stream;
    use std::time::{Duration, Instant};

    fn captured_bytes(dir: &Path) -> Vec<u8> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "bin"))
            .collect();
        paths.sort();
        let mut bytes = Vec::new();
        for path in paths {
            bytes.extend_from_slice(&std::fs::read(path).unwrap());
        }
        bytes
    }

    #[test]
    fn segment_names_are_epoch_seconds() {
        assert_eq!(
            segment_path(Path::new("/data"), 1451606400),
            PathBuf::from("/data/1451606400.bin")
        );
    }

    #[test]
    fn captures_stream_verbatim() {
        let ramdisk = tempfile::tempdir().unwrap();
        let capture = tempfile::tempdir().unwrap();
        let control = ControlPlane::new(ramdisk.path());

        // START is pending before the recorder begins polling
        std::fs::write(
            ramdisk.path().join("START"),
            format!("{}\n", capture.path().display()),
        )
        .unwrap();

        let (mut tx, rx) = byte_stream(64);
        let mut fed = Vec::new();
        for i in 0..32u8 {
            let chunk = vec![i; 48];
            tx.write(&chunk).unwrap();
            fed.extend_from_slice(&chunk);
        }

        let recorder = Recorder::new(rx, control.clone());
        let worker = std::thread::spawn(move || recorder.run());

        let deadline = Instant::now() + Duration::from_secs(5);
        while captured_bytes(capture.path()).len() < fed.len() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(captured_bytes(capture.path()), fed);

        std::fs::write(ramdisk.path().join("QUIT"), "").unwrap();
        worker.join().unwrap().unwrap();
        drop(tx);
        // shutdown removed the control files
        assert!(!ramdisk.path().join("QUIT").exists());
        assert!(!ramdisk.path().join("START").exists());
    }

    #[test]
    fn idle_discards_and_quit_exits() {
        let ramdisk = tempfile::tempdir().unwrap();
        let control = ControlPlane::new(ramdisk.path());

        let (mut tx, rx) = byte_stream(8);
        tx.write(&[1, 2, 3]).unwrap();
        std::fs::write(ramdisk.path().join("QUIT"), "").unwrap();

        let recorder = Recorder::new(rx, control);
        recorder.run().unwrap();
        assert!(!ramdisk.path().join("QUIT").exists());
    }

    #[test]
    fn bad_destination_stays_idle() {
        let ramdisk = tempfile::tempdir().unwrap();
        let control = ControlPlane::new(ramdisk.path());
        std::fs::write(ramdisk.path().join("START"), "/nonexistent/capture/dir\n").unwrap();

        let (tx, rx) = byte_stream(8);
        let recorder = Recorder::new(rx, control.clone());
        let worker = std::thread::spawn(move || recorder.run());

        // the recorder consumed START without leaving idle; QUIT still works
        let deadline = Instant::now() + Duration::from_secs(5);
        while ramdisk.path().join("START").exists() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!ramdisk.path().join("START").exists());

        std::fs::write(ramdisk.path().join("QUIT"), "").unwrap();
        worker.join().unwrap().unwrap();
        drop(tx);
    }
}
