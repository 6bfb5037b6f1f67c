//! UDP ingest and fan-out to the recorder and aggregator streams.

use std::net::{Ipv4Addr, UdpSocket};
use std::os::fd::AsRawFd;
use std::time::Duration;

use super::config::Config;
use super::constants::{DATAGRAM_MAX, RECV_TIMEOUT_SECS};
use super::control::ControlPlane;
use super::error::{IngestorError, StreamError};
use super::stream::StreamWriter;

/// Owns the detector-facing UDP socket and copies every datagram, verbatim,
/// to both byte streams. Content is never inspected here; framing is the
/// aggregator's job and raw capture is the recorder's.
#[derive(Debug)]
pub struct Ingestor {
    socket: UdpSocket,
    datagrams: u64,
    bytes: u64,
}

impl Ingestor {
    /// Bind the data port and tune the socket.
    ///
    /// The receive buffer must be enlarged: overflow of the default-sized
    /// buffer drops datagrams mid-packet and corrupts framing downstream, so
    /// rejection of the hint is fatal. The timeout bounds how long the loop
    /// goes between shutdown polls.
    pub fn bind(config: &Config) -> Result<Self, IngestorError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.port))
            .map_err(|e| IngestorError::BindError(config.port, e))?;
        set_recv_buffer(&socket, config.recv_buffer_bytes)
            .map_err(IngestorError::BufferSizeError)?;
        socket.set_read_timeout(Some(Duration::from_secs(RECV_TIMEOUT_SECS)))?;
        spdlog::info!(
            "Ingestor: bound UDP port {} with a {} receive buffer",
            config.port,
            human_bytes::human_bytes(config.recv_buffer_bytes as f64)
        );
        Ok(Self {
            socket,
            datagrams: 0,
            bytes: 0,
        })
    }

    /// Receive until shutdown, fanning each datagram out to both streams.
    pub fn run(
        mut self,
        mut recorder_stream: StreamWriter,
        mut cuber_stream: StreamWriter,
        control: &ControlPlane,
    ) -> Result<(), IngestorError> {
        let mut buf = [0u8; DATAGRAM_MAX];
        let mut recorder_up = true;
        let mut cuber_up = true;

        while !control.quit_requested() {
            let received = match self.socket.recv(&mut buf) {
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(IngestorError::IOError(e)),
            };
            self.datagrams += 1;
            self.bytes += received as u64;

            // both sinks get the bytes even if one fails; a full stream is
            // datagram loss the consumer resyncs from, not an exit condition
            if recorder_up {
                recorder_up = Self::fan_out(&mut recorder_stream, &buf[..received], "recorder");
            }
            if cuber_up {
                cuber_up = Self::fan_out(&mut cuber_stream, &buf[..received], "cuber");
            }
            if !recorder_up && !cuber_up {
                return Err(IngestorError::StreamsClosed);
            }
        }

        spdlog::info!(
            "Ingestor: received {} datagrams, {} ({} short writes to recorder, {} to cuber)",
            self.datagrams,
            human_bytes::human_bytes(self.bytes as f64),
            recorder_stream.short_writes(),
            cuber_stream.short_writes()
        );
        Ok(())
    }

    /// Returns false once the consumer is gone for good.
    fn fan_out(stream: &mut StreamWriter, bytes: &[u8], name: &str) -> bool {
        match stream.write(bytes) {
            Ok(()) => true,
            Err(StreamError::Full(len)) => {
                spdlog::warn!("Ingestor: {} stream full, dropped {} bytes", name, len);
                true
            }
            Err(StreamError::Disconnected) => {
                spdlog::error!("Ingestor: {} stream disconnected", name);
                false
            }
        }
    }
}

/// Ask the kernel for a larger socket receive queue. There is no std API for
/// `SO_RCVBUF`, so this goes through libc.
fn set_recv_buffer(socket: &UdpSocket, bytes: usize) -> Result<(), std::io::Error> {
    let size = bytes as libc::c_int;
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVBUF,
            &size as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::byte_stream;

    fn test_config(port: u16) -> Config {
        Config {
            port,
            // stay under the unprivileged rmem_max so setsockopt succeeds
            recv_buffer_bytes: 128 * 1024,
            ..Config::default()
        }
    }

    #[test]
    fn binds_and_tunes_socket() {
        let ingestor = Ingestor::bind(&test_config(0)).unwrap();
        assert_eq!(ingestor.datagrams, 0);
    }

    #[test]
    fn fans_datagrams_out_to_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let control = ControlPlane::new(dir.path());

        let ingestor = Ingestor::bind(&test_config(0)).unwrap();
        let addr = ingestor.socket.local_addr().unwrap();

        let (tx_a, rx_a) = byte_stream(16);
        let (tx_b, rx_b) = byte_stream(16);

        let worker = {
            let control = control.clone();
            std::thread::spawn(move || ingestor.run(tx_a, tx_b, &control))
        };

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let payload = [0xFFu8; 16];
        sender
            .send_to(&payload, ("127.0.0.1", addr.port()))
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut got_a = None;
        let mut got_b = None;
        while (got_a.is_none() || got_b.is_none()) && std::time::Instant::now() < deadline {
            if got_a.is_none() {
                got_a = rx_a.try_read().unwrap();
            }
            if got_b.is_none() {
                got_b = rx_b.try_read().unwrap();
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(got_a.as_deref(), Some(&payload[..]));
        assert_eq!(got_b.as_deref(), Some(&payload[..]));

        std::fs::write(dir.path().join("QUIT"), "").unwrap();
        worker.join().unwrap().unwrap();
    }
}
