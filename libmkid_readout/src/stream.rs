//! Bounded single-producer/single-consumer byte streams between workers.
//!
//! Each stream carries datagram-sized chunks in arrival order. The producer
//! never blocks: a full stream drops the chunk and surfaces it as a short
//! write, which the aggregator later sees as a parse anomaly and resyncs
//! from. The consumer never blocks either; an empty stream is benign.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};

use super::error::StreamError;

/// Create one stream with room for `depth` in-flight chunks.
pub fn byte_stream(depth: usize) -> (StreamWriter, StreamReader) {
    let (tx, rx) = sync_channel(depth);
    (
        StreamWriter {
            tx,
            short_writes: 0,
        },
        StreamReader { rx },
    )
}

/// Producer half, held by the ingestor.
#[derive(Debug)]
pub struct StreamWriter {
    tx: SyncSender<Vec<u8>>,
    short_writes: u64,
}

impl StreamWriter {
    /// Non-blocking write of one chunk. [`StreamError::Full`] is the lossy
    /// short-write case and is never retried.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        match self.tx.try_send(bytes.to_vec()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.short_writes += 1;
                Err(StreamError::Full(bytes.len()))
            }
            Err(TrySendError::Disconnected(_)) => Err(StreamError::Disconnected),
        }
    }

    /// Chunks dropped because the consumer fell behind.
    pub fn short_writes(&self) -> u64 {
        self.short_writes
    }
}

/// Consumer half, held by the recorder or the aggregator.
#[derive(Debug)]
pub struct StreamReader {
    rx: Receiver<Vec<u8>>,
}

impl StreamReader {
    /// Non-blocking read of the next chunk. `Ok(None)` means nothing queued.
    /// Chunks already in flight are still delivered after the producer hangs
    /// up; only then does the stream report [`StreamError::Disconnected`].
    pub fn try_read(&self) -> Result<Option<Vec<u8>>, StreamError> {
        match self.rx.try_recv() {
            Ok(chunk) => Ok(Some(chunk)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(StreamError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_order() {
        let (mut tx, rx) = byte_stream(8);
        tx.write(&[1, 2, 3]).unwrap();
        tx.write(&[4]).unwrap();
        assert_eq!(rx.try_read().unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(rx.try_read().unwrap(), Some(vec![4]));
        assert_eq!(rx.try_read().unwrap(), None);
    }

    #[test]
    fn full_stream_is_a_short_write() {
        let (mut tx, rx) = byte_stream(1);
        tx.write(&[0; 8]).unwrap();
        match tx.write(&[0; 1500]) {
            Err(StreamError::Full(len)) => assert_eq!(len, 1500),
            other => panic!("expected a short write, got {:?}", other),
        }
        assert_eq!(tx.short_writes(), 1);
        // the queued chunk survives the drop
        assert_eq!(rx.try_read().unwrap(), Some(vec![0; 8]));
    }

    #[test]
    fn queued_chunks_outlive_the_producer() {
        let (mut tx, rx) = byte_stream(4);
        tx.write(&[9]).unwrap();
        drop(tx);
        assert_eq!(rx.try_read().unwrap(), Some(vec![9]));
        assert!(matches!(rx.try_read(), Err(StreamError::Disconnected)));
    }
}
