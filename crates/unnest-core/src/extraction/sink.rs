//! Destinations for leaf chunks.

use tokio::sync::mpsc;

use crate::Result;
use crate::UnpackError;

/// Receives leaf chunks in emission order.
pub trait LeafSink {
    /// Delivers one non-empty chunk.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError::Cancelled`] if the consumer has gone away.
    fn emit(&mut self, chunk: Vec<u8>) -> Result<()>;
}

/// Collects chunks in memory.
impl LeafSink for Vec<Vec<u8>> {
    fn emit(&mut self, chunk: Vec<u8>) -> Result<()> {
        self.push(chunk);
        Ok(())
    }
}

/// Sends chunks over a bounded channel, blocking while it is full.
///
/// Must be used from a plain thread, never from inside an async runtime.
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::Sender<Vec<u8>>,
}

impl ChannelSink {
    /// Wraps the producing half of the output channel.
    #[must_use]
    pub fn new(sender: mpsc::Sender<Vec<u8>>) -> Self {
        Self { sender }
    }
}

impl LeafSink for ChannelSink {
    fn emit(&mut self, chunk: Vec<u8>) -> Result<()> {
        self.sender
            .blocking_send(chunk)
            .map_err(|_| UnpackError::Cancelled)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink: Vec<Vec<u8>> = Vec::new();
        sink.emit(b"one".to_vec()).unwrap();
        sink.emit(b"two".to_vec()).unwrap();
        assert_eq!(sink, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sender, mut receiver) = mpsc::channel(4);
        let mut sink = ChannelSink::new(sender);
        sink.emit(b"chunk".to_vec()).unwrap();
        drop(sink);

        assert_eq!(receiver.blocking_recv(), Some(b"chunk".to_vec()));
        assert_eq!(receiver.blocking_recv(), None);
    }

    #[test]
    fn test_closed_receiver_is_cancellation() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);

        let mut sink = ChannelSink::new(sender);
        let result = sink.emit(b"late".to_vec());
        assert!(matches!(result, Err(UnpackError::Cancelled)));
    }
}
