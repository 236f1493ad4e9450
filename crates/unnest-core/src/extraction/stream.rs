//! Consumer handle for one unpacking call.

use std::thread;
use std::thread::JoinHandle;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::debug;
use tracing::warn;

use crate::Result;
use crate::UnpackConfig;
use crate::UnpackError;
use crate::report::UnpackOutcome;
use crate::report::UnpackSummary;
use crate::security::CancelHandle;
use crate::security::Deadline;
use crate::security::ExtractionSession;
use crate::security::fault;

use super::sink::ChannelSink;
use super::sink::LeafSink;

const WORKER_THREAD_NAME: &str = "unnest-worker";

/// Ordered stream of leaf chunks produced by a background worker.
///
/// The stream ends when the worker finishes, whether it succeeded, found
/// no archive, or failed. Errors never travel through the stream; call
/// [`finish`](Self::finish) to learn how the call ended.
///
/// Dropping the stream cancels the worker.
///
/// # Examples
///
/// ```
/// use unnest_core::UnpackConfig;
/// use unnest_core::test_utils::gzip_compress;
/// use unnest_core::unpack_stream;
///
/// let data = gzip_compress(b"password=swordfish");
/// let mut stream = unpack_stream(std::io::Cursor::new(data), UnpackConfig::default());
///
/// let content: Vec<u8> = stream.by_ref().flatten().collect();
/// assert_eq!(content, b"password=swordfish");
///
/// let summary = stream.finish();
/// assert!(summary.is_success());
/// ```
#[derive(Debug)]
pub struct ExtractionStream {
    receiver: mpsc::Receiver<Vec<u8>>,
    cancel: CancelHandle,
    worker: Option<JoinHandle<UnpackSummary>>,
    spawn_error: Option<UnpackError>,
}

impl ExtractionStream {
    /// Starts `job` on a dedicated worker thread.
    ///
    /// The configuration is validated first; an invalid configuration gives
    /// an already-closed stream whose summary carries the error.
    pub(crate) fn spawn<F>(config: UnpackConfig, job: F) -> Self
    where
        F: FnOnce(&ExtractionSession, &mut dyn LeafSink) -> Result<()> + Send + 'static,
    {
        let deadline = Deadline::after(config.max_duration);
        let cancel = deadline.cancel_handle();

        if let Err(err) = config.validate() {
            warn!(code = err.code(), error = %err, "rejected unpack configuration");
            let (_, receiver) = mpsc::channel(1);
            return Self {
                receiver,
                cancel,
                worker: None,
                spawn_error: Some(err),
            };
        }

        let (sender, receiver) = mpsc::channel(config.channel_capacity);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run(config, deadline, sender, job));

        match spawned {
            Ok(handle) => Self {
                receiver,
                cancel,
                worker: Some(handle),
                spawn_error: None,
            },
            Err(e) => Self {
                receiver,
                cancel,
                worker: None,
                spawn_error: Some(UnpackError::Io(e)),
            },
        }
    }

    /// Receives the next chunk, waiting asynchronously.
    ///
    /// Returns `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }

    /// Receives the next chunk, blocking the current thread.
    ///
    /// Returns `None` once the stream is closed.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context; use
    /// [`recv`](Self::recv) there.
    pub fn blocking_recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.blocking_recv()
    }

    /// Fires the deadline early; the worker stops at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a handle that can cancel this call from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Closes the stream, waits for the worker and returns its diagnostics.
    ///
    /// Chunks not yet received are discarded. A worker still producing sees
    /// the closed stream as a cancellation.
    #[must_use]
    pub fn finish(mut self) -> UnpackSummary {
        self.receiver.close();

        if let Some(err) = self.spawn_error.take() {
            return UnpackSummary::failed(err);
        }

        match self.worker.take().map(JoinHandle::join) {
            Some(Ok(summary)) => summary,
            Some(Err(payload)) => UnpackSummary::failed(UnpackError::DecoderFault {
                message: fault::panic_message(payload.as_ref()),
            }),
            None => UnpackSummary::failed(UnpackError::Cancelled),
        }
    }
}

impl Iterator for ExtractionStream {
    type Item = Vec<u8>;

    /// Blocks until the next chunk arrives.
    fn next(&mut self) -> Option<Self::Item> {
        self.blocking_recv()
    }
}

impl Drop for ExtractionStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.receiver.close();
    }
}

/// Worker body. The sender is dropped on return, which closes the stream.
fn run<F>(
    config: UnpackConfig,
    deadline: Deadline,
    sender: mpsc::Sender<Vec<u8>>,
    job: F,
) -> UnpackSummary
where
    F: FnOnce(&ExtractionSession, &mut dyn LeafSink) -> Result<()>,
{
    let started = Instant::now();
    let session = ExtractionSession::new(config, deadline);
    let mut sink = ChannelSink::new(sender);

    let outcome = match fault::contain("unpack worker", || job(&session, &mut sink)) {
        Ok(()) => UnpackOutcome::Completed,
        Err(UnpackError::NotAnArchive) => {
            debug!("input is not an archive");
            UnpackOutcome::NotAnArchive
        }
        Err(err) => {
            warn!(code = err.code(), error = %err, "error unarchiving chunk");
            UnpackOutcome::Failed(err)
        }
    };
    drop(sink);

    let summary = session.summary(outcome, started.elapsed());
    debug!(
        bytes = summary.bytes_read,
        chunks = summary.leaf_chunks,
        depth = summary.max_depth_reached,
        "unpacking finished"
    );
    summary
}
