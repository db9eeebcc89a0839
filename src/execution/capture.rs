//! Concurrent draining of process output streams.
//!
//! Each source stream is read on its own thread so that a child filling one
//! pipe never stalls because another pipe is not being read. Bytes are
//! forwarded to an optional sink before they are buffered.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use crate::error::ShellError;
use crate::Result;

/// Default buffer size for reading process output.
const READ_BUFFER_SIZE: usize = 4096;

/// A readable stream to drain.
pub type OutputSource = Box<dyn Read + Send>;

/// A caller-supplied destination for live output.
pub type OutputSink = Box<dyn Write + Send>;

/// Optional live sinks for a child's standard output and error.
#[derive(Default)]
pub struct OutputSinks {
    pub stdout: Option<OutputSink>,
    pub stderr: Option<OutputSink>,
}

impl OutputSinks {
    /// No sinks; output is only buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward standard output to `sink`.
    pub fn stdout(mut self, sink: impl Write + Send + 'static) -> Self {
        self.stdout = Some(Box::new(sink));
        self
    }

    /// Forward standard error to `sink`.
    pub fn stderr(mut self, sink: impl Write + Send + 'static) -> Self {
        self.stderr = Some(Box::new(sink));
        self
    }
}

impl fmt::Debug for OutputSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSinks")
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}

/// In-memory sink that can be cloned and inspected while a child runs.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        match self.0.lock() {
            Ok(bytes) => bytes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| io::Error::other("shared buffer lock poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// What a drain thread hands back: everything read, plus the read error
/// that stopped it early (if any).
struct Drained {
    bytes: Vec<u8>,
    error: Option<io::Error>,
}

enum CaptureState {
    Draining(Vec<JoinHandle<Drained>>),
    Finished(Vec<Vec<u8>>),
}

/// Drains a fixed set of streams concurrently.
///
/// Every source is read to end-of-stream exactly once. [`wait`](Self::wait)
/// joins the drain threads and returns one buffer per source in
/// construction order; later calls return the same buffers.
pub struct StreamCapture {
    state: CaptureState,
}

impl StreamCapture {
    /// Start draining each `(source, sink)` pair on its own thread.
    pub fn new<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (OutputSource, Option<OutputSink>)>,
    {
        let mut handles = Vec::new();
        for (index, (source, sink)) in pairs.into_iter().enumerate() {
            let handle = thread::Builder::new()
                .name(format!("procshell-drain-{index}"))
                .spawn(move || drain(index, source, sink))?;
            handles.push(handle);
        }

        Ok(Self {
            state: CaptureState::Draining(handles),
        })
    }

    /// Whether the drain threads have already been joined.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, CaptureState::Finished(_))
    }

    /// Block until every source reaches end-of-stream.
    ///
    /// Returns the accumulated bytes per source. If a source failed with a
    /// read error, the first such error is returned from this call and the
    /// partial buffers are kept for subsequent calls.
    pub fn wait(&mut self) -> Result<Vec<Vec<u8>>> {
        let handles = match &mut self.state {
            CaptureState::Finished(buffers) => return Ok(buffers.clone()),
            CaptureState::Draining(handles) => std::mem::take(handles),
        };

        let mut buffers = Vec::with_capacity(handles.len());
        let mut first_error = None;

        for handle in handles {
            match handle.join() {
                Ok(drained) => {
                    if let Some(e) = drained.error {
                        first_error.get_or_insert(ShellError::Io(e));
                    }
                    buffers.push(drained.bytes);
                }
                Err(_) => {
                    first_error.get_or_insert(ShellError::DrainPanicked);
                    buffers.push(Vec::new());
                }
            }
        }

        self.state = CaptureState::Finished(buffers.clone());

        match first_error {
            Some(e) => Err(e),
            None => Ok(buffers),
        }
    }
}

impl fmt::Debug for StreamCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCapture")
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn drain(index: usize, mut source: OutputSource, mut sink: Option<OutputSink>) -> Drained {
    let mut bytes = Vec::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        match source.read(&mut buf) {
            Ok(0) => {
                debug!(stream = index, bytes = bytes.len(), "drain: EOF");
                break;
            }
            Ok(n) => {
                trace!(stream = index, "drain: read {} bytes", n);
                let failed = match sink.as_mut() {
                    Some(out) => out.write_all(&buf[..n]).and_then(|()| out.flush()).err(),
                    None => None,
                };
                if let Some(e) = failed {
                    // Keep draining; the child must not block on a full pipe.
                    warn!(stream = index, error = %e, "sink write failed, forwarding stopped");
                    sink = None;
                }
                bytes.extend_from_slice(&buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(stream = index, error = %e, "drain: read error");
                return Drained {
                    bytes,
                    error: Some(e),
                };
            }
        }
    }

    Drained { bytes, error: None }
}
