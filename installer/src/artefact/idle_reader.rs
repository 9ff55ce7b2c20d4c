//! Response bodies that time out on inactivity.
//!
//! The HTTP client's own body timeout is a deadline on the whole transfer,
//! which would abort a large binary that is still arriving steadily.
//! [`IdleTimeoutReader`] instead moves the blocking reads onto a pump thread
//! and fails only when no bytes arrive within the idle bound. A pump stuck
//! on a dead connection is abandoned; it exits once the socket closes or the
//! process ends.

use log::trace;
use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::Duration;

use super::download::FetchError;

const CHUNK_LEN: usize = 16 * 1024;
const CHANNEL_DEPTH: usize = 4;

enum Chunk {
    Data(Vec<u8>),
    End,
    Failed(io::Error),
}

/// A [`Read`] adapter that fails with [`FetchError::Timeout`] when the
/// wrapped reader produces nothing for longer than the idle bound.
///
/// The timeout error is an [`io::ErrorKind::TimedOut`] whose inner error is
/// the [`FetchError`]; [`FetchError::from_body_error`] recovers it.
pub struct IdleTimeoutReader {
    chunks: Receiver<Chunk>,
    pending: Vec<u8>,
    offset: usize,
    finished: bool,
    idle: Duration,
    url: String,
}

impl IdleTimeoutReader {
    /// Start pumping `inner` on a background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the pump thread cannot be spawned.
    pub fn spawn(
        inner: impl Read + Send + 'static,
        idle: Duration,
        url: impl Into<String>,
    ) -> io::Result<Self> {
        let (sender, chunks) = mpsc::sync_channel(CHANNEL_DEPTH);
        thread::Builder::new()
            .name("codexline-body".to_owned())
            .spawn(move || pump(inner, &sender))?;
        Ok(Self {
            chunks,
            pending: Vec::new(),
            offset: 0,
            finished: false,
            idle,
            url: url.into(),
        })
    }

    fn timed_out(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::TimedOut,
            FetchError::Timeout {
                url: self.url.clone(),
                timeout_ms: self.idle.as_millis(),
            },
        )
    }
}

fn pump(mut inner: impl Read, sender: &SyncSender<Chunk>) {
    let mut buffer = vec![0_u8; CHUNK_LEN];
    loop {
        let chunk = match inner.read(&mut buffer) {
            Ok(0) => Chunk::End,
            Ok(n) => Chunk::Data(buffer[..n].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Chunk::Failed(e),
        };
        let last = !matches!(chunk, Chunk::Data(_));
        // A closed channel means the consumer gave up.
        if sender.send(chunk).is_err() || last {
            return;
        }
    }
}

impl Read for IdleTimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.offset >= self.pending.len() {
            if self.finished {
                return Ok(0);
            }
            match self.chunks.recv_timeout(self.idle) {
                Ok(Chunk::Data(bytes)) => {
                    trace!("received {} body bytes from {}", bytes.len(), self.url);
                    self.pending = bytes;
                    self.offset = 0;
                }
                Ok(Chunk::End) => self.finished = true,
                Ok(Chunk::Failed(err)) => return Err(err),
                Err(RecvTimeoutError::Timeout) => return Err(self.timed_out()),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("body of {} ended without EOF", self.url),
                    ));
                }
            }
        }
        let available = &self.pending[self.offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        Ok(n)
    }
}
