//! Output interception.
//!
//! [`InterceptedStream`] wraps any stream and reports every successful
//! write, read and seek to its observers after the fact. The console routes
//! all of its output through one of these so the display can keep the log
//! and the prompt in step with what was printed.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use super::display::Display;
use super::lock;

/// Notified about traffic on an [`InterceptedStream`]
pub trait StreamObserver: Send {
    /// Bytes accepted by the inner stream
    fn on_write(&mut self, bytes: &[u8]);

    /// Bytes read from the inner stream
    fn on_read(&mut self, _bytes: &[u8]) {}

    /// A seek and where it ended up
    fn on_seek(&mut self, _target: SeekFrom, _position: u64) {}
}

/// A stream with observers attached
pub struct InterceptedStream<S> {
    inner: S,
    observers: Vec<Box<dyn StreamObserver>>,
}

impl<S> InterceptedStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn StreamObserver>) {
        self.observers.push(observer);
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Write> Write for InterceptedStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        for observer in self.observers.iter_mut() {
            observer.on_write(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: Read> Read for InterceptedStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for observer in self.observers.iter_mut() {
            observer.on_read(&buf[..n]);
        }
        Ok(n)
    }
}

impl<S: Seek> Seek for InterceptedStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let position = self.inner.seek(pos)?;
        for observer in self.observers.iter_mut() {
            observer.on_seek(pos, position);
        }
        Ok(position)
    }
}

/// Feeds written text to the display
pub struct DisplayHook {
    display: Arc<Mutex<Display>>,
}

impl DisplayHook {
    pub fn new(display: Arc<Mutex<Display>>) -> Self {
        Self { display }
    }
}

impl StreamObserver for DisplayHook {
    fn on_write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(bytes);
        lock(&self.display).record_write(&text);
    }
}
