//! Output sink abstraction consumed by the muxer
//!
//! Every serializer in this crate writes through the [`Writer`] trait. Two
//! sinks are provided: [`IoWriter`] for seekable targets (files, in-memory
//! cursors) and [`StreamWriter`] for append-only targets where the muxer
//! must leave unknown-size sentinels in place.

use crate::error::{Error, Result};
use std::io::{Seek, SeekFrom, Write};

/// Byte sink the muxer writes into.
///
/// The muxer borrows the writer for its lifetime and never closes it.
pub trait Writer {
    /// Append bytes at the current position.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Current byte offset.
    fn position(&self) -> u64;

    /// Seek to an absolute byte offset. Only required in file mode;
    /// non-seekable sinks return [`Error::Unsupported`].
    fn set_position(&mut self, position: u64) -> Result<()>;

    /// Whether `set_position` works. Consulted before every back-patch.
    fn seekable(&self) -> bool;
}

impl<T: Writer + ?Sized> Writer for &mut T {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        (**self).set_position(position)
    }

    fn seekable(&self) -> bool {
        (**self).seekable()
    }
}

/// Seekable writer backed by any `Write + Seek`.
///
/// The wrapped sink must start at byte offset zero; the wrapper tracks the
/// position itself so `position()` stays infallible.
pub struct IoWriter<W: Write + Seek> {
    inner: W,
    position: u64,
}

impl<W: Write + Seek> IoWriter<W> {
    /// Create a new seekable writer.
    pub fn new(inner: W) -> Self {
        IoWriter { inner, position: 0 }
    }

    /// Get a reference to the wrapped sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap into the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> Writer for IoWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf).map_err(Error::Io)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(position))
            .map_err(Error::Io)?;
        self.position = position;
        Ok(())
    }

    fn seekable(&self) -> bool {
        true
    }
}

/// Append-only writer for live-mode output (sockets, pipes).
pub struct StreamWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> StreamWriter<W> {
    /// Create a new append-only writer.
    pub fn new(inner: W) -> Self {
        StreamWriter { inner, position: 0 }
    }

    /// Unwrap into the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Writer for StreamWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf).map_err(Error::Io)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, _position: u64) -> Result<()> {
        Err(Error::unsupported("writer is not seekable"))
    }

    fn seekable(&self) -> bool {
        false
    }
}
