//! Byte source and echo sink abstractions

use std::io;

use bytes::{Buf, BufMut, BytesMut};

/// Non-blocking source of input bytes.
///
/// `available` must never block: it reports how many bytes can be read
/// right now, and `read_byte` is only called after a non-zero report.
pub trait ByteSource {
    /// Number of bytes ready to be read without waiting
    fn available(&mut self) -> io::Result<usize>;

    /// Read one byte. Only called when `available` reported data.
    fn read_byte(&mut self) -> io::Result<u8>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn available(&mut self) -> io::Result<usize> {
        (**self).available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn available(&mut self) -> io::Result<usize> {
        (**self).available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }
}

/// Sink for interactive diagnostics sent back to the host
pub trait Echo {
    fn write(&mut self, text: &str);

    fn write_line(&mut self, text: &str) {
        self.write(text);
        self.write("\r\n");
    }
}

/// Echo sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEcho;

impl Echo for NullEcho {
    fn write(&mut self, _text: &str) {}
}

/// Echo sink collecting output until it is taken
#[derive(Debug, Default, Clone)]
pub struct EchoBuffer {
    buf: BytesMut,
}

impl EchoBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take everything written so far
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }
}

impl Echo for EchoBuffer {
    fn write(&mut self, text: &str) {
        self.buf.put_slice(text.as_bytes());
    }
}

impl<E: Echo + ?Sized> Echo for &mut E {
    fn write(&mut self, text: &str) {
        (**self).write(text)
    }

    fn write_line(&mut self, text: &str) {
        (**self).write_line(text)
    }
}

/// In-memory byte queue.
///
/// Producers append with [`MemorySource::push`]; the parser drains it one byte
/// at a time.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    buf: BytesMut,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: impl AsRef<[u8]>) {
        self.buf.put_slice(data.as_ref());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl From<&str> for MemorySource {
    fn from(input: &str) -> Self {
        let mut source = Self::new();
        source.push(input);
        source
    }
}

impl<'a> Extend<&'a u8> for MemorySource {
    fn extend<I: IntoIterator<Item = &'a u8>>(&mut self, iter: I) {
        self.buf.extend(iter);
    }
}

impl ByteSource for MemorySource {
    fn available(&mut self) -> io::Result<usize> {
        Ok(self.buf.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        if !self.buf.has_remaining() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no data available"));
        }
        Ok(self.buf.get_u8())
    }
}
