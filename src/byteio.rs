//! Buffered byte I/O: a pull window over a `Read` source for parsing, and a
//! push window over a `Write` sink for emitting. Both also implement
//! `std::io::Read`/`std::io::Write` so the binary encoding primitives in
//! `encoding.rs` can decode/encode values directly through `byteorder`'s
//! extension traits on top of the same buffer.

use std::io::{self, Read, Write};

use crate::error::{PlyError, Result};

const CAPACITY: usize = 8192;

/// Whether a header line seen so far ended in `\n` or `\r\n`. The first
/// header line fixes this for the rest of the header (spec §4.2/§8
/// scenario 7); a later line with the other convention is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

/// A fill-on-demand buffered reader with text tokenizing helpers layered
/// over the raw byte window.
pub struct ByteReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
}

impl<R: Read> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        ByteReader {
            inner,
            buf: vec![0u8; CAPACITY],
            pos: 0,
            filled: 0,
        }
    }

    /// Refill the window from the underlying source. Used by both the text
    /// tokenizing helpers (via `Result`) and the `std::io::Read` impl below
    /// (via plain `io::Result`), so the binary decode path that goes through
    /// `Read` stays on the same buffer instead of falling back to one small
    /// unbuffered syscall per value once the window is drained.
    fn fill_buf(&mut self) -> io::Result<()> {
        self.pos = 0;
        self.filled = self.inner.read(&mut self.buf)?;
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        self.fill_buf()?;
        Ok(())
    }

    /// Look at the next byte without consuming it. `None` at end of input.
    pub fn peek_byte(&mut self) -> Result<Option<u8>> {
        if self.pos >= self.filled {
            self.refill()?;
        }
        Ok(if self.pos < self.filled {
            Some(self.buf[self.pos])
        } else {
            None
        })
    }

    /// Consume and return the next byte. `Eof` at end of input.
    pub fn get_byte(&mut self) -> Result<u8> {
        match self.peek_byte()? {
            Some(b) => {
                self.pos += 1;
                Ok(b)
            }
            None => Err(PlyError::Eof { context: "a byte" }),
        }
    }

    /// Consume and return exactly `n` bytes.
    pub fn get_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; n];
        self.read_exact(&mut out).map_err(|e| io_to_ply(e, "bytes"))?;
        Ok(out)
    }

    fn is_space(b: u8) -> bool {
        matches!(b, b' ' | b'\t' | b'\r' | b'\n')
    }

    /// Consume whitespace (space, tab, CR, LF) up to the next non-whitespace
    /// byte or end of input.
    pub fn skip_whitespace(&mut self) -> Result<()> {
        while let Some(b) = self.peek_byte()? {
            if Self::is_space(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Skip leading whitespace, then read the maximal run of non-whitespace
    /// bytes as a UTF-8 word.
    pub fn read_word(&mut self) -> Result<String> {
        self.skip_whitespace()?;
        let mut bytes = Vec::new();
        while let Some(b) = self.peek_byte()? {
            if Self::is_space(b) {
                break;
            }
            bytes.push(b);
            self.pos += 1;
        }
        if bytes.is_empty() {
            return Err(PlyError::Eof {
                context: "a whitespace-delimited word",
            });
        }
        String::from_utf8(bytes).map_err(|e| PlyError::InvalidText(e.utf8_error()))
    }

    /// Read a full header line (everything up to and including its
    /// terminator), returning the text and which line-ending convention it
    /// used.
    pub fn read_header_line(&mut self) -> Result<(String, LineEnding)> {
        let mut bytes = Vec::new();
        loop {
            let b = self.get_byte()?;
            if b == b'\n' {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                    let text = String::from_utf8(bytes)
                        .map_err(|e| PlyError::InvalidText(e.utf8_error()))?;
                    return Ok((text, LineEnding::Crlf));
                }
                let text =
                    String::from_utf8(bytes).map_err(|e| PlyError::InvalidText(e.utf8_error()))?;
                return Ok((text, LineEnding::Lf));
            }
            bytes.push(b);
        }
    }
}

impl<R: Read> Read for ByteReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.filled {
            // Window drained: refill from the source instead of bypassing
            // the buffer, so a binary body larger than one window still
            // goes through buffered reads rather than one syscall per value.
            self.fill_buf()?;
            if self.filled == 0 {
                return Ok(0);
            }
        }
        let available = &self.buf[self.pos..self.filled];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

fn io_to_ply(e: io::Error, context: &'static str) -> PlyError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        PlyError::Eof { context }
    } else {
        PlyError::IOError(e)
    }
}

/// A flush-on-full buffered writer.
pub struct ByteWriter<W> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> ByteWriter<W> {
    pub fn new(inner: W) -> Self {
        ByteWriter {
            inner,
            buf: Vec::with_capacity(CAPACITY),
        }
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() >= CAPACITY {
            self.flush_buffer()?;
        }
        Ok(())
    }

    pub fn put_word(&mut self, word: &str) -> Result<()> {
        self.put_bytes(word.as_bytes())
    }

    /// Writes a single LF. Per spec §4.2, output always uses LF regardless
    /// of what convention the input (if any) used.
    pub fn put_eol(&mut self) -> Result<()> {
        self.put_bytes(b"\n")
    }

    pub fn flush_buffer(&mut self) -> Result<()> {
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        Ok(())
    }

    /// Flush and hand back the underlying sink (so an in-memory sink's
    /// final bytes are recoverable by the caller).
    pub fn into_inner(mut self) -> Result<W> {
        self.flush_buffer()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for ByteWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CAPACITY {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        self.inner.flush()
    }
}
