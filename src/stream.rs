use crate::inflate::{Flush, InflateStream, Status};
use std::io::{self, Read};

/// Blocking reader that decodes a raw DEFLATE stream from an inner reader.
pub struct DeflateDecoder<R: Read> {
    inner: R,
    stream: InflateStream,
    input_buffer: Vec<u8>,
    input_pos: usize,
    input_cap: usize,
    done: bool,
}

impl<R: Read> DeflateDecoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            stream: InflateStream::new(),
            input_buffer: vec![0; 32 * 1024],
            input_pos: 0,
            input_cap: 0,
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.stream.total_in()
    }

    /// Decoded bytes handed out so far.
    pub fn total_out(&self) -> u64 {
        self.stream.total_out()
    }
}

impl<R: Read> Read for DeflateDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.input_pos == self.input_cap {
                self.input_pos = 0;
                self.input_cap = self.inner.read(&mut self.input_buffer)?;
            }
            let exhausted = self.input_pos == self.input_cap;
            let (status, consumed, produced) = self.stream.write(
                &self.input_buffer[self.input_pos..self.input_cap],
                buf,
                Flush::NoFlush,
            );
            self.input_pos += consumed;
            match status {
                Status::StreamEnd => {
                    self.done = true;
                    return Ok(produced);
                }
                Status::Ok => {
                    if produced > 0 {
                        return Ok(produced);
                    }
                }
                Status::BufError => {
                    if exhausted {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "deflate stream ended unexpectedly",
                        ));
                    }
                    // no progress without more input; refill and retry
                }
                Status::DataError => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        self.stream.msg().unwrap_or("invalid deflate stream"),
                    ));
                }
                Status::MemError => {
                    return Err(io::Error::new(
                        io::ErrorKind::OutOfMemory,
                        "window allocation failed",
                    ));
                }
                Status::StreamError => {
                    return Err(io::Error::new(io::ErrorKind::InvalidInput, "stream error"));
                }
            }
        }
    }
}
