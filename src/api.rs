use crate::inflate::{Flush, InflateStream, Status};
use std::io;

/// One-shot convenience wrapper over [`InflateStream`].
///
/// Reusable: every call starts a fresh stream on the same window
/// allocation.
pub struct Inflater {
    stream: InflateStream,
}

impl Inflater {
    pub fn new() -> Self {
        Inflater {
            stream: InflateStream::new(),
        }
    }

    /// Decode a whole raw DEFLATE stream into a freshly allocated buffer.
    pub fn inflate(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        let _ = self.stream.reset(self.stream.window_bits());
        let mut out = Vec::new();
        let mut scratch = vec![0u8; 32 * 1024];
        let mut consumed = 0usize;
        loop {
            let (status, inc, outc) =
                self.stream
                    .write(&data[consumed..], &mut scratch, Flush::NoFlush);
            consumed += inc;
            out.extend_from_slice(&scratch[..outc]);
            match status {
                Status::StreamEnd => return Ok(out),
                Status::Ok => {}
                Status::BufError => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "truncated deflate stream",
                    ));
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

    /// Decode a whole raw DEFLATE stream into `output`, returning the
    /// decoded length.
    pub fn inflate_into(&mut self, data: &[u8], output: &mut [u8]) -> io::Result<usize> {
        let _ = self.stream.reset(self.stream.window_bits());
        let (status, _, produced) = self.stream.write(data, output, Flush::Finish);
        match status {
            Status::StreamEnd => Ok(produced),
            Status::BufError => Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "insufficient space or truncated stream",
            )),
            Status::DataError => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                self.stream.msg().unwrap_or("invalid deflate stream"),
            )),
            Status::MemError => Err(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "window allocation failed",
            )),
            Status::Ok | Status::StreamError => {
                Err(io::Error::new(io::ErrorKind::InvalidInput, "stream error"))
            }
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}
