use flate2::write::DeflateEncoder;
use flate2::Compression;
use inflate_stream::{Flush, InflateStream, Status};
use std::cmp::min;
use std::io::Write;

const ABCABC: [u8; 6] = [0x4B, 0x4C, 0x4A, 0x06, 0x22, 0x00];

fn deflate(data: &[u8], level: u32) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::new(level));
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Drive a stream feeding at most `in_chunk` input bytes and `out_chunk`
/// output bytes per call, until it ends or fails.
fn inflate_chunked(
    data: &[u8],
    in_chunk: usize,
    out_chunk: usize,
) -> (Status, Vec<u8>, Option<&'static str>) {
    let mut stream = InflateStream::new();
    let mut out = Vec::new();
    let mut buf = vec![0u8; out_chunk];
    let mut pos = 0usize;
    loop {
        let end = min(pos + in_chunk, data.len());
        let (status, consumed, produced) = stream.write(&data[pos..end], &mut buf, Flush::NoFlush);
        pos += consumed;
        out.extend_from_slice(&buf[..produced]);
        match status {
            Status::Ok => {}
            Status::BufError => {
                // only legal while more input remains to be offered
                assert!(pos < data.len(), "stalled with the input exhausted");
            }
            _ => {
                assert_eq!(stream.total_out(), out.len() as u64);
                assert_eq!(stream.total_in(), pos as u64);
                return (status, out, stream.msg());
            }
        }
    }
}

#[test]
fn byte_at_a_time_matches_one_shot() {
    let (status, out, _) = inflate_chunked(&ABCABC, 1, 1);
    assert_eq!(status, Status::StreamEnd);
    assert_eq!(out, b"abcabc");
}

#[test]
fn stored_blocks_chunked() {
    let data = [
        0x00, 0x02, 0x00, 0xFD, 0xFF, b'h', b'e', 0x01, 0x03, 0x00, 0xFC, 0xFF, b'l', b'l', b'o',
    ];
    for (inc, outc) in [(1, 1), (2, 3), (4, 1), (1, 64)] {
        let (status, out, _) = inflate_chunked(&data, inc, outc);
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(out, b"hello");
    }
}

#[test]
fn dynamic_block_chunked() {
    let data = [
        0x05, 0xC0, 0x81, 0x00, 0x00, 0x00, 0x00, 0x00, 0x90, 0x56, 0xFF, 0x13, 0x20,
    ];
    let (status, out, _) = inflate_chunked(&data, 1, 1);
    assert_eq!(status, Status::StreamEnd);
    assert_eq!(out, b"aaa");
}

#[test]
fn small_window_chunked() {
    let mut stream = InflateStream::with_window_bits(8).unwrap();
    let mut out = Vec::new();
    let mut buf = [0u8; 1];
    let mut pos = 0usize;
    loop {
        let (status, consumed, produced) = stream.write(&ABCABC[pos..], &mut buf, Flush::NoFlush);
        pos += consumed;
        out.extend_from_slice(&buf[..produced]);
        match status {
            Status::Ok => {}
            Status::StreamEnd => break,
            other => panic!("unexpected status {:?}", other),
        }
    }
    assert_eq!(out, b"abcabc");
}

#[test]
fn errors_are_deterministic_under_chunking() {
    let cases: [(&[u8], &str); 4] = [
        (&[0x06, 0x00], "invalid block type"),
        (&[0x01, 0x05, 0x00, 0x00, 0x00], "invalid stored block lengths"),
        (&[0x4B, 0x04, 0x3E], "invalid distance code"),
        (&[0x4B, 0x04, 0x42], "invalid distance too far back"),
    ];
    for (data, want) in cases {
        let (status, _, msg) = inflate_chunked(data, 1, 1);
        assert_eq!(status, Status::DataError);
        assert_eq!(msg, Some(want));

        let mut stream = InflateStream::new();
        let mut out = vec![0u8; 64];
        let (status, _, _) = stream.write(data, &mut out, Flush::NoFlush);
        assert_eq!(status, Status::DataError);
        assert_eq!(stream.msg(), Some(want));
    }
}

#[test]
fn fast_and_slow_paths_agree() {
    // wide buffers take the fast loop; 1-byte buffers never do
    let mut data = Vec::new();
    for i in 0..4000u32 {
        data.extend_from_slice(format!("line {} of the corpus\n", i % 97).as_bytes());
    }
    let compressed = deflate(&data, 6);

    let mut stream = InflateStream::new();
    let mut wide = vec![0u8; data.len() + 512];
    let (status, consumed, produced) = stream.write(&compressed, &mut wide, Flush::Finish);
    assert_eq!(status, Status::StreamEnd);
    assert_eq!(consumed, compressed.len());
    assert_eq!(&wide[..produced], &data[..]);

    let (status, narrow, _) = inflate_chunked(&compressed, 1, 1);
    assert_eq!(status, Status::StreamEnd);
    assert_eq!(narrow, data);
}

#[test]
fn split_points_do_not_change_the_output() {
    let data = b"resumability is the whole point of the mode machine".repeat(20);
    let compressed = deflate(&data, 9);
    let reference = {
        let (status, out, _) = inflate_chunked(&compressed, compressed.len(), 1 << 20);
        assert_eq!(status, Status::StreamEnd);
        out
    };
    assert_eq!(reference, data);
    for split in [1, 2, 3, 5, 7, compressed.len() / 2, compressed.len() - 1] {
        let mut stream = InflateStream::new();
        let mut out = vec![0u8; data.len() + 64];
        let (status, c1, p1) = stream.write(&compressed[..split], &mut out, Flush::NoFlush);
        assert!(status == Status::Ok || status == Status::BufError);
        let (status, c2, p2) = stream.write(&compressed[c1..], &mut out[p1..], Flush::NoFlush);
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(c1 + c2, compressed.len());
        assert_eq!(&out[..p1 + p2], &data[..]);
    }
}
