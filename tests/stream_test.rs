use flate2::write::DeflateEncoder;
use flate2::Compression;
use inflate_stream::stream::DeflateDecoder;
use std::io::{Cursor, Read, Write};

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

#[test]
fn test_stream_round_trip() {
    let mut data = Vec::with_capacity(10000);
    for i in 0..10000 {
        data.push((i % 256) as u8);
    }
    let compressed = deflate(&data);

    let mut decoder = DeflateDecoder::new(Cursor::new(compressed));
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).unwrap();

    assert_eq!(data, decompressed);
}

#[test]
fn test_stream_small_chunks() {
    let mut data = Vec::with_capacity(10000);
    for i in 0..10000 {
        data.push((i % 256) as u8);
    }
    let compressed = deflate(&data);

    let mut decoder = DeflateDecoder::new(Cursor::new(compressed));
    let mut decompressed = Vec::new();
    let mut buf = [0u8; 10];
    loop {
        let n = decoder.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        decompressed.extend_from_slice(&buf[..n]);
    }

    assert_eq!(data, decompressed);
}

#[test]
fn test_stream_accounting() {
    let data = b"accounting accounting accounting".repeat(50);
    let compressed = deflate(&data);
    let total = compressed.len() as u64;

    let mut decoder = DeflateDecoder::new(Cursor::new(compressed));
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).unwrap();
    assert_eq!(decoder.total_in(), total);
    assert_eq!(decoder.total_out(), data.len() as u64);
}

#[test]
fn test_truncated_stream() {
    let compressed = deflate(b"this stream will be cut short, which must not go unnoticed");
    let cut = &compressed[..compressed.len() - 4];

    let mut decoder = DeflateDecoder::new(Cursor::new(cut.to_vec()));
    let mut out = Vec::new();
    let err = decoder.read_to_end(&mut out).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}

#[test]
fn test_garbage_input() {
    // reserved block type 11
    let mut decoder = DeflateDecoder::new(Cursor::new(vec![0x06, 0x00]));
    let mut out = Vec::new();
    let err = decoder.read_to_end(&mut out).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    assert_eq!(err.to_string(), "invalid block type");
}

#[test]
fn test_reads_after_end_return_zero() {
    let compressed = deflate(b"done");
    let mut decoder = DeflateDecoder::new(Cursor::new(compressed));
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    assert_eq!(out, b"done");
    let mut buf = [0u8; 8];
    assert_eq!(decoder.read(&mut buf).unwrap(), 0);
}
