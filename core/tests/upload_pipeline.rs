/*
 * upload_pipeline.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration test for the upload body pipeline: multipart encoding streamed
 * through the chunked transfer-encoding sink, then de-chunked and checked
 * against what a conformant server-side parser would recover.
 *
 * Run with:
 *   cargo test -p portacarte_core --test upload_pipeline
 */

use std::io::Cursor;

use portacarte_core::http::{ChunkedWriter, ParseState, StatusParser};
use portacarte_core::multipart::{encode, Boundary, Part};

/// Undo chunked transfer encoding (sizes in hex, CRLF framing, zero terminator).
fn dechunk(mut data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let line_end = data.windows(2).position(|w| w == b"\r\n").expect("chunk size line");
        let size = usize::from_str_radix(std::str::from_utf8(&data[..line_end]).unwrap(), 16)
            .expect("hex chunk size");
        data = &data[line_end + 2..];
        if size == 0 {
            assert_eq!(data, b"\r\n", "terminal chunk must end the stream");
            return out;
        }
        out.extend_from_slice(&data[..size]);
        assert_eq!(&data[size..size + 2], b"\r\n");
        data = &data[size + 2..];
    }
}

#[tokio::test]
async fn multipart_body_survives_chunked_framing() {
    let metadata = br#"{"typeName":"File","name":"a.txt"}"#;
    let content: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 256) as u8).collect();
    let boundary = Boundary::generate();

    let parts = vec![
        Part::field("ObjectMetadata", "application/json", &metadata[..]),
        Part::file("filestream", "application/octet-stream", "a.txt", &content[..]),
    ];

    let mut chunked = ChunkedWriter::new(Cursor::new(Vec::new()));
    encode(parts, &boundary, &mut chunked).await.expect("encode");
    let sink = chunked.finish().await.expect("finish");

    let body = dechunk(&sink.into_inner());

    // Same parts, same boundary, written straight: the chunked framing must be
    // transparent to the body.
    let parts = vec![
        Part::field("ObjectMetadata", "application/json", &metadata[..]),
        Part::file("filestream", "application/octet-stream", "a.txt", &content[..]),
    ];
    let mut plain = Cursor::new(Vec::new());
    encode(parts, &boundary, &mut plain).await.expect("encode");
    assert_eq!(body, plain.into_inner());

    // And the body carries both parts in order with the exact content bytes.
    let text_head = String::from_utf8_lossy(&body[..256]);
    assert!(text_head.contains("name=\"ObjectMetadata\""));
    let meta_at = find(&body, metadata).expect("metadata part content");
    let file_header_at = find(&body, b"name=\"filestream\"; filename=\"a.txt\"").expect("file part header");
    let content_at = find(&body, &content).expect("file part content");
    assert!(meta_at < file_header_at && file_header_at < content_at);
}

#[tokio::test]
async fn response_head_parses_after_body_exchange() {
    // What the server side of the exchange sends back; only the status code
    // and headers are consumed.
    let mut parser = StatusParser::new();
    let mut buf = bytes::BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"id\":\"42\"}"[..]);
    parser.receive(&mut buf).expect("parse");
    assert_eq!(parser.state(), ParseState::Complete);
    assert_eq!(parser.status_code(), Some(200));
    assert_eq!(parser.header("Content-Type"), Some("application/json"));
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
