//! Compact encoding for failure details printed alongside warnings.
//!
//! Details are zlib-compressed and base64-encoded so a whole SDK error chain
//! fits on one log line and survives being pasted into a chat or ticket.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

pub fn encode(detail: &str) -> io::Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(detail.as_bytes())?;
    let compressed = encoder.finish()?;

    Ok(STANDARD.encode(compressed))
}

pub fn decode(encoded: &str) -> io::Result<String> {
    let compressed = STANDARD
        .decode(encoded.trim())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut detail = String::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_string(&mut detail)?;

    Ok(detail)
}
