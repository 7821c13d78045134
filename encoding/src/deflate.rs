//! Stream adapters for the Deflated Explicit VR Little Endian
//! transfer syntax.
use crate::error::{CompressionSnafu, Result};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use snafu::ResultExt;
use std::io::{Read, Write};

/// Inflate a deflated data set stream.
pub fn inflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .context(CompressionSnafu { operation: "inflate" })?;
    Ok(out)
}

/// Deflate an encoded data set stream.
pub fn deflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(bytes)
        .context(CompressionSnafu { operation: "deflate" })?;
    encoder
        .finish()
        .context(CompressionSnafu { operation: "deflate" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflate_round_trip() {
        let data = b"a deflated DICOM data set stream".repeat(32);
        let compressed = deflate(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn garbage_input_fails_to_inflate() {
        assert!(inflate(&[0xFF, 0xFE, 0xFD, 0x01, 0x02]).is_err());
    }
}
