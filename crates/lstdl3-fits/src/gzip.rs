//! `.fits.gz` containers.
//!
//! Index files are distributed gzip-compressed; DL3 files may be too.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Returns `true` if `data` starts with the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Wrap `data` in a gzip member.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate a gzip member; the CRC-32 and length trailer are verified.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if !is_gzip(data) {
        return Err(Error::Decompression("not a gzip member".into()));
    }
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(out)
}

/// Return `data` unchanged, or its inflated content if it is gzip.
pub fn maybe_decompress(data: Vec<u8>) -> Result<Vec<u8>> {
    if is_gzip(&data) {
        decompress(&data)
    } else {
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_blocks() -> Vec<u8> {
        b"SIMPLE  =                    T"
            .iter()
            .copied()
            .cycle()
            .take(2880 * 3)
            .collect()
    }

    #[test]
    fn compress_then_decompress() {
        let data = header_blocks();
        let packed = compress(&data).unwrap();
        assert!(is_gzip(&packed));
        assert!(packed.len() < data.len());
        assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn corrupted_trailer_is_rejected() {
        let mut packed = compress(b"obs-index").unwrap();
        let n = packed.len();
        packed[n - 8] ^= 0xff;
        assert!(matches!(decompress(&packed), Err(Error::Decompression(_))));
    }

    #[test]
    fn truncated_member_is_rejected() {
        let packed = compress(&header_blocks()).unwrap();
        assert!(decompress(&packed[..packed.len() / 2]).is_err());
    }

    #[test]
    fn plain_data_passes_through() {
        let data = vec![b' '; 2880];
        assert_eq!(maybe_decompress(data.clone()).unwrap(), data);
        assert!(matches!(decompress(&data), Err(Error::Decompression(_))));
    }
}
