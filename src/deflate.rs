//! Binding to DEFLATE library.
//!
//! [libdeflater](https://crates.io/crates/libdeflater) or [flate2](https://crates.io/crates/flate2)
//! is used to decompress data. Only the inflate half is exposed; this crate
//! does not encode BGZF.

#[cfg(not(feature = "libdeflater"))]
use std::convert::TryInto;
use thiserror::Error;

#[cfg(not(feature = "libdeflater"))]
use flate2::Status;

#[cfg(not(feature = "libdeflater"))]
pub use flate2::Crc;

#[cfg(feature = "libdeflater")]
pub use libdeflater::Crc;

/// Decompress Error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecompressError {
    #[error("Decompress Error: Insufficient space")]
    InsufficientSpace,
    #[error("Decompress Error: Bad data")]
    BadData,
    #[error("Decompress Error: {0}")]
    Other(String),
}

/// flate2 based decompressor
#[cfg(not(feature = "libdeflater"))]
#[derive(Debug)]
pub struct Decompress(flate2::Decompress);

#[cfg(not(feature = "libdeflater"))]
impl Decompress {
    pub fn new() -> Self {
        Decompress(flate2::Decompress::new(false))
    }

    /// Inflate a whole deflate stream into `decompressed_data`, which must be
    /// sized to the expected output.
    pub fn decompress(
        &mut self,
        compressed_data: &[u8],
        decompressed_data: &mut [u8],
    ) -> Result<usize, DecompressError> {
        self.0.reset(false);
        match self
            .0
            .decompress(
                compressed_data,
                decompressed_data,
                flate2::FlushDecompress::Finish,
            )
            .map_err(|e| {
                DecompressError::Other(e.message().unwrap_or("Unknown Error").to_string())
            })? {
            Status::StreamEnd => Ok(self.0.total_out().try_into().unwrap()),
            Status::Ok => Err(DecompressError::InsufficientSpace),
            Status::BufError => Err(DecompressError::InsufficientSpace),
        }
    }
}

#[cfg(not(feature = "libdeflater"))]
impl Default for Decompress {
    fn default() -> Self {
        Decompress::new()
    }
}

/// libdeflater based decompressor
#[cfg(feature = "libdeflater")]
pub struct Decompress(libdeflater::Decompressor);

#[cfg(feature = "libdeflater")]
impl Decompress {
    pub fn new() -> Self {
        Decompress(libdeflater::Decompressor::new())
    }

    /// Inflate a whole deflate stream into `decompressed_data`, which must be
    /// sized to the expected output.
    pub fn decompress(
        &mut self,
        compressed_data: &[u8],
        decompressed_data: &mut [u8],
    ) -> Result<usize, DecompressError> {
        self.0
            .deflate_decompress(compressed_data, decompressed_data)
            .map_err(|e| match e {
                libdeflater::DecompressionError::BadData => DecompressError::BadData,
                libdeflater::DecompressionError::InsufficientSpace => {
                    DecompressError::InsufficientSpace
                }
            })
    }
}

#[cfg(feature = "libdeflater")]
impl Default for Decompress {
    fn default() -> Self {
        Decompress::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use std::io::Write;

    const BUF_SIZE: usize = 3000;

    #[test]
    fn test_inflate() -> anyhow::Result<()> {
        let mut rand = rand_pcg::Pcg64Mcg::seed_from_u64(0x3874aef456157523);
        let mut original_data = vec![0; BUF_SIZE];
        rand.fill_bytes(&mut original_data);

        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&original_data)?;
        let deflated_data = encoder.finish()?;

        let mut decompress = Decompress::new();
        let mut small_buf = [0; 100];
        assert!(decompress
            .decompress(&deflated_data, &mut small_buf)
            .is_err());

        // truncated input cannot reach the end of the stream
        let mut inflated_data = vec![0; BUF_SIZE];
        assert!(decompress
            .decompress(&deflated_data[..10], &mut inflated_data)
            .is_err());

        let inflate_size = decompress.decompress(&deflated_data, &mut inflated_data)?;
        assert_eq!(inflate_size, original_data.len());
        assert_eq!(inflated_data, original_data);

        Ok(())
    }

    #[test]
    fn test_crc() {
        let mut crc = Crc::new();
        crc.update(b"123456789");
        assert_eq!(crc.sum(), 0xcbf43926);
    }
}
