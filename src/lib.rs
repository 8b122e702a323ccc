//! bgzf-reader
//! ===========
//!
//! Streaming decoder for the [BGZF format](https://samtools.github.io/hts-specs/SAMv1.pdf):
//! a sequence of independent gzip members, each at most 64 KiB, carrying its own
//! compressed size in a gzip extra subfield. BAM, tabix and CSI indexes address
//! into such files with *virtual offsets*, a `(member start, offset in
//! decompressed payload)` pair. This crate implements the read path only:
//! block-aligned sequential decoding, virtual offset seek, and a pluggable
//! block cache so indexes can revisit members without re-inflating them.
//!
//! Feature flags
//! -------------
//!
//! * `rayon`: dispatch block decoding on the [rayon](https://github.com/rayon-rs/rayon) thread pool. This is default feature.
//! * `log`: Enable [log](https://github.com/rust-lang/log) crate to log warnings. This is default feature.
//! * `rust_backend`: use `miniz_oxide` crate for [flate2](https://github.com/rust-lang/flate2-rs) backend. This is default feature.
//! * `zlib`: use `zlib` for flate2 backend. Please read [flate2](https://github.com/rust-lang/flate2-rs) description for the detail.
//! * `zlib-ng`: use `zlib-ng` for flate2 backend. Please read [flate2](https://github.com/rust-lang/flate2-rs) description for the detail.
//! * `zlib-ng-compat`: Please read [flate2](https://github.com/rust-lang/flate2-rs) description for the detail.
//! * `cloudflare_zlib`: Please read [flate2](https://github.com/rust-lang/flate2-rs) description for the detail.
//! * `libdeflater`: use `libdeflater` instead of `flate2` crate.
//!
//! Read Example
//! --------
//! ```no_run
//! use bgzf_reader::{BGZFReader, Offset};
//! use std::fs;
//!
//! fn main() -> Result<(), bgzf_reader::BGZFError> {
//!     let mut reader = BGZFReader::new(fs::File::open("testfiles/sample.vcf.gz")?)?;
//!     let mut buf = [0u8; 4096];
//!     let n = reader.read(&mut buf)?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//!     // jump to a position recorded by an index
//!     reader.seek(Offset::from_virtual(4210818610))?;
//!     reader.read(&mut buf)?;
//!     let touched = reader.last_chunk();
//!     println!("read {} .. {}", touched.begin, touched.end);
//!     Ok(())
//! }
//! ```

mod error;

pub mod block;
pub mod cache;
pub mod deflate;
/// Gzip member header parser
pub mod header;
pub mod offset;
pub mod read;

pub use block::{BasicBlock, Block, ReaderId};
pub use cache::{Cache, SharedCache, Wrapper};
pub use error::BGZFError;
pub use offset::{Chunk, Offset};
pub use read::BGZFReader;

use std::io;

/// Hard upper bound of one BGZF member, both compressed and decompressed.
pub const MAX_BLOCK_SIZE: usize = 64 * 1024;

/// End-of-file marker.
///
/// A well-formed BGZF file ends with this empty member. The reader treats any
/// member with an empty payload as an end-of-stream sentinel and never hands
/// it to the caller.
pub const EOF_MARKER: [u8; 28] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02, 0x00,
    0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

pub(crate) trait BinaryReader: io::Read {
    fn read_le_u16(&mut self) -> io::Result<u16> {
        let mut buf: [u8; 2] = [0, 0];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
    fn read_le_u32(&mut self) -> io::Result<u32> {
        let mut buf: [u8; 4] = [0, 0, 0, 0];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
    fn read_until(&mut self, byte: u8, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut tmp = [0u8];
        let mut total_bytes: usize = 0;
        loop {
            let l = self.read(&mut tmp)?;
            if l == 0 {
                break;
            }
            buf.extend_from_slice(&tmp);
            total_bytes += 1;
            if tmp[0] == byte {
                break;
            }
        }

        Ok(total_bytes)
    }
}

impl<R: io::Read> BinaryReader for R {}
