//! Decompressed members and their bookkeeping.

use crate::deflate::{Crc, Decompress};
use crate::header::MemberHeader;
use crate::offset::Offset;
use crate::{BGZFError, BinaryReader, MAX_BLOCK_SIZE};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity tag of the reader a block belongs to.
///
/// Blocks deposited into a shared cache carry the tag of the reader that
/// decoded them; a reader refuses blocks carrying a foreign tag. The tag is
/// only compared, it does not keep the reader alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReaderId(u64);

impl ReaderId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ReaderId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// One decompressed gzip member together with its position, header and a read
/// cursor.
///
/// The default implementation is [`BasicBlock`]. Cache policies that need
/// their own per-block bookkeeping can decorate blocks through
/// [`crate::Wrapper`] and forward these methods to the wrapped block.
pub trait Block: Send {
    /// File offset of the gzip member header this block was decoded from.
    fn base(&self) -> u64;
    fn set_base(&mut self, base: u64);

    /// Total compressed length of the member, including all gzip framing.
    fn size(&self) -> u64;
    fn set_size(&mut self, size: u64);

    /// Header of the decoded member, if one has been decoded.
    fn header(&self) -> Option<&MemberHeader>;
    fn set_header(&mut self, header: MemberHeader);

    fn owner(&self) -> ReaderId;
    fn set_owner(&mut self, owner: ReaderId);

    /// Bytes remaining between the cursor and the end of the payload.
    fn len(&self) -> usize;

    /// Current virtual offset, `(base, cursor)`.
    fn virtual_offset(&self) -> Offset;

    /// Move the cursor to `intra` bytes into the payload.
    fn seek(&mut self, intra: u16) -> Result<(), BGZFError>;

    /// Copy payload bytes from the cursor into `buf`, advancing the cursor.
    /// Returns the number of bytes copied.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Inflate a staged compressed member (deflate stream followed by the
    /// 8 byte gzip trailer) into this block's payload, verify it against the
    /// trailer, and rewind the cursor.
    fn read_from(&mut self, compressed: &[u8], decompress: &mut Decompress)
        -> Result<(), BGZFError>;

    /// Clear decoded state so the block can be refilled.
    fn reset(&mut self);

    fn has_data(&self) -> bool {
        self.len() > 0
    }

    fn owned_by(&self, owner: ReaderId) -> bool {
        self.owner() == owner
    }

    /// File offset immediately past this member.
    fn next_base(&self) -> u64 {
        self.base() + self.size()
    }
}

/// Default [`Block`] implementation.
pub struct BasicBlock {
    owner: ReaderId,
    base: u64,
    size: u64,
    header: Option<MemberHeader>,
    payload: Vec<u8>,
    cursor: usize,
}

impl BasicBlock {
    pub fn new(owner: ReaderId) -> Self {
        BasicBlock {
            owner,
            base: 0,
            size: 0,
            header: None,
            payload: Vec::new(),
            cursor: 0,
        }
    }
}

impl Block for BasicBlock {
    fn base(&self) -> u64 {
        self.base
    }

    fn set_base(&mut self, base: u64) {
        self.base = base;
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    fn header(&self) -> Option<&MemberHeader> {
        self.header.as_ref()
    }

    fn set_header(&mut self, header: MemberHeader) {
        self.header = Some(header);
    }

    fn owner(&self) -> ReaderId {
        self.owner
    }

    fn set_owner(&mut self, owner: ReaderId) {
        self.owner = owner;
    }

    fn len(&self) -> usize {
        self.payload.len() - self.cursor
    }

    fn virtual_offset(&self) -> Offset {
        Offset {
            file: self.base,
            block: self.cursor as u16,
        }
    }

    fn seek(&mut self, intra: u16) -> Result<(), BGZFError> {
        let cursor = usize::from(intra);
        if cursor > self.payload.len() {
            return Err(BGZFError::OffsetOutOfRange {
                offset: intra,
                len: self.payload.len(),
            });
        }
        self.cursor = cursor;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.len());
        buf[..n].copy_from_slice(&self.payload[self.cursor..self.cursor + n]);
        self.cursor += n;
        n
    }

    fn read_from(
        &mut self,
        compressed: &[u8],
        decompress: &mut Decompress,
    ) -> Result<(), BGZFError> {
        if compressed.len() < usize::from(crate::header::BGZF_TRAILER_SIZE) {
            return Err(BGZFError::Other {
                message: "compressed member is too short",
            });
        }
        let (deflate_data, mut trailer) = compressed.split_at(compressed.len() - 8);
        let expected_crc = trailer.read_le_u32()?;
        let expected_len = trailer.read_le_u32()? as usize;
        if expected_len > MAX_BLOCK_SIZE {
            return Err(BGZFError::Other {
                message: "uncompressed block size exceeds BGZF limit",
            });
        }

        self.payload.clear();
        self.payload.resize(expected_len, 0);
        let decompressed_len = decompress.decompress(deflate_data, &mut self.payload)?;
        if decompressed_len != expected_len {
            return Err(BGZFError::Other {
                message: "unmatched length of decompressed data",
            });
        }

        let mut crc = Crc::new();
        crc.update(&self.payload);
        if crc.sum() != expected_crc {
            return Err(BGZFError::Other {
                message: "unmatched CRC32 of decompressed data",
            });
        }

        self.cursor = 0;
        Ok(())
    }

    fn reset(&mut self) {
        self.base = 0;
        self.size = 0;
        self.header = None;
        self.payload.clear();
        self.cursor = 0;
    }
}
