//! BGZF reader.
//!
//! [`BGZFReader`] decodes a stream of gzip members one block at a time. It
//! keeps the current block, a single-worker decompressor, and the region the
//! most recent operation touched, so that index builders can record where
//! every record came from.

mod worker;

use crate::block::{BasicBlock, Block, ReaderId};
use crate::cache::{Cache, SharedCache};
use crate::header::MemberHeader;
use crate::offset::{Chunk, Offset};
use crate::BGZFError;
use std::io::{self, Read, Seek};
use std::sync::{Arc, Mutex};

use worker::{Decompressor, Head, Next};

/// Byte source wrapper that tracks the absolute offset in the compressed
/// stream. Gzip decoding wants byte-granular reads, so the source always sits
/// behind a buffered layer.
pub(crate) struct CountReader<R: Read> {
    inner: io::BufReader<R>,
    off: u64,
    seek: Option<fn(&mut io::BufReader<R>, u64) -> io::Result<u64>>,
}

impl<R: Read> CountReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        CountReader {
            inner: io::BufReader::new(reader),
            off: 0,
            seek: None,
        }
    }

    /// Number of bytes delivered since construction or the last seek.
    pub(crate) fn offset(&self) -> u64 {
        self.off
    }

    /// Reposition the underlying source to absolute `off` and drop any
    /// buffered bytes, so the next read pulls from `off`.
    pub(crate) fn seek_to(&mut self, off: u64) -> Result<(), BGZFError> {
        match self.seek {
            Some(seek) => {
                seek(&mut self.inner, off)?;
                self.off = off;
                Ok(())
            }
            None => Err(BGZFError::NotASeeker),
        }
    }
}

impl<R: Read + Seek> CountReader<R> {
    pub(crate) fn seekable(reader: R) -> Self {
        CountReader {
            inner: io::BufReader::new(reader),
            off: 0,
            seek: Some(|inner, off| inner.seek(io::SeekFrom::Start(off))),
        }
    }
}

impl<R: Read> Read for CountReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.off += n as u64;
        Ok(n)
    }
}

/// A BGZF reader.
///
/// Decodes block-aligned BGZF streams with virtual offset seek support. The
/// reader is not safe for concurrent use; internally it decodes one member at
/// a time while the caller consumes the previous one.
///
/// Errors are sticky: after the first failure every call returns the same
/// error until the reader is dropped. A clean end of stream is not an error;
/// [`BGZFReader::read`] simply returns `Ok(0)`.
pub struct BGZFReader<R: Read> {
    dec: Decompressor<R>,
    current: Box<dyn Block>,
    seekable: bool,
    last_chunk: Chunk,
    last_len: usize,
    eof: bool,
    err: Option<BGZFError>,
}

impl<R: Read> std::fmt::Debug for BGZFReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BGZFReader")
            .field("seekable", &self.seekable)
            .field("last_chunk", &self.last_chunk)
            .field("last_len", &self.last_len)
            .field("eof", &self.eof)
            .field("err", &self.err)
            .finish()
    }
}

impl<R: Read + Seek + Send + 'static> BGZFReader<R> {
    /// Create a new BGZF reader from a seekable source.
    ///
    /// The first member is decoded eagerly, so malformed input fails here
    /// rather than at the first read.
    pub fn new(reader: R) -> Result<Self, BGZFError> {
        Self::with_workers(reader, 1)
    }

    /// Create a new BGZF reader with a decode parallelism hint.
    ///
    /// `workers` is accepted for interface stability; the present
    /// implementation keeps a single member in flight.
    pub fn with_workers(reader: R, workers: usize) -> Result<Self, BGZFError> {
        Self::start(CountReader::seekable(reader), true, workers)
    }
}

impl<R: Read + Send + 'static> BGZFReader<R> {
    /// Create a new BGZF reader from a non-seekable stream.
    ///
    /// Sequential decoding works as usual; [`BGZFReader::seek`] fails with
    /// [`BGZFError::NotASeeker`].
    pub fn from_stream(reader: R) -> Result<Self, BGZFError> {
        Self::from_stream_with_workers(reader, 1)
    }

    /// Like [`BGZFReader::from_stream`], with a decode parallelism hint.
    pub fn from_stream_with_workers(reader: R, workers: usize) -> Result<Self, BGZFError> {
        Self::start(CountReader::new(reader), false, workers)
    }

    fn start(reader: CountReader<R>, seekable: bool, workers: usize) -> Result<Self, BGZFError> {
        let owner = ReaderId::next();
        let head = Head::new(reader);
        let dec = Decompressor::new(head, owner, workers);
        let mut reader = BGZFReader {
            dec,
            current: Box::new(BasicBlock::new(owner)),
            seekable,
            last_chunk: Chunk::default(),
            last_len: 0,
            eof: false,
            err: None,
        };
        reader.fetch(0)?;
        Ok(reader)
    }

    /// Obtain the block starting at `base`, retiring the current block into
    /// the decompressor.
    fn fetch(&mut self, base: u64) -> Result<(), BGZFError> {
        self.dec.next_block_at(base)?;
        match self.dec.wait()? {
            Next::Block(block) => {
                self.last_len = block.len();
                let old = std::mem::replace(&mut self.current, block);
                self.dec.using(old);
                self.eof = false;
            }
            Next::End => {
                if !self.eof && self.last_len != 0 {
                    #[cfg(feature = "log")]
                    log::warn!("BGZF stream ends without an empty end-of-file member");
                }
                self.eof = true;
            }
        }
        Ok(())
    }

    /// Read decompressed bytes into `buf`.
    ///
    /// Keeps pulling members until `buf` is full or the stream ends, and
    /// never advances past the member that produced the final byte. Returns
    /// the number of bytes written; `Ok(0)` means end of stream. Terminal
    /// empty members are skipped and never reach the caller.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, BGZFError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        while !self.current.has_data() {
            if self.eof {
                return Ok(0);
            }
            let base = self.current.next_base();
            if let Err(e) = self.fetch(base) {
                self.err = Some(e.clone());
                return Err(e);
            }
        }

        self.last_chunk.begin = self.current.virtual_offset();
        self.last_chunk.end = self.last_chunk.begin;

        let mut n = 0;
        while n < buf.len() {
            let copied = self.current.read(&mut buf[n..]);
            if copied > 0 {
                n += copied;
                self.last_chunk.end = self.current.virtual_offset();
            }
            if !self.current.has_data() {
                if n == buf.len() || self.eof {
                    break;
                }
                let base = self.current.next_base();
                if let Err(e) = self.fetch(base) {
                    self.err = Some(e.clone());
                    if n == 0 {
                        return Err(e);
                    }
                    break;
                }
            }
        }

        Ok(n)
    }

    /// Move to a virtual offset.
    ///
    /// The member at `offset.file` is materialized (from the cache when
    /// possible) and the cursor placed `offset.block` bytes into its
    /// decompressed payload. Requires a seekable source.
    pub fn seek(&mut self, offset: Offset) -> Result<(), BGZFError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if !self.seekable {
            let e = BGZFError::NotASeeker;
            self.err = Some(e.clone());
            return Err(e);
        }

        if offset.file != self.current.base() || !self.current.has_data() {
            if let Err(e) = self.fetch(offset.file) {
                self.err = Some(e.clone());
                return Err(e);
            }
            if self.current.base() != offset.file {
                // the stream ended before `offset.file`
                let e = BGZFError::from(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "virtual offset is past the end of the stream",
                ));
                self.err = Some(e.clone());
                return Err(e);
            }
        }

        if let Err(e) = self.current.seek(offset.block) {
            self.err = Some(e.clone());
            return Err(e);
        }
        self.last_chunk = Chunk {
            begin: offset,
            end: offset,
        };
        Ok(())
    }

    /// The virtual offset region touched by the most recent successful read,
    /// or the degenerate point set by the most recent seek.
    pub fn last_chunk(&self) -> Chunk {
        self.last_chunk
    }

    /// Current position as a virtual offset.
    pub fn virtual_offset(&self) -> Offset {
        self.current.virtual_offset()
    }

    /// Header of the most recently surfaced gzip member.
    pub fn header(&self) -> Option<&MemberHeader> {
        self.current.header()
    }

    /// The decode parallelism hint this reader was built with.
    pub fn workers(&self) -> usize {
        self.dec.workers()
    }

    /// Install a block cache owned by this reader alone.
    pub fn set_cache<C: Cache + Send + 'static>(&mut self, cache: C) {
        self.dec.set_cache(Some(Arc::new(Mutex::new(cache))));
    }

    /// Install a cache that may be shared with other readers.
    pub fn set_shared_cache(&mut self, cache: SharedCache) {
        self.dec.set_cache(Some(cache));
    }

    /// Release the cache reference and report the sticky error, if any.
    ///
    /// A clean end of stream is not an error.
    pub fn close(mut self) -> Result<(), BGZFError> {
        self.dec.set_cache(None);
        match self.err.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<R: Read + Send + 'static> Read for BGZFReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        BGZFReader::read(self, buf).map_err(|e| e.into_io_error())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::Wrapper;
    use crate::deflate::Decompress;
    use crate::{EOF_MARKER, MAX_BLOCK_SIZE};
    use rand::prelude::*;
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Build one complete BGZF member holding `payload`.
    fn member(payload: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(payload).unwrap();
        let deflated = encoder.finish().unwrap();
        let mut crc = flate2::Crc::new();
        crc.update(payload);

        let header = MemberHeader::new(0, deflated.len() as u16);
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        out.extend_from_slice(&deflated);
        out.extend_from_slice(&crc.sum().to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out
    }

    /// Members for each payload, terminated by the empty end-of-file member.
    fn stream(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for payload in payloads {
            out.extend_from_slice(&member(payload));
        }
        out.extend_from_slice(&EOF_MARKER);
        out
    }

    #[derive(Default)]
    struct MapCache {
        blocks: HashMap<u64, Box<dyn Block>>,
    }

    impl Cache for MapCache {
        fn get(&mut self, base: u64) -> Option<Box<dyn Block>> {
            self.blocks.remove(&base)
        }

        fn put(&mut self, block: Box<dyn Block>) -> (Option<Box<dyn Block>>, bool) {
            let evicted = self.blocks.insert(block.base(), block);
            (evicted, true)
        }
    }

    /// Source that counts how often the underlying bytes are actually read.
    struct CountingSource {
        inner: Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl Read for CountingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.read(buf)
        }
    }

    impl Seek for CountingSource {
        fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    /// A source with no seek support at all.
    struct StreamOnly(Cursor<Vec<u8>>);

    impl Read for StreamOnly {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    #[test]
    fn read_two_members() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let mut reader = BGZFReader::new(Cursor::new(data))?;

        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf)?, 12);
        assert_eq!(&buf[..12], b"hello world\n");
        assert_eq!(reader.read(&mut buf)?, 0);
        assert_eq!(reader.read(&mut buf)?, 0);
        reader.close()?;
        Ok(())
    }

    #[test]
    fn exact_boundary_read_does_not_advance() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let m0_len = member(b"hello ").len() as u64;
        let mut reader = BGZFReader::new(Cursor::new(data))?;

        let mut buf = [0u8; 6];
        assert_eq!(reader.read(&mut buf)?, 6);
        assert_eq!(&buf, b"hello ");
        // the frontier stays inside the member that produced the bytes
        assert_eq!(reader.last_chunk().begin, Offset::new(0, 0));
        assert_eq!(reader.last_chunk().end, Offset::new(0, 6));
        assert_eq!(reader.virtual_offset(), Offset::new(0, 6));

        assert_eq!(reader.read(&mut buf)?, 6);
        assert_eq!(&buf, b"world\n");
        assert_eq!(reader.last_chunk().begin, Offset::new(m0_len, 0));
        assert_eq!(reader.last_chunk().end, Offset::new(m0_len, 6));
        Ok(())
    }

    #[test]
    fn seek_within_block() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let mut reader = BGZFReader::new(Cursor::new(data))?;

        reader.seek(Offset::new(0, 2))?;
        assert_eq!(
            reader.last_chunk(),
            Chunk::new(Offset::new(0, 2), Offset::new(0, 2))
        );

        let mut buf = [0u8; 10];
        assert_eq!(reader.read(&mut buf)?, 10);
        assert_eq!(&buf, b"llo world\n");
        assert_eq!(reader.last_chunk().begin, Offset::new(0, 2));
        Ok(())
    }

    #[test]
    fn seek_to_second_member() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let m0_len = member(b"hello ").len() as u64;
        let mut reader = BGZFReader::new(Cursor::new(data))?;

        reader.seek(Offset::new(m0_len, 0))?;
        let mut buf = [0u8; 5];
        assert_eq!(reader.read(&mut buf)?, 5);
        assert_eq!(&buf, b"world");
        assert_eq!(reader.last_chunk().begin, Offset::new(m0_len, 0));
        assert_eq!(reader.last_chunk().end, Offset::new(m0_len, 5));
        Ok(())
    }

    #[test]
    fn seek_with_packed_virtual_offset() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let m0_len = member(b"hello ").len() as u64;
        let mut reader = BGZFReader::new(Cursor::new(data))?;

        reader.seek(Offset::from_virtual(m0_len << 16 | 2))?;
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf)?, 4);
        assert_eq!(&buf, b"rld\n");
        Ok(())
    }

    #[test]
    fn empty_member_in_the_middle_is_skipped() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"", b"world\n"]);
        let mut reader = BGZFReader::new(Cursor::new(data))?;
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf)?, 12);
        assert_eq!(&buf[..12], b"hello world\n");
        Ok(())
    }

    #[test]
    fn missing_block_size_fails_at_open() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"hello world\n").unwrap();
        let data = encoder.finish().unwrap();

        let err = BGZFReader::new(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, BGZFError::NoBlockSize));
    }

    #[test]
    fn seek_requires_a_seekable_source() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let mut reader = BGZFReader::from_stream(StreamOnly(Cursor::new(data)))?;

        let err = reader.seek(Offset::new(0, 0)).unwrap_err();
        assert!(matches!(err, BGZFError::NotASeeker));

        // the error is sticky
        let mut buf = [0u8; 4];
        assert!(matches!(
            reader.read(&mut buf),
            Err(BGZFError::NotASeeker)
        ));
        assert!(matches!(reader.close(), Err(BGZFError::NotASeeker)));
        Ok(())
    }

    #[test]
    fn sequential_read_works_on_streams() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let mut reader = BGZFReader::from_stream(StreamOnly(Cursor::new(data)))?;
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf)?, 12);
        assert_eq!(&buf[..12], b"hello world\n");
        assert_eq!(reader.read(&mut buf)?, 0);
        reader.close()?;
        Ok(())
    }

    #[test]
    fn cache_hits_skip_the_source() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let m0_len = member(b"hello ").len() as u64;

        let reads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            inner: Cursor::new(data.clone()),
            reads: Arc::clone(&reads),
        };
        let mut reader = BGZFReader::new(source)?;
        reader.set_cache(MapCache::default());

        let mut buf = [0u8; 6];
        reader.read(&mut buf)?;
        reader.seek(Offset::new(m0_len, 0))?;

        let before = reads.load(Ordering::Relaxed);
        reader.seek(Offset::new(0, 0))?;
        assert_eq!(reads.load(Ordering::Relaxed), before);

        assert_eq!(reader.read(&mut buf)?, 6);
        assert_eq!(&buf, b"hello ");
        assert_eq!(reads.load(Ordering::Relaxed), before);

        // without a cache the same seek has to go back to the source
        let reads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            inner: Cursor::new(data),
            reads: Arc::clone(&reads),
        };
        let mut reader = BGZFReader::new(source)?;
        reader.read(&mut buf)?;
        reader.seek(Offset::new(m0_len, 0))?;
        let before = reads.load(Ordering::Relaxed);
        reader.seek(Offset::new(0, 0))?;
        assert!(reads.load(Ordering::Relaxed) > before);
        Ok(())
    }

    #[test]
    fn shared_cache_rejects_foreign_blocks() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let m0_len = member(b"hello ").len() as u64;
        let cache: SharedCache = Arc::new(Mutex::new(MapCache::default()));

        let mut first = BGZFReader::new(Cursor::new(data.clone()))?;
        first.set_shared_cache(Arc::clone(&cache));
        first.seek(Offset::new(m0_len, 0))?;
        // push the first member's block through the decompressor into the cache
        let mut buf = [0u8; 7];
        assert_eq!(first.read(&mut buf)?, 6);

        let mut second = BGZFReader::new(Cursor::new(data))?;
        second.set_shared_cache(Arc::clone(&cache));
        let mut buf = [0u8; 6];
        second.read(&mut buf)?;
        let err = second.seek(Offset::new(0, 0)).unwrap_err();
        assert!(matches!(err, BGZFError::ContaminatedCache));
        Ok(())
    }

    struct TagWrapper {
        wraps: Arc<AtomicUsize>,
    }

    impl Wrapper for TagWrapper {
        fn wrap(&self, block: Box<dyn Block>) -> Box<dyn Block> {
            self.wraps.fetch_add(1, Ordering::Relaxed);
            Box::new(Tagged { inner: block })
        }
    }

    struct Tagged {
        inner: Box<dyn Block>,
    }

    impl Block for Tagged {
        fn base(&self) -> u64 {
            self.inner.base()
        }
        fn set_base(&mut self, base: u64) {
            self.inner.set_base(base)
        }
        fn size(&self) -> u64 {
            self.inner.size()
        }
        fn set_size(&mut self, size: u64) {
            self.inner.set_size(size)
        }
        fn header(&self) -> Option<&MemberHeader> {
            self.inner.header()
        }
        fn set_header(&mut self, header: MemberHeader) {
            self.inner.set_header(header)
        }
        fn owner(&self) -> ReaderId {
            self.inner.owner()
        }
        fn set_owner(&mut self, owner: ReaderId) {
            self.inner.set_owner(owner)
        }
        fn len(&self) -> usize {
            self.inner.len()
        }
        fn virtual_offset(&self) -> Offset {
            self.inner.virtual_offset()
        }
        fn seek(&mut self, intra: u16) -> Result<(), BGZFError> {
            self.inner.seek(intra)
        }
        fn read(&mut self, buf: &mut [u8]) -> usize {
            self.inner.read(buf)
        }
        fn read_from(
            &mut self,
            compressed: &[u8],
            decompress: &mut Decompress,
        ) -> Result<(), BGZFError> {
            self.inner.read_from(compressed, decompress)
        }
        fn reset(&mut self) {
            self.inner.reset()
        }
    }

    struct WrapCache {
        map: MapCache,
        tag: TagWrapper,
    }

    impl Cache for WrapCache {
        fn get(&mut self, base: u64) -> Option<Box<dyn Block>> {
            self.map.get(base)
        }
        fn put(&mut self, block: Box<dyn Block>) -> (Option<Box<dyn Block>>, bool) {
            self.map.put(block)
        }
        fn wrapper(&self) -> Option<&dyn Wrapper> {
            Some(&self.tag)
        }
    }

    #[test]
    fn caches_can_decorate_blocks() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let wraps = Arc::new(AtomicUsize::new(0));
        let mut reader = BGZFReader::new(Cursor::new(data))?;
        reader.set_cache(WrapCache {
            map: MapCache::default(),
            tag: TagWrapper {
                wraps: Arc::clone(&wraps),
            },
        });

        let mut out = Vec::new();
        loop {
            let mut buf = [0u8; 5];
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"hello world\n");
        assert!(wraps.load(Ordering::Relaxed) > 0);
        Ok(())
    }

    #[test]
    fn random_corpus_round_trip() -> anyhow::Result<()> {
        let mut rand = rand_pcg::Pcg64Mcg::seed_from_u64(0x9387402456157523);
        let mut corpus = vec![0u8; 150_000];
        rand.fill_bytes(&mut corpus);
        let chunks: Vec<&[u8]> = corpus.chunks(60_000).collect();

        let mut data = Vec::new();
        let mut bases = Vec::new();
        for chunk in &chunks {
            bases.push(data.len() as u64);
            data.extend_from_slice(&member(chunk));
        }
        data.extend_from_slice(&EOF_MARKER);

        let mut reader = BGZFReader::new(Cursor::new(data))?;
        let mut out = Vec::new();
        let mut buf = [0u8; 1000];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, corpus);

        // every virtual offset reads the same bytes as a from-scratch decode
        for (i, base) in bases.iter().enumerate() {
            reader.seek(Offset::new(*base, 1234))?;
            let mut buf = [0u8; 500];
            assert_eq!(reader.read(&mut buf)?, 500);
            let start = i * 60_000 + 1234;
            assert_eq!(&buf[..], &corpus[start..start + 500]);
        }

        // and reads spanning a member boundary stay contiguous
        reader.seek(Offset::new(bases[0], 59_000))?;
        let mut buf = [0u8; 2000];
        assert_eq!(reader.read(&mut buf)?, 2000);
        assert_eq!(&buf[..], &corpus[59_000..61_000]);
        reader.close()?;
        Ok(())
    }

    #[test]
    fn empty_file_is_end_of_stream() -> anyhow::Result<()> {
        let mut reader = BGZFReader::new(Cursor::new(EOF_MARKER.to_vec()))?;
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf)?, 0);
        reader.close()?;

        let mut reader = BGZFReader::new(Cursor::new(Vec::new()))?;
        assert_eq!(reader.read(&mut buf)?, 0);
        reader.close()?;
        Ok(())
    }

    #[test]
    fn missing_eof_marker_still_reads() -> anyhow::Result<()> {
        let mut data = member(b"hello ");
        data.extend_from_slice(&member(b"world\n"));

        let mut reader = BGZFReader::new(Cursor::new(data))?;
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf)?, 12);
        assert_eq!(reader.read(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn truncated_member_fails_at_open() {
        let full = member(b"hello world\n");

        // cut inside the gzip header
        let err = BGZFReader::new(Cursor::new(full[..10].to_vec())).unwrap_err();
        assert!(matches!(
            err,
            BGZFError::HeaderParseError { position: 0 }
        ));

        // cut inside the deflate payload
        let err = BGZFReader::new(Cursor::new(full[..full.len() - 4].to_vec())).unwrap_err();
        assert!(matches!(err, BGZFError::IoError(_)));
    }

    #[test]
    fn intra_block_seek_out_of_range() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let mut reader = BGZFReader::new(Cursor::new(data))?;
        let err = reader.seek(Offset::new(0, 100)).unwrap_err();
        assert!(matches!(err, BGZFError::OffsetOutOfRange { .. }));
        Ok(())
    }

    #[test]
    fn seek_past_end_of_stream() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let past = data.len() as u64 + 50;
        let mut reader = BGZFReader::new(Cursor::new(data))?;
        let err = reader.seek(Offset::new(past, 0)).unwrap_err();
        assert!(matches!(err, BGZFError::IoError(_)));
        // sticky
        let mut buf = [0u8; 4];
        assert!(reader.read(&mut buf).is_err());
        Ok(())
    }

    #[test]
    fn seek_back_after_end_of_stream() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let mut reader = BGZFReader::new(Cursor::new(data))?;
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf)?, 12);
        assert_eq!(reader.read(&mut buf)?, 0);

        reader.seek(Offset::new(0, 0))?;
        assert_eq!(reader.read(&mut buf)?, 12);
        assert_eq!(&buf[..12], b"hello world\n");
        Ok(())
    }

    #[test]
    fn file_backed_reader() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let m0_len = member(b"hello ").len() as u64;

        let mut file = tempfile::tempfile()?;
        file.write_all(&data)?;
        file.seek(io::SeekFrom::Start(0))?;

        let mut reader = BGZFReader::new(file)?;
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf)?, 12);
        assert_eq!(&buf[..12], b"hello world\n");

        reader.seek(Offset::new(m0_len, 0))?;
        assert_eq!(reader.read(&mut buf[..5])?, 5);
        assert_eq!(&buf[..5], b"world");
        reader.close()?;
        Ok(())
    }

    #[test]
    fn surfaced_header_follows_the_current_member() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let m0_len = member(b"hello ").len() as u64;
        let m1_len = member(b"world\n").len() as u64;
        let mut reader = BGZFReader::new(Cursor::new(data))?;

        assert_eq!(
            reader.header().unwrap().block_size()? as u64,
            m0_len
        );
        reader.seek(Offset::new(m0_len, 0))?;
        assert_eq!(
            reader.header().unwrap().block_size()? as u64,
            m1_len
        );
        Ok(())
    }

    #[test]
    fn worker_hint_is_reported() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let reader = BGZFReader::with_workers(Cursor::new(data.clone()), 4)?;
        assert_eq!(reader.workers(), 4);
        let reader = BGZFReader::new(Cursor::new(data))?;
        assert_eq!(reader.workers(), 1);
        Ok(())
    }

    #[test]
    fn io_read_integration() -> anyhow::Result<()> {
        let data = stream(&[b"hello ", b"world\n"]);
        let mut reader = BGZFReader::new(Cursor::new(data))?;
        let mut out = Vec::new();
        Read::read_to_end(&mut reader, &mut out)?;
        assert_eq!(out, b"hello world\n");
        Ok(())
    }

    #[test]
    fn payload_too_large_for_one_member() {
        // a member claiming more decompressed bytes than the format allows
        let oversized = vec![0x55u8; MAX_BLOCK_SIZE + 1];
        let mut data = member(&oversized);
        data.extend_from_slice(&EOF_MARKER);
        let err = BGZFReader::new(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, BGZFError::Other { .. }));
    }
}
