//! The single-member decode worker.
//!
//! Exactly one gzip member is in flight per reader. The worker takes the read
//! head, parses the member header, stages the rest of the member into a fixed
//! buffer, releases the head, and only then inflates. Staging first keeps the
//! compressed stream available while inflation runs.

use crate::block::{BasicBlock, Block, ReaderId};
use crate::cache::SharedCache;
use crate::deflate::Decompress;
use crate::header::MemberHeader;
use crate::{BGZFError, MAX_BLOCK_SIZE};
use std::io::Read;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};

use super::CountReader;

/// Single-slot rendezvous carrying the count reader.
///
/// Whoever holds the reader holds the exclusive right to advance the
/// compressed stream. `take` blocks until the previous holder puts it back.
pub(crate) struct Head<R: Read>(Arc<(Mutex<Option<CountReader<R>>>, Condvar)>);

impl<R: Read> Clone for Head<R> {
    fn clone(&self) -> Self {
        Head(Arc::clone(&self.0))
    }
}

impl<R: Read> Head<R> {
    pub(crate) fn new(reader: CountReader<R>) -> Self {
        Head(Arc::new((Mutex::new(Some(reader)), Condvar::new())))
    }

    fn take(&self) -> CountReader<R> {
        let (slot, available) = &*self.0;
        let mut guard = slot.lock().expect("head slot poisoned");
        loop {
            if let Some(reader) = guard.take() {
                return reader;
            }
            guard = available.wait(guard).expect("head slot poisoned");
        }
    }

    fn put(&self, reader: CountReader<R>) {
        let (slot, available) = &*self.0;
        *slot.lock().expect("head slot poisoned") = Some(reader);
        available.notify_one();
    }
}

/// Fixed-capacity staging area for one compressed member.
pub(crate) struct Stage {
    data: Box<[u8]>,
    len: usize,
}

impl Stage {
    fn new() -> Self {
        Stage {
            data: vec![0; MAX_BLOCK_SIZE].into_boxed_slice(),
            len: 0,
        }
    }

    pub(crate) fn has_data(&self) -> bool {
        self.len > 0
    }

    /// Read exactly `n` bytes from `src`. Fails if the source ends early.
    pub(crate) fn fill_from<R: Read>(&mut self, n: usize, src: &mut R) -> Result<(), BGZFError> {
        debug_assert!(!self.has_data());
        if n > self.data.len() {
            return Err(BGZFError::Other {
                message: "compressed member exceeds BGZF block limit",
            });
        }
        src.read_exact(&mut self.data[..n])?;
        self.len = n;
        Ok(())
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub(crate) fn reset(&mut self) {
        self.len = 0;
    }
}

/// Per-worker reusable state: the staging buffer and the inflater.
struct Scratch {
    stage: Stage,
    decompress: Decompress,
}

impl Scratch {
    fn new() -> Self {
        Scratch {
            stage: Stage::new(),
            decompress: Decompress::new(),
        }
    }
}

enum Status {
    Decoded,
    End,
}

struct Fill {
    block: Box<dyn Block>,
    scratch: Scratch,
    status: Result<Status, BGZFError>,
}

/// Outcome of waiting on the worker.
pub(crate) enum Next {
    Block(Box<dyn Block>),
    End,
}

fn spawn_decode<F: FnOnce() + Send + 'static>(job: F) {
    #[cfg(feature = "rayon")]
    rayon::spawn(job);
    #[cfg(not(feature = "rayon"))]
    let _ = std::thread::spawn(job);
}

/// Decodes one gzip member per invocation.
///
/// `next_block_at` starts a decode (or answers it from the cache) and
/// `wait` joins it. The worker holds at most one spare block, rotated in
/// through [`Decompressor::using`], which it reuses as the decode target or
/// deposits into the cache.
pub(crate) struct Decompressor<R: Read> {
    head: Head<R>,
    owner: ReaderId,
    workers: usize,
    cache: Option<SharedCache>,
    blk: Option<Box<dyn Block>>,
    ready: Option<Box<dyn Block>>,
    in_flight: bool,
    scratch: Option<Scratch>,
    done_tx: Sender<Fill>,
    done_rx: Receiver<Fill>,
}

impl<R: Read + Send + 'static> Decompressor<R> {
    pub(crate) fn new(head: Head<R>, owner: ReaderId, workers: usize) -> Self {
        let (done_tx, done_rx) = channel();
        Decompressor {
            head,
            owner,
            workers: workers.max(1),
            cache: None,
            blk: None,
            ready: None,
            in_flight: false,
            scratch: Some(Scratch::new()),
            done_tx,
            done_rx,
        }
    }

    pub(crate) fn workers(&self) -> usize {
        self.workers
    }

    pub(crate) fn set_cache(&mut self, cache: Option<SharedCache>) {
        self.cache = cache;
    }

    /// Hand a finished block back for reuse or cache deposit.
    pub(crate) fn using(&mut self, block: Box<dyn Block>) {
        self.blk = Some(block);
    }

    /// Obtain the member starting at file offset `off`: from the cache when
    /// possible, otherwise by decoding it from the compressed stream in the
    /// background. The result is collected with [`Decompressor::wait`].
    pub(crate) fn next_block_at(&mut self, off: u64) -> Result<(), BGZFError> {
        self.deposit();
        if let Some(cache) = &self.cache {
            let cached = cache.lock().expect("cache lock poisoned").get(off);
            if let Some(mut block) = cached {
                if !block.owned_by(self.owner) {
                    return Err(BGZFError::ContaminatedCache);
                }
                block.seek(0)?;
                self.ready = Some(block);
                return Ok(());
            }
        }

        let mut block = match self.blk.take() {
            Some(block) => block,
            None => self.new_block(),
        };
        if !block.owned_by(self.owner) {
            block.set_owner(self.owner);
        }

        let mut reader = self.head.take();
        if reader.offset() != off {
            // only an explicit seek can leave the head elsewhere
            if let Err(e) = reader.seek_to(off) {
                self.head.put(reader);
                return Err(e);
            }
        }

        let head = self.head.clone();
        let scratch = self.scratch.take().unwrap_or_else(Scratch::new);
        let done = self.done_tx.clone();
        self.in_flight = true;
        spawn_decode(move || {
            let fill = fill(block, reader, head, scratch, off);
            let _ = done.send(fill);
        });
        Ok(())
    }

    /// Join the in-flight decode and yield its block, or report that the
    /// stream ended before `off`.
    pub(crate) fn wait(&mut self) -> Result<Next, BGZFError> {
        if let Some(block) = self.ready.take() {
            return Ok(Next::Block(block));
        }
        if !self.in_flight {
            return Err(BGZFError::Other {
                message: "no block decode in flight",
            });
        }
        self.in_flight = false;
        let fill = self.done_rx.recv().map_err(|_| BGZFError::Other {
            message: "decode worker disconnected",
        })?;
        let Fill {
            block,
            scratch,
            status,
        } = fill;
        self.scratch = Some(scratch);
        match status {
            Ok(Status::Decoded) => Ok(Next::Block(block)),
            Ok(Status::End) => {
                self.blk = Some(block);
                Ok(Next::End)
            }
            Err(e) => Err(e),
        }
    }

    /// Offer the held block to the cache. Blocks that were never decoded stay
    /// behind as the reusable vessel.
    fn deposit(&mut self) {
        if self.cache.is_none() {
            return;
        }
        let block = match self.blk.take() {
            Some(block) => block,
            None => return,
        };
        if block.header().is_none() {
            self.blk = Some(block);
            return;
        }
        if let Some(cache) = &self.cache {
            let (evicted, retained) = cache.lock().expect("cache lock poisoned").put(block);
            if !retained {
                self.blk = evicted;
            }
        }
    }

    fn new_block(&self) -> Box<dyn Block> {
        let raw: Box<dyn Block> = Box::new(BasicBlock::new(self.owner));
        if let Some(cache) = &self.cache {
            let guard = cache.lock().expect("cache lock poisoned");
            if let Some(wrapper) = guard.wrapper() {
                return wrapper.wrap(raw);
            }
        }
        raw
    }
}

/// Decode one member: parse its header, stage its remaining bytes, release
/// the head, inflate. Runs off-thread.
fn fill<R: Read>(
    mut block: Box<dyn Block>,
    mut reader: CountReader<R>,
    head: Head<R>,
    mut scratch: Scratch,
    off: u64,
) -> Fill {
    let start = reader.offset();
    let header = match MemberHeader::from_reader(&mut reader) {
        Ok(header) => header,
        Err(e) => {
            let consumed = reader.offset() - start;
            head.put(reader);
            let eof = matches!(&e, BGZFError::IoError(io) if io.kind() == std::io::ErrorKind::UnexpectedEof);
            let status = if eof && consumed == 0 {
                // the stream ended exactly at a member boundary
                Ok(Status::End)
            } else if eof {
                Err(BGZFError::HeaderParseError { position: start })
            } else {
                Err(e)
            };
            return Fill {
                block,
                scratch,
                status,
            };
        }
    };

    let size = match header.block_size() {
        Ok(size) => u64::from(size),
        Err(e) => {
            head.put(reader);
            return Fill {
                block,
                scratch,
                status: Err(e),
            };
        }
    };

    let consumed = reader.offset() - start;
    if size <= consumed {
        head.put(reader);
        return Fill {
            block,
            scratch,
            status: Err(BGZFError::Other {
                message: "block size is smaller than its own header",
            }),
        };
    }
    let remaining = (size - consumed) as usize;
    if let Err(e) = scratch.stage.fill_from(remaining, &mut reader) {
        head.put(reader);
        return Fill {
            block,
            scratch,
            status: Err(e),
        };
    }
    // the whole member is staged; the compressed stream can move on
    head.put(reader);

    block.reset();
    block.set_base(off);
    let status = block.read_from(scratch.stage.bytes(), &mut scratch.decompress);
    scratch.stage.reset();
    match status {
        Ok(()) => {
            block.set_size(size);
            block.set_header(header);
            Fill {
                block,
                scratch,
                status: Ok(Status::Decoded),
            }
        }
        Err(e) => Fill {
            block,
            scratch,
            status: Err(e),
        },
    }
}
