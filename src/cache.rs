//! Block cache interface.
//!
//! A cache lets index-driven consumers revisit members without re-reading and
//! re-inflating them. The concrete policy (LRU, FIFO, ...) lives outside this
//! crate; the reader only needs the store-and-retrieve contract below.

use crate::block::Block;
use std::sync::{Arc, Mutex};

/// A block store keyed by the member's base file offset.
///
/// `get` hands ownership of the block to the caller; the reader deposits
/// blocks back through `put` when it moves on. All calls made by one reader
/// are serialized behind a mutex, so implementations may assume
/// single-threaded access per reader.
pub trait Cache {
    /// Remove and return the cached block whose base equals `base`.
    fn get(&mut self, base: u64) -> Option<Box<dyn Block>>;

    /// Offer `block` to the cache.
    ///
    /// Returns `(None, true)` when the block was stored, `(Some(evicted),
    /// true)` when storing it displaced another block, and `(Some(block),
    /// false)` when the cache declined and hands the offered block back.
    fn put(&mut self, block: Box<dyn Block>) -> (Option<Box<dyn Block>>, bool);

    /// Decoration hook. A cache that needs per-block bookkeeping returns a
    /// [`Wrapper`] here and every freshly allocated block is passed through
    /// it before use.
    fn wrapper(&self) -> Option<&dyn Wrapper> {
        None
    }
}

/// Decorates freshly allocated blocks with cache-specific bookkeeping.
pub trait Wrapper {
    fn wrap(&self, block: Box<dyn Block>) -> Box<dyn Block>;
}

/// A cache handle that can be shared between readers.
///
/// Blocks keep the identity of the reader that decoded them, so sharing is
/// safe: a reader that retrieves a foreign block rejects it with
/// [`crate::BGZFError::ContaminatedCache`].
pub type SharedCache = Arc<Mutex<dyn Cache + Send>>;
