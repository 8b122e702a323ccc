use std::sync::Arc;
use thiserror::Error;

/// A BGZF error.
///
/// The reader keeps the first error it observes and returns it again from
/// every later call, so the I/O variant is reference counted to keep the
/// whole enum cheap to clone.
#[derive(Debug, Clone, Error)]
pub enum BGZFError {
    #[error("Failed to parse header at position: {position}")]
    HeaderParseError { position: u64 },
    #[error("not gzip format")]
    NotGzip,
    #[error("no block size in gzip extra field")]
    NoBlockSize,
    #[error("underlying reader does not support seek")]
    NotASeeker,
    #[error("cached block is owned by another reader")]
    ContaminatedCache,
    #[error("offset {offset} is out of range for a block of {len} bytes")]
    OffsetOutOfRange { offset: u16, len: usize },
    #[error("I/O Error: {0}")]
    IoError(#[source] Arc<std::io::Error>),
    #[error("Decompression Error: {0}")]
    DecompressionError(#[from] crate::deflate::DecompressError),
    #[error("Error: {message:}")]
    Other { message: &'static str },
}

impl From<std::io::Error> for BGZFError {
    fn from(e: std::io::Error) -> Self {
        BGZFError::IoError(Arc::new(e))
    }
}

impl From<BGZFError> for std::io::Error {
    fn from(e: BGZFError) -> std::io::Error {
        match e {
            BGZFError::IoError(e) => {
                let kind = e.kind();
                std::io::Error::new(kind, e)
            }
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}

impl BGZFError {
    pub fn into_io_error(self) -> std::io::Error {
        self.into()
    }
}
