use std::io;

use thiserror::Error;

use crate::chunk::ChunkError;
use crate::config::ConfigError;
use crate::fragment::FragmentError;
use crate::headers::HeaderError;
use crate::transport::TransportError;

/// Unified error covering every layer, so `?` works from the codecs up to the
/// server and client handles.
#[derive(Debug, Error)]
pub enum PsnError {
    #[error("header error: {0}")]
    Header(#[from] HeaderError),

    #[error("chunk error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("fragment error: {0}")]
    Fragment(#[from] FragmentError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A worker thread panicked; the name identifies which one.
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(&'static str),
}
