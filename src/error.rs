use std::path::PathBuf;

use thiserror::Error;

/// Why a single frame could not be decoded. Logged by the loader and turned
/// into an errored frame; never fatal.
#[derive(Debug, Error)]
pub enum FrameLoadError {
    #[error("failed to read frame {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode frame {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The blocking decode task panicked or was cancelled.
    #[error("decode task for frame {index} did not complete")]
    Join {
        index: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}
