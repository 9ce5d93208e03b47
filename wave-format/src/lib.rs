pub mod descriptor;
#[cfg(windows)]
pub mod endpoint;
#[cfg(windows)]
pub mod mem;

pub use descriptor::{AudioFormatDescriptor, FormatExtension, FormatTag};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Format buffer pointer is null")]
    NullBuffer,
    #[error("Format buffer too short: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },
    #[cfg(windows)]
    #[error("Windows error: {0}")]
    Windows(#[from] windows::core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
