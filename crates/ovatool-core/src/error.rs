//! Error types for the OVATool core library.
//!
//! Each variant's `Display` starts with the literal error-kind token the CLI
//! surfaces on stderr (`BadMagic`, `CorruptHeader`, ...), per the error kind
//! table the transcoder follows.

use std::path::PathBuf;

/// The main error type for OVATool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source VMDK magic number is not "KDMV".
    #[error("BadMagic: {0}")]
    BadMagic(String),

    /// Source sparse header is malformed: wrong EOL sentinels, grain
    /// directory/table offsets out of range, or similar structural defects.
    #[error("CorruptHeader: {0}")]
    CorruptHeader(String),

    /// Source VMDK is not monolithic-sparse (e.g. already compressed).
    #[error("UnsupportedInput: {0}")]
    UnsupportedInput(String),

    /// Requested target capacity is smaller than the source capacity.
    #[error("ResizeTooSmall: {0}")]
    ResizeTooSmall(String),

    /// A sector-alignment assertion failed while writing output; indicates
    /// a bug in the transcoder rather than bad input.
    #[error("InternalAlignment: {0}")]
    InternalAlignment(String),

    /// I/O error with optional path context.
    #[error("IoError{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// Error generating the OVF descriptor.
    #[error("Ovf error: {message}")]
    Ovf { message: String },

    /// Error creating the OVA archive.
    #[error("Ova error: {message}")]
    Ova { message: String },
}

/// A specialized Result type for OVATool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a `BadMagic` error.
    pub fn bad_magic(message: impl Into<String>) -> Self {
        Self::BadMagic(message.into())
    }

    /// Create a `CorruptHeader` error.
    pub fn corrupt_header(message: impl Into<String>) -> Self {
        Self::CorruptHeader(message.into())
    }

    /// Create an `UnsupportedInput` error.
    pub fn unsupported_input(message: impl Into<String>) -> Self {
        Self::UnsupportedInput(message.into())
    }

    /// Create a `ResizeTooSmall` error.
    pub fn resize_too_small(message: impl Into<String>) -> Self {
        Self::ResizeTooSmall(message.into())
    }

    /// Create an `InternalAlignment` error.
    pub fn internal_alignment(message: impl Into<String>) -> Self {
        Self::InternalAlignment(message.into())
    }

    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create an OVF error.
    pub fn ovf(message: impl Into<String>) -> Self {
        Self::Ovf {
            message: message.into(),
        }
    }

    /// Create an OVA error.
    pub fn ova(message: impl Into<String>) -> Self {
        Self::Ova {
            message: message.into(),
        }
    }

    /// The short kind token the CLI prints before `: <context>` (`BadMagic`,
    /// `IoError`, ...). Variants without a spec-defined kind fall back to
    /// their struct name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadMagic(_) => "BadMagic",
            Self::CorruptHeader(_) => "CorruptHeader",
            Self::UnsupportedInput(_) => "UnsupportedInput",
            Self::ResizeTooSmall(_) => "ResizeTooSmall",
            Self::InternalAlignment(_) => "InternalAlignment",
            Self::Io { .. } => "IoError",
            Self::Ovf { .. } => "Ovf",
            Self::Ova { .. } => "Ova",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(source: quick_xml::Error) -> Self {
        Self::ovf(source.to_string())
    }
}
