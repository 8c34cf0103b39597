//! The error taxonomy shared by every layer of this crate.
use thiserror::Error;

/// Everything that can go wrong while parsing a gzip member or inflating its body.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte source ran out before a field or code finished decoding.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The underlying byte source or sink reported an I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The bitstream is structurally invalid DEFLATE or gzip, independent of I/O.
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    /// The envelope asked for something this parser does not implement.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedStream(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
