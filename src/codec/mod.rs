//! Project file codec.
//!
//! ```text
//! .tosc (zlib | plain XML) ──decode──► XML text ──parse──► Document
//! Document ──serialize──► XML text (no indentation, CDATA key/value)
//! ```
//!
//! The serializer writes string payloads verbatim inside CDATA sections,
//! which is what makes textual patching of a written artifact possible.

mod decode;
mod parse;
mod serialize;

use std::path::PathBuf;

use thiserror::Error;

pub use decode::decode;
pub use parse::parse;
pub use serialize::{cdata, embeds_verbatim, script_fragment, serialize};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to read `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to inflate `{0}`")]
    Inflate(PathBuf, #[source] std::io::Error),

    #[error("content of `{0}` is not valid UTF-8")]
    Utf8(PathBuf, #[source] std::string::FromUtf8Error),

    #[error("malformed XML near byte {position}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("unexpected document structure: {0}")]
    Structure(String),

    #[error("failed to write XML: {0}")]
    Write(String),
}

impl CodecError {
    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Self::Structure(message.into())
    }
}
