//! Session error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("`{0}` has no file stem")]
    MissingStem(PathBuf),

    #[error("failed to write `{0}`")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("failed to read script `{0}`")]
    ReadScript(PathBuf, #[source] std::io::Error),

    #[error("failed to scan scripts directory `{0}`")]
    ScanScripts(PathBuf, #[source] std::io::Error),

    #[error("failed to dump document as JSON")]
    Dump(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_path() {
        let err = InjectError::MissingStem(PathBuf::from("/"));
        assert_eq!(err.to_string(), "`/` has no file stem");

        let err = InjectError::ScanScripts(
            PathBuf::from("/music/scripts"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/music/scripts"));
    }

    #[test]
    fn test_codec_is_transparent() {
        let err = InjectError::from(CodecError::Structure("no root node".into()));
        assert_eq!(err.to_string(), "unexpected document structure: no root node");
    }
}
