use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;

use super::CodecError;

const XML_MAGIC: &[u8] = b"<?xml";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read a project file into XML text.
///
/// Plain XML is returned as-is; anything else is treated as a zlib stream.
pub fn decode(path: &Path) -> Result<String, CodecError> {
    let bytes = std::fs::read(path).map_err(|e| CodecError::Read(path.to_path_buf(), e))?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    if body.starts_with(XML_MAGIC) {
        crate::debug!("codec"; "{} is plain XML", path.display());
        return String::from_utf8(body.to_vec()).map_err(|e| CodecError::Utf8(path.to_path_buf(), e));
    }

    crate::debug!("codec"; "inflating {} ({} bytes)", path.display(), bytes.len());
    let mut inflated = Vec::with_capacity(bytes.len().saturating_mul(8));
    ZlibDecoder::new(bytes.as_slice())
        .read_to_end(&mut inflated)
        .map_err(|e| CodecError::Inflate(path.to_path_buf(), e))?;

    String::from_utf8(inflated).map_err(|e| CodecError::Utf8(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::ZlibEncoder};
    use std::io::Write;
    use tempfile::TempDir;

    const XML: &str = "<?xml version='1.0' encoding='UTF-8'?><lexml version='3'/>";

    #[test]
    fn test_plain_xml_passthrough() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.tosc");
        std::fs::write(&path, XML).unwrap();

        assert_eq!(decode(&path).unwrap(), XML);
    }

    #[test]
    fn test_zlib_inflated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packed.tosc");
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(XML.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        assert_eq!(decode(&path).unwrap(), XML);
    }

    #[test]
    fn test_garbage_fails_inflate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.tosc");
        std::fs::write(&path, b"definitely not zlib").unwrap();

        assert!(matches!(decode(&path), Err(CodecError::Inflate(..))));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            decode(&dir.path().join("nope.tosc")),
            Err(CodecError::Read(..))
        ));
    }
}
