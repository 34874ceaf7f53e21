use crate::Compression;
use crate::error::{ErrorKind, Result};

const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Number of leading bytes needed to tell every supported format apart.
pub const SNIFF_LENGTH: usize = XZ_MAGIC.len();

impl Compression {
    /// Detect compression format from magic bytes.
    ///
    /// Returns `None` if no magic bytes match or if the input is too short
    /// to detect any format.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&XZ_MAGIC) {
            return Some(Compression::Xz);
        }
        if bytes.starts_with(&ZSTD_MAGIC) {
            return Some(Compression::Zstd);
        }
        None
    }

    /// Like [`from_magic_bytes`](Self::from_magic_bytes), but an unknown
    /// header is an [`UnsupportedFormat`](ErrorKind::UnsupportedFormat) error
    /// carrying the offending bytes in hex.
    pub fn sniff(bytes: &[u8]) -> Result<Self> {
        match Self::from_magic_bytes(bytes) {
            Some(format) => Ok(format),
            None => {
                let head = bytes.iter().take(SNIFF_LENGTH).map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ");
                exn::bail!(ErrorKind::UnsupportedFormat(head))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case(b"<!DOCTYPE html>", None)]
    #[case(b"", None)]
    #[case(&[0xFD, 0x37, 0x7A], None)]
    #[case(&[0x42, 0x5A, 0x68, 0x39], None)]
    #[case(&[0x1F, 0x8B, 0x08, 0x00], None)]
    #[case(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00], Some(Compression::Xz))]
    #[case(&[0x28, 0xB5, 0x2F, 0xFD], Some(Compression::Zstd))]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: Option<Compression>) {
        assert_eq!(Compression::from_magic_bytes(bytes), expected);
    }

    #[test]
    fn test_sniff_rejects_gzip() {
        let err = Compression::sniff(&[0x1F, 0x8B, 0x08, 0x00]).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat("1f 8b 08 00".to_string()));
    }

    #[test]
    fn test_sniff_accepts_zstd() {
        assert_eq!(Compression::sniff(&[0x28, 0xB5, 0x2F, 0xFD, 0x04]).unwrap(), Compression::Zstd);
    }
}
