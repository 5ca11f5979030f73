use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorReason {
    IllegalSequence,
    /// Input ended in the middle of a multibyte sequence.
    IncompleteSequence,
}

impl fmt::Display for DecodeErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalSequence => write!(f, "illegal multibyte sequence"),
            Self::IncompleteSequence => write!(f, "incomplete multibyte sequence"),
        }
    }
}

/// Bytes that are not valid under the source encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub encoding: &'static str,
    /// Position of the first offending byte in the input.
    pub offset: usize,
    pub bytes: Vec<u8>,
    pub reason: DecodeErrorReason,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = self.encoding.to_ascii_lowercase();
        match self.bytes.as_slice() {
            [byte] => write!(
                f,
                "'{encoding}' codec can't decode byte 0x{byte:02x} in position {}: {}",
                self.offset, self.reason
            ),
            bytes => write!(
                f,
                "'{encoding}' codec can't decode bytes in position {}-{}: {}",
                self.offset,
                self.offset + bytes.len().saturating_sub(1),
                self.reason
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug)]
pub enum ConvertError {
    /// The backup path is taken and overwriting it was not allowed.
    BackupExists(PathBuf),
    NotFound(io::Error),
    PermissionDenied(io::Error),
    IsADirectory(io::Error),
    Decode(DecodeError),
    Io(io::Error),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackupExists(p) => write!(f, "backup file already exists: {}", p.display()),
            Self::NotFound(e) => write!(f, "not found: {e}"),
            Self::PermissionDenied(e) => write!(f, "permission denied: {e}"),
            Self::IsADirectory(e) => write!(f, "input is a directory: {e}"),
            Self::Decode(e) => write!(f, "unable to decode: {e}"),
            Self::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BackupExists(_) => None,
            Self::Decode(e) => Some(e),
            Self::NotFound(e) | Self::PermissionDenied(e) | Self::IsADirectory(e) | Self::Io(e) => {
                Some(e)
            }
        }
    }
}

impl From<io::Error> for ConvertError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(e),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(e),
            io::ErrorKind::IsADirectory => Self::IsADirectory(e),
            _ => Self::Io(e),
        }
    }
}

impl From<DecodeError> for ConvertError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let err = ConvertError::from(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, ConvertError::NotFound(_)));

        let err = ConvertError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, ConvertError::PermissionDenied(_)));

        let err = ConvertError::from(io::Error::from(io::ErrorKind::IsADirectory));
        assert!(matches!(err, ConvertError::IsADirectory(_)));

        let err = ConvertError::from(io::Error::from(io::ErrorKind::WriteZero));
        assert!(matches!(err, ConvertError::Io(_)));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError {
            encoding: "GBK",
            offset: 3,
            bytes: vec![0x80],
            reason: DecodeErrorReason::IllegalSequence,
        };
        assert_eq!(
            err.to_string(),
            "'gbk' codec can't decode byte 0x80 in position 3: illegal multibyte sequence"
        );

        let err = DecodeError {
            encoding: "GBK",
            offset: 10,
            bytes: vec![0x81, 0x30],
            reason: DecodeErrorReason::IncompleteSequence,
        };
        assert_eq!(
            err.to_string(),
            "'gbk' codec can't decode bytes in position 10-11: incomplete multibyte sequence"
        );
    }
}
