// error.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
use std::fmt;
use std::io;
use std::num::TryFromIntError;
use std::path::PathBuf;

/// Errors encountered while decoding, caching or playing
#[derive(Debug)]
pub enum Error {
    /// A wrapped I/O error from the GIF input stream.
    Io(io::Error),
    /// Integer out of bounds.
    TryFromInt(TryFromIntError),
    /// Header signature malformed or missing.
    MalformedHeader,
    /// GIF version not supported (87a or 89a only).
    UnsupportedVersion([u8; 3]),
    /// Invalid block marker.
    InvalidBlockCode(u8),
    /// [GraphicControl](block/struct.GraphicControl.html) payload too short.
    MalformedGraphicControlExtension,
    /// File ends with incomplete block.
    UnexpectedEndOfFile,
    /// LZW code size out of range.
    InvalidCodeSize(u8),
    /// Compressed LZW data invalid or corrupt.
    InvalidLzwData,
    /// Image data ended before every pixel of the frame was decoded.
    IncompleteImageData,
    /// Image larger than specified by
    /// [max_image_sz](struct.Decoder.html#method.max_image_sz).
    TooLargeImage,
    /// Neither a global nor a local color table exists for a frame.
    MissingColorTable,
    /// Bit reader called again after every bit was consumed.
    ExhaustedStream,
    /// Cache artifact does not exist (yet).
    MissingCache(PathBuf),
    /// Cache artifact exists but cannot be parsed.
    MalformedCache,
    /// Reading or writing a cache artifact failed.
    StorageFailure(io::Error),
}

/// Monogif result type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check whether this error means the GIF (or cache) data is corrupt.
    ///
    /// Decoding is never retried after one of these; any partial cache
    /// state should be discarded.
    pub fn is_corrupt_stream(&self) -> bool {
        use Error::*;
        matches!(
            self,
            MalformedHeader
                | UnsupportedVersion(_)
                | InvalidBlockCode(_)
                | MalformedGraphicControlExtension
                | UnexpectedEndOfFile
                | InvalidCodeSize(_)
                | InvalidLzwData
                | IncompleteImageData
                | TooLargeImage
                | MissingColorTable
                | MalformedCache
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(fmt),
            Error::TryFromInt(err) => err.fmt(fmt),
            Error::MissingCache(path) => {
                write!(fmt, "MissingCache: {}", path.display())
            }
            Error::StorageFailure(err) => write!(fmt, "StorageFailure: {err}"),
            _ => fmt::Debug::fmt(self, fmt),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::TryFromInt(ref err) => Some(err),
            Error::StorageFailure(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Self {
        Error::TryFromInt(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn corrupt_stream() {
        assert!(Error::InvalidLzwData.is_corrupt_stream());
        assert!(Error::InvalidBlockCode(0x42).is_corrupt_stream());
        assert!(Error::MalformedCache.is_corrupt_stream());
        assert!(!Error::ExhaustedStream.is_corrupt_stream());
        let e = Error::MissingCache(PathBuf::from("x.map"));
        assert!(!e.is_corrupt_stream());
        let e = io::Error::new(io::ErrorKind::Other, "disk");
        assert!(!Error::StorageFailure(e).is_corrupt_stream());
    }

    #[test]
    fn display() {
        let e = Error::MissingCache(PathBuf::from("cache/a.map"));
        assert_eq!(e.to_string(), "MissingCache: cache/a.map");
        let e = Error::InvalidCodeSize(13);
        assert_eq!(e.to_string(), "InvalidCodeSize(13)");
    }
}
