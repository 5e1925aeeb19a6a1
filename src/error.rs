use std::error::Error as StdError;

/// Custom Result type for refseq operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the refseq library, encompassing all possible error cases
/// that can occur while indexing, encoding, or reading reference artifacts.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors raised while building or parsing a contig index
    #[error("Error processing contig index: {0}")]
    IndexError(#[from] IndexError),

    /// Errors that occur during read operations
    #[error("Error reading artifact: {0}")]
    ReadError(#[from] ReadError),

    /// Errors that occur during write operations
    #[error("Error writing artifact: {0}")]
    WriteError(#[from] WriteError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error indicates a damaged or mismatched artifact
    ///
    /// Such artifacts should be regenerated rather than retried.
    ///
    /// # Returns
    ///
    /// * `true` for `CorruptStream`, `RangeExceedsStream` and `TruncatedStream`
    /// * `false` for all other error types
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::ReadError(err) => err.is_corruption(),
            _ => false,
        }
    }
}

/// Errors raised while building a sidecar index or parsing one from disk
///
/// All of these are fatal: no partial index is ever published.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// A sidecar row could not be parsed
    #[error("Malformed index row at line {line}: {reason}")]
    MalformedIndexFormat { line: usize, reason: String },

    /// The same contig name appeared twice
    #[error("Contig {0} appears more than once")]
    DuplicateContig(String),

    /// A contig has more than one line deviating from its first line's width,
    /// or sequence data continues after a blank line
    #[error("Contig {contig} has an inconsistent line width at line {line}")]
    InconsistentLineWidth { contig: String, line: usize },

    /// A header line without a contig name, or sequence data before any header
    #[error("Malformed header line at line {line}")]
    MalformedHeaderLine { line: usize },
}

/// Errors that can occur while reading FASTA, Nib or GC artifacts
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The requested coordinates are invalid (1-based, inclusive end)
    #[error("Invalid range specified: start ({start}), end ({end})")]
    InvalidRange { start: u64, end: u64 },

    /// The stream signature or content does not match the expected format
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),

    /// The stream declares fewer bases than the request requires
    #[error("Requested range ends at {requested} but the stream holds {available} bases")]
    RangeExceedsStream { requested: u64, available: u64 },

    /// Fewer bytes were delivered than the header promised
    #[error("Stream truncated: expected {expected} bytes, found {found}")]
    TruncatedStream { expected: usize, found: usize },

    /// A required artifact is not registered for a chromosome
    #[error("Missing artifact: {0}")]
    MissingArtifact(String),
}
impl ReadError {
    /// Checks if this error indicates a damaged or mismatched artifact
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::CorruptStream(_) | Self::RangeExceedsStream { .. } | Self::TruncatedStream { .. }
        )
    }
}

/// Errors that can occur while encoding artifacts
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// A symbol outside the supported nucleotide alphabet was encountered
    ///
    /// `position` is the 0-based offset of the first symbol of the packed pair.
    #[error("Unknown nucleotide symbol at position {position}: {first:?} {second:?}")]
    UnknownSymbol {
        position: usize,
        first: char,
        second: Option<char>,
    },

    /// The sequence does not fit the 32-bit length field of the stream header
    #[error("Sequence of {0} bases exceeds the maximum encodable length")]
    SequenceTooLong(usize),

    /// A builder received a different number of bases than it was declared with
    #[error("Expected {expected} bases but received {found}")]
    BaseCountMismatch { expected: u64, found: u64 },
}

/// Trait for converting arbitrary errors into `Error`
pub trait IntoRefseqError {
    fn into_refseq_error(self) -> Error;
}

impl<E> IntoRefseqError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_refseq_error(self) -> Error {
        Error::GenericError(Box::new(self))
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum MyError {
        #[error("Custom error: {0}")]
        CustomError(String),
    }

    #[test]
    fn test_into_refseq_error() {
        let my_error = MyError::CustomError(String::from("some error"));
        let refseq_error = my_error.into_refseq_error();
        assert!(matches!(refseq_error, Error::GenericError(_)));
    }

    // ==================== Error::is_corruption Tests ====================

    #[test]
    fn test_is_corruption_with_corrupt_stream() {
        let error = Error::ReadError(ReadError::CorruptStream("bad magic".to_string()));
        assert!(error.is_corruption());
    }

    #[test]
    fn test_is_corruption_with_truncation() {
        let error = Error::ReadError(ReadError::TruncatedStream {
            expected: 10,
            found: 4,
        });
        assert!(error.is_corruption());
    }

    #[test]
    fn test_is_corruption_with_invalid_range() {
        let error = Error::ReadError(ReadError::InvalidRange { start: 0, end: 10 });
        assert!(!error.is_corruption());
    }

    #[test]
    fn test_is_corruption_with_non_read_error() {
        let error = Error::IndexError(IndexError::DuplicateContig("chr1".to_string()));
        assert!(!error.is_corruption());
    }

    // ==================== Display Tests ====================

    #[test]
    fn test_index_error_duplicate_contig() {
        let error = IndexError::DuplicateContig("chrX".to_string());
        assert!(format!("{error}").contains("chrX"));
    }

    #[test]
    fn test_index_error_inconsistent_line_width() {
        let error = IndexError::InconsistentLineWidth {
            contig: "chr2".to_string(),
            line: 17,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("chr2"));
        assert!(error_str.contains("17"));
    }

    #[test]
    fn test_read_error_range_exceeds_stream() {
        let error = ReadError::RangeExceedsStream {
            requested: 150,
            available: 100,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("150"));
        assert!(error_str.contains("100"));
    }

    #[test]
    fn test_write_error_unknown_symbol() {
        let error = WriteError::UnknownSymbol {
            position: 42,
            first: 'A',
            second: Some('X'),
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("42"));
        assert!(error_str.contains('X'));
    }

    // ==================== Error Conversion Tests ====================

    #[test]
    fn test_error_from_index_error() {
        let error: Error = IndexError::MalformedHeaderLine { line: 3 }.into();
        assert!(matches!(error, Error::IndexError(_)));
    }

    #[test]
    fn test_error_from_write_error() {
        let error: Error = WriteError::SequenceTooLong(1 << 40).into();
        assert!(matches!(error, Error::WriteError(_)));
    }

    #[test]
    fn test_error_from_io_error() {
        let error: Error = std::io::Error::other("boom").into();
        assert!(matches!(error, Error::IoError(_)));
    }
}
