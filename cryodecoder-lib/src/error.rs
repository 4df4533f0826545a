use crate::schema::TypeTag;

/// Errors decoding a single field value from a byte span.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldDecodeError {
    /// The span does not have the width the encoding requires, or the segment ended
    /// before the span did.
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Number of bytes the field spec requires
        expected: usize,
        /// Number of bytes actually available
        actual: usize,
    },
    /// The encoding cannot be represented with this many bytes, e.g., a 9 byte integer.
    #[error("unsupported width {width} for {encoding} field")]
    UnsupportedWidth {
        width: usize,
        encoding: &'static str,
    },
}

/// Errors splitting a frame into its receiver and instrument segments.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SplitError {
    #[error("instrument segment {start}..{end} exceeds frame length {frame_len}")]
    LayoutOutOfBounds {
        start: usize,
        end: usize,
        frame_len: usize,
    },
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid schema document: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema is structurally valid json but self-inconsistent.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// Frame type tag does not appear in the schema.
    #[error("unknown type tag {0}")]
    UnknownTypeTag(TypeTag),
    /// Type tag has no instrument field table or decoder.
    #[error("unsupported instrument type {0}")]
    UnsupportedInstrumentType(TypeTag),

    /// A standalone frame is not the length the schema declares for its tag.
    #[error("frame length {actual} does not match expected {expected}")]
    FrameLength { expected: usize, actual: usize },
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error("field {name}: {source}")]
    FieldDecode {
        name: String,
        #[source]
        source: FieldDecodeError,
    },

    /// A record requires a field the field table does not declare.
    #[error("missing field {0}")]
    MissingField(String),
    /// A field decoded to a different kind of value than the record requires.
    #[error("field {name} is not {expected}")]
    FieldType { name: String, expected: &'static str },
    /// A field decoded to an integer outside the range of the record's value.
    #[error("field {name} value {value} out of range")]
    FieldRange { name: String, value: i128 },
    #[error("timestamp {0} out of range")]
    Timestamp(i64),

    /// The decode thread pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, Error>;
