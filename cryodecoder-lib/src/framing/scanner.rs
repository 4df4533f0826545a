use std::iter::FusedIterator;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{payload, split, Segments};
use crate::error::SplitError;
use crate::schema::{FrameLayout, Schema, TypeTag};

/// A complete frame located in a buffer.
///
/// The frame data always has exactly the length the schema declares for its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    tag: TypeTag,
    offset: usize,
    data: &'a [u8],
}

impl<'a> RawFrame<'a> {
    /// Frame of type `tag` found at `offset` in its source buffer.
    #[must_use]
    pub fn new(tag: TypeTag, offset: usize, data: &'a [u8]) -> Self {
        Self { tag, offset, data }
    }

    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Offset of the first byte of the frame in the source buffer.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// All frame bytes, including the type tag.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte range of this frame in the source buffer.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.data.len()
    }

    /// Split into receiver envelope and instrument payload.
    ///
    /// # Errors
    /// See [split].
    pub fn split(&self, layout: &FrameLayout) -> Result<Segments<'a>, SplitError> {
        split(self.data, layout)
    }

    /// Instrument segment only.
    ///
    /// # Errors
    /// See [payload].
    pub fn payload(&self, layout: &FrameLayout) -> Result<&'a [u8], SplitError> {
        payload(self.data, layout)
    }
}

/// A frame whose tag was found but whose declared length runs past the end of the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    /// Offset of the type tag in the buffer
    pub offset: usize,
    pub tag: TypeTag,
    /// Declared frame length
    pub needed: usize,
    /// Bytes remaining in the buffer from `offset`
    pub available: usize,
}

/// Scans a buffer for frames of the types known to a [Schema].
///
/// Scanning checks every offset for a known type tag. On a match the whole frame is
/// consumed, so frame contents are never checked for tags. A matched tag without enough
/// bytes left for its frame ends the scan, see [Scanner::truncated].
///
/// # Example
/// ```
/// use cryodecoder::{framing::scan, schema::Schema};
///
/// let schema = Schema::default();
/// let mut buf = vec![0xaa, 0xbb, b'C', b'1'];
/// buf.resize(4 + 30, 0);
///
/// let frames: Vec<_> = scan(&buf, &schema).collect();
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].offset(), 2);
/// assert_eq!(frames[0].len(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct Scanner<'a, 's> {
    buf: &'a [u8],
    schema: &'s Schema,
    offset: usize,
    done: bool,
    truncated: Option<Truncation>,
}

impl<'a, 's> Scanner<'a, 's> {
    #[must_use]
    pub fn new(buf: &'a [u8], schema: &'s Schema) -> Self {
        Self {
            buf,
            schema,
            offset: 0,
            done: false,
            truncated: None,
        }
    }

    /// The truncated trailing frame that ended the scan, if any.
    #[must_use]
    pub fn truncated(&self) -> Option<&Truncation> {
        self.truncated.as_ref()
    }

    /// Current scan offset in the buffer.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a, 's> Iterator for Scanner<'a, 's> {
    type Item = RawFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let buf = self.buf;
        while let Some(tag) = TypeTag::from_slice(&buf[self.offset..]) {
            let Some(layout) = self.schema.layout(&tag) else {
                self.offset += 1;
                continue;
            };

            let start = self.offset;
            let available = buf.len() - start;
            if available < layout.len() {
                debug!(
                    offset = start,
                    tag = %tag,
                    needed = layout.len(),
                    available,
                    "truncated frame; ending scan"
                );
                self.truncated = Some(Truncation {
                    offset: start,
                    tag,
                    needed: layout.len(),
                    available,
                });
                break;
            }

            self.offset += layout.len();
            trace!(offset = start, tag = %tag, "frame");
            return Some(RawFrame::new(tag, start, &buf[start..self.offset]));
        }

        self.done = true;
        None
    }
}

impl FusedIterator for Scanner<'_, '_> {}

/// Create a [Scanner] over `buf` for the frame types in `schema`.
#[must_use]
pub fn scan<'a, 's>(buf: &'a [u8], schema: &'s Schema) -> Scanner<'a, 's> {
    Scanner::new(buf, schema)
}
