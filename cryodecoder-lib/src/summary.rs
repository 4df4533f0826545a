use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decoder::FrameResult;
use crate::framing::Truncation;
use crate::schema::TypeTag;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub count: usize,
    pub bytes: usize,
    /// Frames that failed to decode
    pub errors: usize,
}

/// Tracks stats on decoded frames.
///
/// # Example
/// ```
/// use cryodecoder::{Decoder, Summary, schema::Schema};
///
/// let schema = Schema::default();
/// let mut buf = b"C1".to_vec();
/// buf.resize(32, 0);
///
/// let mut summary = Summary::default();
/// for zult in Decoder::new(&schema).decode_iter(&buf) {
///     summary.add(&zult);
/// }
/// assert_eq!(summary.count, 1);
/// assert_eq!(summary.bytes, 32);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub bytes: usize,
    pub errors: usize,
    pub tags: BTreeMap<TypeTag, TagSummary>,
    pub truncated: Option<Truncation>,
}

impl Summary {
    pub fn add(&mut self, zult: &FrameResult) {
        let failed = usize::from(zult.result.is_err());
        self.count += 1;
        self.bytes += zult.len;
        self.errors += failed;

        let tag = self.tags.entry(zult.tag).or_default();
        tag.count += 1;
        tag.bytes += zult.len;
        tag.errors += failed;
    }
}
