//! Frame layouts and field tables.
//!
//! A [Schema] is loaded once, validated, and then only ever read. The built-in schema
//! covers the Cryoegg (`C1`) and Cryowurst (`W2`) storage card frames. Use
//! [Schema::with_file] for custom deployments.
use std::{
    collections::HashMap,
    fmt::{self, Display},
    fs::File,
    io::BufReader,
    ops::Range,
    path::Path,
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

const DEFAULT_SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/packets.json"));

/// Two byte marker at the start of every frame selecting its layout, e.g., `C1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag([u8; 2]);

impl TypeTag {
    /// Tag length in bytes
    pub const LEN: usize = 2;

    #[must_use]
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self(bytes)
    }

    /// Tag made from the first two bytes of `dat`, or `None` if there are not enough bytes.
    #[must_use]
    pub fn from_slice(dat: &[u8]) -> Option<Self> {
        match dat {
            [a, b, ..] => Some(Self([*a, *b])),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.as_bytes() {
            [a, b] => Ok(Self([*a, *b])),
            _ => Err(Error::Schema(format!("type tag must be 2 bytes, got {s:?}"))),
        }
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Numeric encoding of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Two's-complement when `signed`, 1 to 8 bytes.
    Integer { signed: bool, byte_order: ByteOrder },
    /// IEEE-754 single precision, exactly 4 bytes.
    Float32 { byte_order: ByteOrder },
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::Integer { signed: false, .. } => "uint",
            FieldKind::Integer { signed: true, .. } => "int",
            FieldKind::Float32 { .. } => "float",
        }
    }
}

/// Location and encoding of a single named value within a segment.
///
/// `end_index` is inclusive, as in the schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FieldEntry")]
pub struct FieldSpec {
    start_index: u32,
    end_index: u32,
    kind: FieldKind,
}

impl FieldSpec {
    /// Create a validated spec.
    ///
    /// # Errors
    /// [Error::Schema] if `end_index < start_index` or the width is not valid for `kind`.
    pub fn new(start_index: u32, end_index: u32, kind: FieldKind) -> Result<Self> {
        if end_index < start_index {
            return Err(Error::Schema(format!(
                "field end index {end_index} is before start index {start_index}"
            )));
        }
        let spec = Self {
            start_index,
            end_index,
            kind,
        };
        let width = spec.width();
        let valid = match kind {
            FieldKind::Integer { .. } => (1..=8).contains(&width),
            FieldKind::Float32 { .. } => width == 4,
        };
        if !valid {
            return Err(Error::Schema(format!(
                "{} field cannot be {width} bytes",
                kind.name()
            )));
        }
        Ok(spec)
    }

    /// Unsigned integer spanning `start..=end`.
    ///
    /// # Errors
    /// See [FieldSpec::new].
    pub fn uint(start: u32, end: u32, byte_order: ByteOrder) -> Result<Self> {
        Self::new(
            start,
            end,
            FieldKind::Integer {
                signed: false,
                byte_order,
            },
        )
    }

    /// Signed integer spanning `start..=end`.
    ///
    /// # Errors
    /// See [FieldSpec::new].
    pub fn int(start: u32, end: u32, byte_order: ByteOrder) -> Result<Self> {
        Self::new(
            start,
            end,
            FieldKind::Integer {
                signed: true,
                byte_order,
            },
        )
    }

    /// 4-byte float starting at `start`.
    ///
    /// # Errors
    /// See [FieldSpec::new].
    pub fn float32(start: u32, byte_order: ByteOrder) -> Result<Self> {
        let end = start
            .checked_add(3)
            .ok_or_else(|| Error::Schema(format!("float field at {start} overflows")))?;
        Self::new(start, end, FieldKind::Float32 { byte_order })
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    #[must_use]
    pub fn end_index(&self) -> u32 {
        self.end_index
    }

    /// Number of bytes covered by this field.
    #[must_use]
    pub fn width(&self) -> usize {
        (self.end_index - self.start_index) as usize + 1
    }

    /// Half-open byte range of this field within its segment.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start_index as usize..self.end_index as usize + 1
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Encoding {
    #[default]
    Uint,
    Int,
    Float,
}

/// Field entry as written in the schema document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldEntry {
    start_index: u32,
    end_index: u32,
    #[serde(default)]
    encoding: Encoding,
    #[serde(default)]
    byte_order: ByteOrder,
}

impl TryFrom<FieldEntry> for FieldSpec {
    type Error = Error;

    fn try_from(entry: FieldEntry) -> Result<Self> {
        let kind = match entry.encoding {
            Encoding::Uint => FieldKind::Integer {
                signed: false,
                byte_order: entry.byte_order,
            },
            Encoding::Int => FieldKind::Integer {
                signed: true,
                byte_order: entry.byte_order,
            },
            Encoding::Float => FieldKind::Float32 {
                byte_order: entry.byte_order,
            },
        };
        FieldSpec::new(entry.start_index, entry.end_index, kind)
    }
}

/// Named fields of one segment, in document order. Names are unique.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldTable {
    fields: Vec<(String, FieldSpec)>,
}

impl FieldTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    ///
    /// # Errors
    /// [Error::Schema] if a field with the same name already exists.
    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(Error::Schema(format!("duplicate field {name}")));
        }
        self.fields.push((name, spec));
        Ok(())
    }

    /// Builder form of [FieldTable::insert].
    ///
    /// # Errors
    /// [Error::Schema] if a field with the same name already exists.
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Result<Self> {
        self.insert(name, spec)?;
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find_map(|(n, spec)| (n == name).then_some(spec))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, spec)| (n.as_str(), spec))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The field reaching furthest into the segment, with its exclusive end offset.
    fn furthest(&self) -> Option<(&str, usize)> {
        self.iter()
            .map(|(name, spec)| (name, spec.range().end))
            .max_by_key(|(_, end)| *end)
    }
}

impl<'de> Deserialize<'de> for FieldTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> de::Visitor<'de> for TableVisitor {
            type Value = FieldTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to field specs")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<FieldTable, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut table = FieldTable::default();
                while let Some((name, spec)) = map.next_entry::<String, FieldSpec>()? {
                    table.insert(name, spec).map_err(de::Error::custom)?;
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Byte layout of one frame type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameLayout {
    /// Total frame length in bytes, including the type tag.
    pub length: u32,
    #[serde(rename = "instrument_packet_start")]
    pub instrument_segment_start: u32,
    #[serde(rename = "instrument_packet_length")]
    pub instrument_segment_length: u32,
    /// Instrument family whose field table decodes the instrument segment.
    pub family: String,
}

impl FrameLayout {
    #[must_use]
    pub fn len(&self) -> usize {
        self.length as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Range of the instrument segment within the frame.
    #[must_use]
    pub fn instrument_range(&self) -> Range<usize> {
        let start = self.instrument_segment_start as usize;
        start..start + self.instrument_segment_length as usize
    }

    /// Length of the receiver envelope, i.e., the frame without the instrument segment.
    #[must_use]
    pub fn envelope_len(&self) -> usize {
        self.len().saturating_sub(self.instrument_segment_length as usize)
    }
}

/// Schema document as written on disk.
#[derive(Debug, Deserialize)]
struct SchemaDocument {
    #[serde(rename = "InstrumentType")]
    instrument_type: HashMap<TypeTag, FrameLayout>,
    #[serde(rename = "ReceiverPacket")]
    receiver_packet: FieldTable,
    #[serde(flatten)]
    families: HashMap<String, FieldTable>,
}

impl TryFrom<SchemaDocument> for Schema {
    type Error = Error;

    fn try_from(doc: SchemaDocument) -> Result<Self> {
        Schema::new(doc.instrument_type, doc.receiver_packet, doc.families)
    }
}

/// Validated description of every known frame type and its fields.
///
/// # Example
/// ```
/// use cryodecoder::schema::{Schema, TypeTag};
///
/// let schema = Schema::default();
/// let layout = schema.layout(&TypeTag::new(*b"C1")).unwrap();
/// assert_eq!(layout.family, "Cryoegg");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "SchemaDocument")]
pub struct Schema {
    layouts: HashMap<TypeTag, FrameLayout>,
    receiver: FieldTable,
    families: HashMap<String, FieldTable>,
}

impl Default for Schema {
    fn default() -> Self {
        serde_json::from_str(DEFAULT_SCHEMA).expect("built-in schema is not valid")
    }
}

impl Schema {
    /// Create a validated schema.
    ///
    /// A layout may reference a family with no field table; frames of that type still
    /// scan but fail to decode with [Error::UnsupportedInstrumentType].
    ///
    /// # Errors
    /// [Error::Schema] if any layout or field does not fit where it is decoded from.
    pub fn new(
        layouts: HashMap<TypeTag, FrameLayout>,
        receiver: FieldTable,
        families: HashMap<String, FieldTable>,
    ) -> Result<Self> {
        for (tag, layout) in &layouts {
            validate_layout(tag, layout)?;

            if let Some((name, end)) = receiver.furthest() {
                if end > layout.envelope_len() {
                    return Err(Error::Schema(format!(
                        "receiver field {name} ends at {end}, beyond the {} byte envelope of {tag}",
                        layout.envelope_len()
                    )));
                }
            }

            let Some(table) = families.get(&layout.family) else {
                continue;
            };
            if let Some((name, end)) = table.furthest() {
                if end > layout.instrument_segment_length as usize {
                    return Err(Error::Schema(format!(
                        "{} field {name} ends at {end}, beyond the {} byte instrument segment of {tag}",
                        layout.family, layout.instrument_segment_length
                    )));
                }
            }
        }

        Ok(Self {
            layouts,
            receiver,
            families,
        })
    }

    /// Load from a JSON schema document.
    ///
    /// # Errors
    /// [Error::Json] if the document cannot be parsed or does not validate.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON schema document file.
    ///
    /// # Errors
    /// [Error::Io] if the file cannot be opened, otherwise see [Schema::from_json].
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    #[must_use]
    pub fn layout(&self, tag: &TypeTag) -> Option<&FrameLayout> {
        self.layouts.get(tag)
    }

    /// All known type tags, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &TypeTag> {
        self.layouts.keys()
    }

    #[must_use]
    pub fn receiver_fields(&self) -> &FieldTable {
        &self.receiver
    }

    #[must_use]
    pub fn family_fields(&self, family: &str) -> Option<&FieldTable> {
        self.families.get(family)
    }

    /// Instrument field table for frames of type `tag`.
    #[must_use]
    pub fn instrument_fields(&self, tag: &TypeTag) -> Option<&FieldTable> {
        self.layout(tag)
            .and_then(|layout| self.family_fields(&layout.family))
    }
}

fn validate_layout(tag: &TypeTag, layout: &FrameLayout) -> Result<()> {
    if layout.length == 0 {
        return Err(Error::Schema(format!("{tag} has zero length")));
    }
    if (layout.instrument_segment_start as usize) < TypeTag::LEN {
        return Err(Error::Schema(format!(
            "{tag} instrument segment overlaps the type tag"
        )));
    }
    let range = layout.instrument_range();
    if range.end > layout.len() {
        return Err(Error::Schema(format!(
            "{tag} instrument segment {range:?} exceeds frame length {}",
            layout.length
        )));
    }
    Ok(())
}
