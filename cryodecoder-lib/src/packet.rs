use crate::decode::{decode_frame, decode_instrument, decode_receiver, DecodedFrame};
use crate::framing::RawFrame;
use crate::records::{InstrumentRecord, ReceiverRecord};
use crate::schema::{Schema, TypeTag};
use crate::{Error, Result};

/// A frame from one of the sources frames arrive by.
///
/// Storage-card frames are located by scanning a card image and borrow from it, relayed
/// frames arrive one at a time and own their bytes. Both decode the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet<'a> {
    /// Frame found in a storage card image.
    Sd(RawFrame<'a>),
    /// Frame received on its own from a relay.
    Relayed { tag: TypeTag, data: Vec<u8> },
}

impl Packet<'static> {
    /// A relayed frame. `data` must begin with a type tag known to `schema` and be
    /// exactly the length declared for it.
    ///
    /// # Errors
    /// [Error::FrameLength] if `data` is too short for a tag or not the declared length,
    /// [Error::UnknownTypeTag] if the tag is not in `schema`.
    pub fn relayed(data: Vec<u8>, schema: &Schema) -> Result<Self> {
        let tag = TypeTag::from_slice(&data).ok_or(Error::FrameLength {
            expected: TypeTag::LEN,
            actual: data.len(),
        })?;
        let layout = schema.layout(&tag).ok_or(Error::UnknownTypeTag(tag))?;
        if data.len() != layout.len() {
            return Err(Error::FrameLength {
                expected: layout.len(),
                actual: data.len(),
            });
        }
        Ok(Packet::Relayed { tag, data })
    }
}

impl<'a> Packet<'a> {
    /// Borrowed frame view. Relayed frames report offset 0.
    #[must_use]
    pub fn frame(&self) -> RawFrame<'_> {
        match self {
            Packet::Sd(frame) => *frame,
            Packet::Relayed { tag, data } => RawFrame::new(*tag, 0, data),
        }
    }

    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Packet::Sd(frame) => frame.tag(),
            Packet::Relayed { tag, .. } => *tag,
        }
    }

    #[must_use]
    pub fn raw_bytes(&self) -> &[u8] {
        match self {
            Packet::Sd(frame) => frame.data(),
            Packet::Relayed { data, .. } => data,
        }
    }

    /// # Errors
    /// See [decode_receiver].
    pub fn receiver(&self, schema: &Schema) -> Result<ReceiverRecord> {
        decode_receiver(&self.frame(), schema)
    }

    /// # Errors
    /// See [decode_instrument].
    pub fn instrument(&self, schema: &Schema) -> Result<InstrumentRecord> {
        decode_instrument(&self.frame(), schema)
    }

    /// # Errors
    /// See [decode_frame].
    pub fn decode(&self, schema: &Schema) -> Result<DecodedFrame> {
        decode_frame(&self.frame(), schema)
    }
}

impl<'a> From<RawFrame<'a>> for Packet<'a> {
    fn from(frame: RawFrame<'a>) -> Self {
        Packet::Sd(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::scan;

    fn egg_frame(seq: u8) -> Vec<u8> {
        let mut dat = b"C1".to_vec();
        dat.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        dat.push(3);
        dat.extend_from_slice(&[0xce, 0, 0, 9]);
        dat.resize(7 + 14, 0);
        dat.push(seq);
        dat.resize(32, 0);
        dat
    }

    #[test]
    fn relayed_and_sd_decode_alike() {
        let schema = Schema::default();
        let dat = egg_frame(5);

        let sd: Packet = scan(&dat, &schema).next().unwrap().into();
        let relayed = Packet::relayed(dat.clone(), &schema).unwrap();

        assert_eq!(sd.type_tag(), relayed.type_tag());
        assert_eq!(sd.raw_bytes(), relayed.raw_bytes());
        assert_eq!(
            sd.decode(&schema).unwrap(),
            relayed.decode(&schema).unwrap()
        );
        assert_eq!(relayed.instrument(&schema).unwrap().sequence_number(), 5);
        assert_eq!(relayed.receiver(&schema).unwrap().channel, 3);
    }

    #[test]
    fn relayed_wrong_length() {
        let schema = Schema::default();
        let mut dat = egg_frame(0);
        dat.push(0);
        assert!(matches!(
            Packet::relayed(dat, &schema),
            Err(Error::FrameLength {
                expected: 32,
                actual: 33
            })
        ));
        assert!(matches!(
            Packet::relayed(vec![b'C'], &schema),
            Err(Error::FrameLength { expected: 2, .. })
        ));
    }

    #[test]
    fn relayed_unknown_tag() {
        let schema = Schema::default();
        let mut dat = egg_frame(0);
        dat[..2].copy_from_slice(b"Q9");
        assert!(matches!(
            Packet::relayed(dat, &schema),
            Err(Error::UnknownTypeTag(_))
        ));
    }
}
