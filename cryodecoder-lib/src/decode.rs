use serde::{Deserialize, Serialize};

use crate::framing::RawFrame;
use crate::records::{InstrumentRecord, ReceiverRecord};
use crate::schema::{FrameLayout, Schema, TypeTag};
use crate::{Error, Result};

/// Both records decoded from a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodedFrame {
    pub tag: TypeTag,
    /// Offset of the frame in its source buffer
    pub offset: usize,
    pub receiver: ReceiverRecord,
    pub instrument: InstrumentRecord,
}

fn layout<'s>(frame: &RawFrame, schema: &'s Schema) -> Result<&'s FrameLayout> {
    schema
        .layout(&frame.tag())
        .ok_or(Error::UnknownTypeTag(frame.tag()))
}

fn instrument_from_payload(
    frame: &RawFrame,
    layout: &FrameLayout,
    payload: &[u8],
    schema: &Schema,
) -> Result<InstrumentRecord> {
    let table = schema
        .family_fields(&layout.family)
        .ok_or(Error::UnsupportedInstrumentType(frame.tag()))?;
    InstrumentRecord::decode(payload, frame.tag(), &layout.family, table)
}

/// Decode the receiver envelope of `frame`.
///
/// # Errors
/// [Error::UnknownTypeTag], [Error::Split], or any receiver field error.
pub fn decode_receiver(frame: &RawFrame, schema: &Schema) -> Result<ReceiverRecord> {
    let segments = frame.split(layout(frame, schema)?)?;
    ReceiverRecord::decode(&segments.envelope, schema.receiver_fields())
}

/// Decode the instrument payload of `frame`.
///
/// # Errors
/// [Error::UnknownTypeTag], [Error::UnsupportedInstrumentType], [Error::Split], or any
/// instrument field error.
pub fn decode_instrument(frame: &RawFrame, schema: &Schema) -> Result<InstrumentRecord> {
    let layout = layout(frame, schema)?;
    let payload = frame.payload(layout)?;
    instrument_from_payload(frame, layout, payload, schema)
}

/// Decode both the receiver envelope and instrument payload of `frame`.
///
/// # Example
/// ```
/// use cryodecoder::{decode_frame, framing::scan, schema::Schema};
///
/// let schema = Schema::default();
/// let mut buf = b"C1".to_vec();
/// buf.extend_from_slice(&1_600_000_000u32.to_le_bytes());
/// buf.resize(32, 0);
/// buf[7] = 0xce;
///
/// let frame = scan(&buf, &schema).next().unwrap();
/// let decoded = decode_frame(&frame, &schema).unwrap();
/// assert_eq!(decoded.receiver.timestamp.timestamp(), 1_600_000_000);
/// assert_eq!(decoded.instrument.id_prefix(), 0xce);
/// ```
///
/// # Errors
/// The first error from either record.
pub fn decode_frame(frame: &RawFrame, schema: &Schema) -> Result<DecodedFrame> {
    let layout = layout(frame, schema)?;
    let segments = frame.split(layout)?;
    let receiver = ReceiverRecord::decode(&segments.envelope, schema.receiver_fields())?;
    let instrument = instrument_from_payload(frame, layout, segments.payload, schema)?;
    Ok(DecodedFrame {
        tag: frame.tag(),
        offset: frame.offset(),
        receiver,
        instrument,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::schema::{ByteOrder, FieldSpec, FieldTable};

    fn frame_bytes() -> Vec<u8> {
        let mut dat = b"C1".to_vec();
        dat.extend_from_slice(&1_650_000_000u32.to_le_bytes());
        dat.push(1);
        dat.extend_from_slice(&[0xce, 0x00, 0x00, 0x07]);
        dat.resize(7 + 17, 0);
        dat.extend_from_slice(&12.25f32.to_le_bytes());
        dat.extend_from_slice(&16000u16.to_le_bytes());
        dat.extend_from_slice(&3300u16.to_le_bytes());
        dat
    }

    #[test]
    fn decode_frame_default_schema() {
        let schema = Schema::default();
        let dat = frame_bytes();
        let frame = RawFrame::new(TypeTag::new(*b"C1"), 10, &dat);

        let decoded = decode_frame(&frame, &schema).unwrap();

        assert_eq!(decoded.offset, 10);
        assert_eq!(decoded.receiver.timestamp.timestamp(), 1_650_000_000);
        assert_eq!(decoded.receiver.channel, 1);
        assert_eq!(decoded.receiver.temperature, 12.25);
        assert_eq!(decoded.receiver.pressure, 16000);
        assert_eq!(decoded.receiver.voltage, 3300);
        assert_eq!(decoded.instrument.instrument_id(), 0xce00_0007);
        assert_eq!(decoded.instrument.type_tag(), TypeTag::new(*b"C1"));

        assert_eq!(decode_receiver(&frame, &schema).unwrap(), decoded.receiver);
        assert_eq!(
            decode_instrument(&frame, &schema).unwrap(),
            decoded.instrument
        );
    }

    #[test]
    fn unknown_type_tag() {
        let schema = Schema::default();
        let dat = frame_bytes();
        let frame = RawFrame::new(TypeTag::new(*b"ZZ"), 0, &dat);
        assert!(matches!(
            decode_frame(&frame, &schema),
            Err(Error::UnknownTypeTag(_))
        ));
    }

    #[test]
    fn frame_shorter_than_layout() {
        let schema = Schema::default();
        let dat = frame_bytes();
        let frame = RawFrame::new(TypeTag::new(*b"C1"), 0, &dat[..20]);
        assert!(matches!(
            decode_instrument(&frame, &schema),
            Err(Error::Split(_))
        ));
    }

    #[test]
    fn family_without_field_table() {
        let layouts = HashMap::from([(
            TypeTag::new(*b"H1"),
            FrameLayout {
                length: 8,
                instrument_segment_start: 4,
                instrument_segment_length: 4,
                family: "Hydrobean".to_string(),
            },
        )]);
        let receiver = FieldTable::new()
            .with_field("timestamp", FieldSpec::uint(0, 3, ByteOrder::Little).unwrap())
            .unwrap();
        let schema = Schema::new(layouts, receiver, HashMap::new()).unwrap();
        let dat = b"H1\0\0abcd";
        let frame = RawFrame::new(TypeTag::new(*b"H1"), 0, dat);

        let zult = decode_instrument(&frame, &schema);
        assert!(
            matches!(zult, Err(Error::UnsupportedInstrumentType(tag)) if tag == frame.tag()),
            "got {zult:?}"
        );
        // receiver table lacks the other record fields
        assert!(matches!(
            decode_receiver(&frame, &schema),
            Err(Error::MissingField(_))
        ));
    }
}
