use rayon::prelude::*;
use tracing::{debug, span, Level};

use crate::decode::{decode_frame, DecodedFrame};
use crate::framing::{scan, RawFrame, Truncation};
use crate::schema::{Schema, TypeTag};
use crate::summary::Summary;
use crate::{Error, Result};

/// Outcome of decoding one scanned frame.
#[derive(Debug)]
pub struct FrameResult {
    /// Offset of the frame in the buffer
    pub offset: usize,
    pub tag: TypeTag,
    pub len: usize,
    pub result: Result<DecodedFrame>,
}

impl FrameResult {
    fn decode(frame: &RawFrame, schema: &Schema) -> Self {
        let result = decode_frame(frame, schema);
        if let Err(ref err) = result {
            debug!(offset = frame.offset(), tag = %frame.tag(), "frame failed to decode: {err}");
        }
        Self {
            offset: frame.offset(),
            tag: frame.tag(),
            len: frame.len(),
            result,
        }
    }
}

/// All frames decoded from a buffer, in buffer order.
#[derive(Debug, Default)]
pub struct Decoded {
    pub frames: Vec<FrameResult>,
    /// Set if the scan ended at a truncated trailing frame.
    pub truncated: Option<Truncation>,
}

impl Decoded {
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for zult in &self.frames {
            summary.add(zult);
        }
        summary.truncated.clone_from(&self.truncated);
        summary
    }
}

/// Scans a buffer and decodes every frame found.
///
/// Frames decode independently so [Decoder::decode] spreads them over a thread pool.
/// Results are always in the order frames appear in the buffer and a frame that fails
/// to decode does not affect any other frame.
///
/// # Example
/// ```
/// use cryodecoder::{Decoder, schema::Schema};
///
/// let schema = Schema::default();
/// let mut buf = b"C1".to_vec();
/// buf.resize(32, 0);
/// let frame = buf.clone();
/// buf.extend(frame);
///
/// let decoded = Decoder::new(&schema).with_threads(2).decode(&buf).unwrap();
/// assert_eq!(decoded.frames.len(), 2);
/// assert_eq!(decoded.frames[1].offset, 32);
/// ```
#[derive(Debug, Clone)]
pub struct Decoder<'s> {
    schema: &'s Schema,
    num_threads: Option<usize>,
}

impl<'s> Decoder<'s> {
    #[must_use]
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            num_threads: None,
        }
    }

    /// Number of decode threads. The default is one per cpu.
    #[must_use]
    pub fn with_threads(mut self, num: usize) -> Self {
        self.num_threads = Some(num);
        self
    }

    /// Decode all frames in `buf` using a thread pool.
    ///
    /// # Errors
    /// [Error::ThreadPool] if the pool cannot be created. Per-frame errors are reported
    /// in each [FrameResult].
    pub fn decode(&self, buf: &[u8]) -> Result<Decoded> {
        let span = span!(Level::DEBUG, "decode", len = buf.len());
        let _guard = span.enter();

        let mut scanner = scan(buf, self.schema);
        let frames: Vec<RawFrame> = scanner.by_ref().collect();
        let truncated = scanner.truncated().cloned();
        debug!(frames = frames.len(), "scanned");

        let pool = {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if let Some(num) = self.num_threads {
                builder = builder.num_threads(num);
            }
            builder
        }
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

        let schema = self.schema;
        let frames = pool.install(|| {
            frames
                .par_iter()
                .map(|frame| FrameResult::decode(frame, schema))
                .collect()
        });

        Ok(Decoded { frames, truncated })
    }

    /// Decode frames in `buf` one at a time on the calling thread.
    pub fn decode_iter<'a>(&self, buf: &'a [u8]) -> impl Iterator<Item = FrameResult> + 'a
    where
        's: 'a,
    {
        let schema: &'a Schema = self.schema;
        scan(buf, schema).map(move |frame| FrameResult::decode(&frame, schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: &[u8; 2], len: usize, seq: u8) -> Vec<u8> {
        let mut dat = tag.to_vec();
        dat.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        dat.push(1);
        dat.resize(len, 0);
        let seq_idx = if tag == b"C1" { 7 + 14 } else { 7 + 28 };
        dat[seq_idx] = seq;
        dat
    }

    fn buffer() -> Vec<u8> {
        let mut buf = vec![0xff; 3];
        for seq in 0..20u8 {
            if seq % 3 == 0 {
                buf.extend(frame(b"W2", 46, seq));
            } else {
                buf.extend(frame(b"C1", 32, seq));
            }
            buf.push(0x00);
        }
        buf
    }

    #[test]
    fn parallel_matches_sequential() {
        let schema = Schema::default();
        let buf = buffer();
        let decoder = Decoder::new(&schema).with_threads(4);

        let decoded = decoder.decode(&buf).unwrap();
        let sequential: Vec<FrameResult> = decoder.decode_iter(&buf).collect();

        assert_eq!(decoded.frames.len(), 20);
        assert_eq!(sequential.len(), 20);
        for (idx, (par, seq)) in decoded.frames.iter().zip(&sequential).enumerate() {
            assert_eq!(par.offset, seq.offset);
            let par = par.result.as_ref().unwrap();
            let seq = seq.result.as_ref().unwrap();
            assert_eq!(par, seq);
            assert_eq!(par.instrument.sequence_number(), idx as u64);
        }
        assert!(decoded.truncated.is_none());
    }

    #[test]
    fn truncated_tail_reported() {
        let schema = Schema::default();
        let mut buf = buffer();
        buf.extend_from_slice(b"C1\x00\x00");

        let decoded = Decoder::new(&schema).decode(&buf).unwrap();
        assert_eq!(decoded.frames.len(), 20);
        let truncated = decoded.truncated.unwrap();
        assert_eq!(truncated.needed, 32);
        assert_eq!(truncated.available, 4);
    }

    #[test]
    fn failed_frame_does_not_affect_others() {
        // W2 frames are bound to a family with no record type
        let doc = r#"{
            "InstrumentType": {
                "C1": {"length": 32, "instrument_packet_start": 7, "instrument_packet_length": 17, "family": "Cryoegg"},
                "W2": {"length": 46, "instrument_packet_start": 7, "instrument_packet_length": 31, "family": "Hydrobean"}
            },
            "ReceiverPacket": {
                "timestamp": {"start_index": 2, "end_index": 5},
                "channel": {"start_index": 6, "end_index": 6},
                "temperature": {"start_index": 7, "end_index": 10, "encoding": "float"},
                "pressure": {"start_index": 11, "end_index": 12},
                "voltage": {"start_index": 13, "end_index": 14}
            },
            "Cryoegg": {
                "instrument_id": {"start_index": 0, "end_index": 3, "byte_order": "big"},
                "conductivity_raw": {"start_index": 4, "end_index": 5},
                "temperature_pt1000_raw": {"start_index": 6, "end_index": 7},
                "pressure_raw": {"start_index": 8, "end_index": 9},
                "temperature_raw": {"start_index": 10, "end_index": 11},
                "battery_voltage": {"start_index": 12, "end_index": 13},
                "sequence_number": {"start_index": 14, "end_index": 14},
                "rssi": {"start_index": 15, "end_index": 16}
            }
        }"#;
        let schema = Schema::from_json(doc).unwrap();
        let buf = buffer();

        let decoded = Decoder::new(&schema).decode(&buf).unwrap();

        assert_eq!(decoded.frames.len(), 20);
        for (idx, zult) in decoded.frames.iter().enumerate() {
            if idx % 3 == 0 {
                assert_eq!(zult.tag, TypeTag::new(*b"W2"));
                assert!(
                    matches!(zult.result, Err(Error::UnsupportedInstrumentType(_))),
                    "frame {idx}: {:?}",
                    zult.result
                );
            } else {
                let frame = zult.result.as_ref().unwrap();
                assert_eq!(frame.instrument.sequence_number(), idx as u64);
            }
        }
    }
}
