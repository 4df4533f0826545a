#![allow(dead_code)]

use rand::Rng;

pub const C1_LEN: usize = 32;
pub const W2_LEN: usize = 46;

fn envelope_head(tag: &[u8; 2], timestamp: u32, channel: u8) -> Vec<u8> {
    let mut dat = tag.to_vec();
    dat.extend_from_slice(&timestamp.to_le_bytes());
    dat.push(channel);
    dat
}

fn envelope_tail(dat: &mut Vec<u8>, temperature: f32, pressure: u16, voltage: u16) {
    dat.extend_from_slice(&temperature.to_le_bytes());
    dat.extend_from_slice(&pressure.to_le_bytes());
    dat.extend_from_slice(&voltage.to_le_bytes());
}

/// A `C1` frame as laid out by the built-in schema.
pub fn cryoegg_frame(timestamp: u32, channel: u8, instrument_id: u32, seq: u8) -> Vec<u8> {
    let mut dat = envelope_head(b"C1", timestamp, channel);
    dat.extend_from_slice(&instrument_id.to_be_bytes());
    for raw in [1200u16, 20000, 16384, 25000, 3600] {
        dat.extend_from_slice(&raw.to_le_bytes());
    }
    dat.push(seq);
    dat.extend_from_slice(&87u16.to_le_bytes());
    envelope_tail(&mut dat, 1.5, 16000, 3300);
    assert_eq!(dat.len(), C1_LEN);
    dat
}

/// A `W2` frame as laid out by the built-in schema.
pub fn cryowurst_frame(timestamp: u32, channel: u8, instrument_id: u32, seq: u8) -> Vec<u8> {
    let mut dat = envelope_head(b"W2", timestamp, channel);
    dat.extend_from_slice(&instrument_id.to_be_bytes());
    for raw in [100u16, 200, 300] {
        dat.extend_from_slice(&raw.to_le_bytes());
    }
    for raw in [-10i16, 20, -30, 40, -50, 60, -70, 80] {
        dat.extend_from_slice(&raw.to_le_bytes());
    }
    dat.extend_from_slice(&3500u16.to_le_bytes());
    dat.push(seq);
    dat.extend_from_slice(&60u16.to_le_bytes());
    envelope_tail(&mut dat, -2.0, 15000, 3100);
    assert_eq!(dat.len(), W2_LEN);
    dat
}

/// Random bytes that can never begin a known type tag.
pub fn filler<R: Rng>(rng: &mut R, len: usize) -> Vec<u8> {
    (0..len)
        .map(|_| loop {
            let b: u8 = rng.gen();
            if b != b'C' && b != b'W' {
                break b;
            }
        })
        .collect()
}

/// Random mix of frames and filler. Returns the buffer and the offsets of every frame.
pub fn random_buffer<R: Rng>(rng: &mut R, num_frames: usize) -> (Vec<u8>, Vec<usize>) {
    let mut buf = Vec::new();
    let mut offsets = Vec::new();
    for seq in 0..num_frames {
        let pad = rng.gen_range(0..8);
        buf.extend(filler(rng, pad));
        offsets.push(buf.len());
        let seq = u8::try_from(seq % 256).unwrap();
        if rng.gen_bool(0.5) {
            buf.extend(cryoegg_frame(rng.gen(), 1, 0xce00_0000 | u32::from(rng.gen::<u16>()), seq));
        } else {
            buf.extend(cryowurst_frame(rng.gen(), 2, 0xc700_0000, seq));
        }
    }
    buf.extend(filler(rng, 3));
    (buf, offsets)
}
