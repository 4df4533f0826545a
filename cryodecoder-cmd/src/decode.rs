use std::io::{stdout, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use cryodecoder::records::InstrumentRecord;
use cryodecoder::schema::Schema;
use cryodecoder::{Decoded, DecodedFrame, Decoder};
use tracing::{info, warn};

use crate::info::Format;

fn write_text<W: Write>(mut writer: W, frame: &DecodedFrame) -> std::io::Result<()> {
    let rx = &frame.receiver;
    write!(
        writer,
        "{:>10} {} {} ch={} temp={} pres={} volt={}",
        frame.offset,
        frame.tag,
        rx.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        rx.channel,
        rx.temperature,
        rx.pressure,
        rx.voltage,
    )?;
    match &frame.instrument {
        InstrumentRecord::Cryoegg(egg) => writeln!(
            writer,
            " cryoegg id={:08x} seq={} cond={} pt1000={} pres={} temp={} batt={} rssi={}",
            egg.instrument_id,
            egg.sequence_number,
            egg.conductivity_raw,
            egg.temperature_pt1000_raw,
            egg.pressure_raw,
            egg.temperature_raw,
            egg.battery_voltage,
            egg.rssi,
        ),
        InstrumentRecord::Cryowurst(wurst) => writeln!(
            writer,
            " cryowurst id={:08x} seq={} temp={} cond={} pres={} mag={},{},{} acc={},{},{} tilt={},{} batt={} rssi={}",
            wurst.instrument_id,
            wurst.sequence_number,
            wurst.temperature_raw,
            wurst.conductivity_raw,
            wurst.pressure_raw,
            wurst.magnetometer_x,
            wurst.magnetometer_y,
            wurst.magnetometer_z,
            wurst.accelerometer_x,
            wurst.accelerometer_y,
            wurst.accelerometer_z,
            wurst.tilt_x,
            wurst.tilt_y,
            wurst.battery_voltage,
            wurst.rssi,
        ),
    }
}

fn write_frames<W: Write>(decoded: &Decoded, format: &Format, mut writer: W) -> Result<()> {
    for zult in &decoded.frames {
        let frame = match zult.result {
            Ok(ref frame) => frame,
            Err(ref err) => {
                warn!(offset = zult.offset, tag = %zult.tag, "skipping frame: {err}");
                continue;
            }
        };
        match format {
            Format::Json => {
                serde_json::to_writer(&mut writer, frame).context("serializing frame")?;
                writeln!(writer).context("writing output")?;
            }
            Format::Text => write_text(&mut writer, frame).context("writing output")?,
        }
    }
    writer.flush().context("writing output")
}

pub fn decode(input: &Path, schema: &Schema, threads: Option<usize>, format: &Format) -> Result<()> {
    let buf = std::fs::read(input).with_context(|| format!("reading {input:?}"))?;

    let mut decoder = Decoder::new(schema);
    if let Some(num) = threads {
        decoder = decoder.with_threads(num);
    }
    let decoded = decoder.decode(&buf).context("decoding")?;

    write_frames(&decoded, format, BufWriter::new(stdout().lock()))?;

    if let Some(ref truncated) = decoded.truncated {
        warn!(
            offset = truncated.offset,
            tag = %truncated.tag,
            "input ends with a truncated frame; needed {} bytes, have {}",
            truncated.needed,
            truncated.available
        );
    }
    let summary = decoded.summary();
    info!(
        frames = summary.count,
        errors = summary.errors,
        "decoded {input:?}"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cryoegg_frame(seq: u8) -> Vec<u8> {
        let mut dat = b"C1".to_vec();
        dat.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        dat.push(2);
        dat.extend_from_slice(&[0xce, 0, 0, 5]);
        dat.resize(21, 0);
        dat.push(seq);
        dat.resize(32, 0);
        dat
    }

    #[test]
    fn json_lines() {
        let schema = Schema::default();
        let mut buf = cryoegg_frame(1);
        buf.extend(cryoegg_frame(2));
        let decoded = Decoder::new(&schema).decode(&buf).unwrap();

        let mut out = Vec::new();
        write_frames(&decoded, &Format::Json, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["tag"], "C1");
        assert_eq!(lines[1]["offset"], 32);
        assert_eq!(lines[0]["receiver"]["timestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(lines[0]["instrument"]["family"], "Cryoegg");
        assert_eq!(lines[1]["instrument"]["sequence_number"], 2);
    }

    #[test]
    fn text_lines() {
        let schema = Schema::default();
        let decoded = Decoder::new(&schema).decode(&cryoegg_frame(7)).unwrap();

        let mut out = Vec::new();
        write_frames(&decoded, &Format::Text, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("2023-11-14T22:13:20Z"), "{out}");
        assert!(out.contains("cryoegg id=ce000005 seq=7"), "{out}");
    }

    #[test]
    fn failed_frames_are_skipped() {
        let schema = Schema::default();
        let mut buf = cryoegg_frame(1);
        buf.extend(cryoegg_frame(2));
        let mut decoded = Decoder::new(&schema).decode(&buf).unwrap();
        decoded.frames[0].result = Err(cryodecoder::Error::MissingField("rssi".to_string()));

        let mut out = Vec::new();
        write_frames(&decoded, &Format::Json, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(r#""offset":32"#), "{out}");
    }
}
