use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cryodecoder::records::InstrumentRecord;
use cryodecoder::schema::Schema;
use cryodecoder::{Decoder, Summary};
use handlebars::handlebars_helper;
use serde::Serialize;
use std::{
    cmp,
    collections::BTreeMap,
    io::{stdout, Write},
    path::Path,
};

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Default, Debug, Clone, Serialize)]
struct TimeRange {
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
    /// Seconds between first and last
    duration: i64,
}

impl TimeRange {
    fn add(&mut self, time: DateTime<Utc>) {
        self.first = self.first.map_or(Some(time), |cur| Some(cmp::min(time, cur)));
        self.last = self.last.map_or(Some(time), |cur| Some(cmp::max(time, cur)));
        if let (Some(first), Some(last)) = (self.first, self.last) {
            self.duration = (last - first).num_seconds();
        }
    }
}

#[derive(Default, Debug, Clone, Serialize)]
struct InstrumentInfo {
    count: usize,
    family: String,
    times: TimeRange,
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    summary: Summary,
    times: TimeRange,
    /// Keyed by hex instrument id
    instruments: BTreeMap<String, InstrumentInfo>,
}

fn summarize(fpath: &Path, schema: &Schema) -> Result<Info> {
    let buf = std::fs::read(fpath).context("reading input")?;
    let decoded = Decoder::new(schema).decode(&buf).context("decoding")?;

    let mut times = TimeRange::default();
    let mut instruments: BTreeMap<String, InstrumentInfo> = BTreeMap::default();
    for frame in decoded.frames.iter().filter_map(|f| f.result.as_ref().ok()) {
        times.add(frame.receiver.timestamp);

        let inst = instruments
            .entry(format!("{:08x}", frame.instrument.instrument_id()))
            .or_default();
        inst.count += 1;
        inst.times.add(frame.receiver.timestamp);
        if inst.family.is_empty() {
            let family = match frame.instrument {
                InstrumentRecord::Cryoegg(_) => "Cryoegg",
                InstrumentRecord::Cryowurst(_) => "Cryowurst",
            };
            inst.family = family.to_string();
        }
    }

    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        summary: decoded.summary(),
        times,
        instruments,
    })
}

pub fn info(fpath: &Path, schema: &Schema, format: &Format) -> Result<()> {
    let info = summarize(fpath, schema)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or_default().max(v.len());
        format!("{v:>num$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
=========================================================================================
First:     {{ times.first }}
Last:      {{ times.last }}
Duration:  {{ times.duration }}s
Frames:    {{ summary.count }}
Bytes:     {{ summary.bytes }}
Errors:    {{ summary.errors }}
{{ #if summary.truncated }}Truncated: {{ summary.truncated.tag }} frame at {{ summary.truncated.offset }}, {{ summary.truncated.available }} of {{ summary.truncated.needed }} bytes
{{ /if }}-----------------------------------------------------------------------------------------
Tag      Count        Bytes   Errors
-----------------------------------------------------------------------------------------
{{ #each summary.tags }}{{ lpad 3 @key }}   {{ lpad 8 count }}   {{ lpad 10 bytes }}   {{ lpad 6 errors }}
{{/each }}-----------------------------------------------------------------------------------------
Instrument  Family      First                  Last                    Count
-----------------------------------------------------------------------------------------
{{ #each instruments }}{{ @key }}    {{ lpad 9 family }}   {{ lpad 20 times.first }}   {{ lpad 20 times.last }}   {{ lpad 6 count }}
{{/each }}
";
