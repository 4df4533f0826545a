use serde::{Deserialize, Serialize};

use crate::field::Fields;
use crate::schema::{FieldTable, TypeTag};
use crate::{Error, Result};

/// Cryoegg instrument payload values. All readings are raw sensor counts, wide enough
/// for any integer field the schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cryoegg {
    pub type_tag: TypeTag,
    pub instrument_id: u64,
    pub conductivity_raw: i64,
    pub temperature_pt1000_raw: i64,
    pub pressure_raw: i64,
    pub temperature_raw: i64,
    pub battery_voltage: i64,
    pub sequence_number: u64,
    pub rssi: i64,
}

impl Cryoegg {
    /// High byte of every Cryoegg instrument id.
    pub const ID_PREFIX: u8 = 0xce;

    fn from_fields(type_tag: TypeTag, fields: &Fields) -> Result<Self> {
        Ok(Self {
            type_tag,
            instrument_id: fields.integer("instrument_id")?,
            conductivity_raw: fields.integer("conductivity_raw")?,
            temperature_pt1000_raw: fields.integer("temperature_pt1000_raw")?,
            pressure_raw: fields.integer("pressure_raw")?,
            temperature_raw: fields.integer("temperature_raw")?,
            battery_voltage: fields.integer("battery_voltage")?,
            sequence_number: fields.integer("sequence_number")?,
            rssi: fields.integer("rssi")?,
        })
    }
}

/// Cryowurst instrument payload values. All readings are raw sensor counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cryowurst {
    pub type_tag: TypeTag,
    pub instrument_id: u64,
    pub temperature_raw: i64,
    pub conductivity_raw: i64,
    pub pressure_raw: i64,
    pub magnetometer_x: i64,
    pub magnetometer_y: i64,
    pub magnetometer_z: i64,
    pub accelerometer_x: i64,
    pub accelerometer_y: i64,
    pub accelerometer_z: i64,
    pub tilt_x: i64,
    pub tilt_y: i64,
    pub battery_voltage: i64,
    pub sequence_number: u64,
    pub rssi: i64,
}

impl Cryowurst {
    fn from_fields(type_tag: TypeTag, fields: &Fields) -> Result<Self> {
        Ok(Self {
            type_tag,
            instrument_id: fields.integer("instrument_id")?,
            temperature_raw: fields.integer("temperature_raw")?,
            conductivity_raw: fields.integer("conductivity_raw")?,
            pressure_raw: fields.integer("pressure_raw")?,
            magnetometer_x: fields.integer("magnetometer_x")?,
            magnetometer_y: fields.integer("magnetometer_y")?,
            magnetometer_z: fields.integer("magnetometer_z")?,
            accelerometer_x: fields.integer("accelerometer_x")?,
            accelerometer_y: fields.integer("accelerometer_y")?,
            accelerometer_z: fields.integer("accelerometer_z")?,
            tilt_x: fields.integer("tilt_x")?,
            tilt_y: fields.integer("tilt_y")?,
            battery_voltage: fields.integer("battery_voltage")?,
            sequence_number: fields.integer("sequence_number")?,
            rssi: fields.integer("rssi")?,
        })
    }
}

/// Instrument payload values, one variant per instrument family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family")]
pub enum InstrumentRecord {
    Cryoegg(Cryoegg),
    Cryowurst(Cryowurst),
}

type Constructor = fn(TypeTag, &Fields) -> Result<InstrumentRecord>;

fn cryoegg(type_tag: TypeTag, fields: &Fields) -> Result<InstrumentRecord> {
    Cryoegg::from_fields(type_tag, fields).map(InstrumentRecord::Cryoegg)
}

fn cryowurst(type_tag: TypeTag, fields: &Fields) -> Result<InstrumentRecord> {
    Cryowurst::from_fields(type_tag, fields).map(InstrumentRecord::Cryowurst)
}

/// Record constructors by family name. Families are bound to type tags by the schema.
const CONSTRUCTORS: &[(&str, Constructor)] = &[
    ("Cryoegg", cryoegg as Constructor),
    ("Cryowurst", cryowurst as Constructor),
];

fn constructor(family: &str) -> Option<Constructor> {
    CONSTRUCTORS
        .iter()
        .find_map(|(name, ctor)| (*name == family).then_some(*ctor))
}

/// True if there is a record type for instrument `family`.
#[must_use]
pub fn is_supported_family(family: &str) -> bool {
    constructor(family).is_some()
}

impl InstrumentRecord {
    /// Decode from instrument payload bytes with the field table for `family`.
    ///
    /// # Errors
    /// [Error::UnsupportedInstrumentType] if there is no record type for `family`,
    /// otherwise any field failing to decode or convert fails the whole record.
    pub fn decode(
        payload: &[u8],
        type_tag: TypeTag,
        family: &str,
        table: &FieldTable,
    ) -> Result<Self> {
        let ctor = constructor(family).ok_or(Error::UnsupportedInstrumentType(type_tag))?;
        let fields = Fields::decode(payload, table)?;
        ctor(type_tag, &fields)
    }

    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            InstrumentRecord::Cryoegg(rec) => rec.type_tag,
            InstrumentRecord::Cryowurst(rec) => rec.type_tag,
        }
    }

    #[must_use]
    pub fn instrument_id(&self) -> u64 {
        match self {
            InstrumentRecord::Cryoegg(rec) => rec.instrument_id,
            InstrumentRecord::Cryowurst(rec) => rec.instrument_id,
        }
    }

    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        match self {
            InstrumentRecord::Cryoegg(rec) => rec.sequence_number,
            InstrumentRecord::Cryowurst(rec) => rec.sequence_number,
        }
    }

    /// Family prefix, the most significant non-zero byte of the instrument id.
    #[must_use]
    pub fn id_prefix(&self) -> u8 {
        self.instrument_id()
            .to_be_bytes()
            .into_iter()
            .find(|b| *b != 0)
            .unwrap_or_default()
    }
}
