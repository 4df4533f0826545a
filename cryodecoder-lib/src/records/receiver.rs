use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::field::Fields;
use crate::schema::FieldTable;
use crate::{Error, Result};

/// Receiver/datalogger values from a frame's envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReceiverRecord {
    /// Receiver clock time the frame was logged.
    pub timestamp: DateTime<Utc>,
    /// Radio channel the frame was received on.
    pub channel: i64,
    pub temperature: f32,
    pub pressure: i64,
    pub voltage: i64,
}

impl ReceiverRecord {
    /// Decode from receiver envelope bytes using the receiver field table.
    ///
    /// `timestamp` is a count of seconds since the Unix epoch.
    ///
    /// # Errors
    /// Any field failing to decode or convert fails the whole record.
    pub fn decode(envelope: &[u8], table: &FieldTable) -> Result<Self> {
        let fields = Fields::decode(envelope, table)?;

        let secs: i64 = fields.integer("timestamp")?;
        let timestamp = Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or(Error::Timestamp(secs))?;

        Ok(Self {
            timestamp,
            channel: fields.integer("channel")?,
            temperature: fields.float("temperature")?,
            pressure: fields.integer("pressure")?,
            voltage: fields.integer("voltage")?,
        })
    }
}
