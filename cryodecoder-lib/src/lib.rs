#![doc = include_str!("../README.md")]

mod decode;
mod decoder;
mod error;
mod packet;
mod summary;

pub mod field;
pub mod framing;
pub mod records;
pub mod schema;

pub use decode::{decode_frame, decode_instrument, decode_receiver, DecodedFrame};
pub use decoder::{Decoded, Decoder, FrameResult};
pub use error::{Error, FieldDecodeError, Result, SplitError};
pub use packet::Packet;
pub use summary::{Summary, TagSummary};
