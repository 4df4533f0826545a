//! Typed records decoded from frame segments.
mod instrument;
mod receiver;

pub use instrument::*;
pub use receiver::*;
