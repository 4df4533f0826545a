//! Frame location and segment splitting.
//!
//! Frames are located by their [TypeTag](crate::schema::TypeTag) using [scan], then split
//! into the receiver envelope and instrument payload using [split].
mod scanner;
mod splitter;

pub use scanner::*;
pub use splitter::*;
