use crate::error::SplitError;
use crate::schema::FrameLayout;

/// Receiver and instrument segments of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments<'a> {
    /// Frame bytes with the instrument segment removed. Receiver field offsets index
    /// into this, not into the frame.
    pub envelope: Vec<u8>,
    /// The instrument segment, borrowed from the frame.
    pub payload: &'a [u8],
}

/// The instrument segment of `frame` per `layout`, without building the envelope.
///
/// # Errors
/// [SplitError::LayoutOutOfBounds] if the instrument segment does not fit in `frame`.
pub fn payload<'a>(frame: &'a [u8], layout: &FrameLayout) -> Result<&'a [u8], SplitError> {
    let range = layout.instrument_range();
    frame
        .get(range.clone())
        .ok_or(SplitError::LayoutOutOfBounds {
            start: range.start,
            end: range.end,
            frame_len: frame.len(),
        })
}

/// Split `frame` into its receiver envelope and instrument payload per `layout`.
///
/// The envelope is the bytes before the instrument segment followed by the bytes after
/// it.
///
/// # Errors
/// [SplitError::LayoutOutOfBounds] if the instrument segment does not fit in `frame`.
pub fn split<'a>(frame: &'a [u8], layout: &FrameLayout) -> Result<Segments<'a>, SplitError> {
    let payload = payload(frame, layout)?;
    let range = layout.instrument_range();

    let mut envelope = Vec::with_capacity(frame.len() - payload.len());
    envelope.extend_from_slice(&frame[..range.start]);
    envelope.extend_from_slice(&frame[range.end..]);

    Ok(Segments { envelope, payload })
}
