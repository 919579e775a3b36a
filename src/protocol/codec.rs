//! Protocol codec for wire primitives and framing
//!
//! Handles conversion of integers and text to and from their wire form, and
//! cutting complete frames out of a stream of read events.

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use super::{CommandCode, Direction, Frame, PayloadLayout};

/// Maximum number of bytes the decoder will hold for a single frame (64 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated payload: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("invalid UTF-8 text: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("frame too large: {0} bytes (max: {1})")]
    FrameTooLarge(usize, usize),
}

/// Encode a u32 as 4 big-endian bytes
pub fn encode_u32(n: u32) -> [u8; 4] {
    n.to_be_bytes()
}

/// Decode the u32 held in the first 4 bytes of `bytes`
pub fn decode_u32(bytes: &[u8]) -> Result<u32, CodecError> {
    decode_u32_at(bytes, 0)
}

/// Decode the u32 held at `offset..offset + 4`
pub fn decode_u32_at(bytes: &[u8], offset: usize) -> Result<u32, CodecError> {
    let end = offset + 4;
    let window = bytes.get(offset..end).ok_or(CodecError::Truncated {
        needed: end,
        available: bytes.len(),
    })?;
    Ok(u32::from_be_bytes([window[0], window[1], window[2], window[3]]))
}

/// Encode text as raw UTF-8, no length prefix and no terminator
pub fn encode_text(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

/// Decode the whole slice as UTF-8
pub fn decode_text(bytes: &[u8]) -> Result<String, CodecError> {
    Ok(std::str::from_utf8(bytes)?.to_owned())
}

/// Accumulates bytes from read events and yields complete frames.
///
/// Frames with a fixed or counted layout are cut exactly, so they survive being
/// split across reads or coalesced with the next frame. Text frames have no
/// delimiter on the wire: they run to the end of what has been received so far,
/// and are held back while the payload is empty or ends in the middle of a UTF-8
/// sequence. A held text frame is closed off as it stands when the next read
/// starts with a server command code.
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_size: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            max_frame_size,
        }
    }

    /// Append one read event and extract every frame that is now complete
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, CodecError> {
        let mut frames = Vec::new();
        if self.holds_text_frame() && starts_server_frame(chunk) {
            frames.push(self.flush());
        }

        self.buf.extend_from_slice(chunk);
        while let Some(frame) = self.decode()? {
            frames.push(frame);
        }

        if self.buf.len() > self.max_frame_size {
            return Err(CodecError::FrameTooLarge(self.buf.len(), self.max_frame_size));
        }

        Ok(frames)
    }

    /// Number of bytes waiting for the rest of their frame
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// The buffer holds a text frame waiting for more payload
    fn holds_text_frame(&self) -> bool {
        let Some(&code) = self.buf.first() else {
            return false;
        };
        match CommandCode::try_from(code).map(CommandCode::layout) {
            Ok(PayloadLayout::Text) => true,
            Ok(PayloadLayout::Uint32Text) => self.buf.len() >= 5,
            _ => false,
        }
    }

    /// Emit everything buffered as one frame
    fn flush(&mut self) -> Frame {
        let mut raw = self.buf.split();
        let code = raw[0];
        let payload = raw.split_off(1).freeze();
        Frame::new(code, payload)
    }

    fn decode(&mut self) -> Result<Option<Frame>, CodecError> {
        let Some(&code) = self.buf.first() else {
            return Ok(None);
        };

        let Some(len) = self.frame_len(code)? else {
            return Ok(None);
        };

        let mut raw = self.buf.split_to(len);
        let payload = raw.split_off(1).freeze();
        Ok(Some(Frame::new(code, payload)))
    }

    /// Length of the frame at the front of the buffer, or None if more bytes are needed
    fn frame_len(&self, code: u8) -> Result<Option<usize>, CodecError> {
        let available = self.buf.len();
        let layout = match CommandCode::try_from(code) {
            Ok(code) => code.layout(),
            Err(_) => PayloadLayout::TrailingIgnored,
        };

        let len = match layout {
            PayloadLayout::Empty => Some(1),
            PayloadLayout::Uint32 => (available >= 5).then_some(5),
            PayloadLayout::Uint32List => {
                if available < 5 {
                    return Ok(None);
                }
                let count = decode_u32_at(&self.buf, 1)? as usize;
                let total = count
                    .checked_mul(4)
                    .and_then(|ids| ids.checked_add(5))
                    .unwrap_or(usize::MAX);
                if total > self.max_frame_size {
                    return Err(CodecError::FrameTooLarge(total, self.max_frame_size));
                }
                (available >= total).then_some(total)
            }
            PayloadLayout::Text => text_frame_len(&self.buf, 1),
            PayloadLayout::Uint32Text => {
                if available < 5 {
                    return Ok(None);
                }
                text_frame_len(&self.buf, 5).or(Some(available))
            }
            PayloadLayout::TrailingIgnored => Some(available),
        };

        Ok(len)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn starts_server_frame(chunk: &[u8]) -> bool {
    chunk
        .first()
        .and_then(|&code| CommandCode::try_from(code).ok())
        .is_some_and(|code| code.direction() != Direction::ToServer)
}

/// Text runs to the end of the buffer; wait while it is empty or cut mid-character
fn text_frame_len(buf: &[u8], header: usize) -> Option<usize> {
    let text = &buf[header..];
    if text.is_empty() {
        return None;
    }
    match std::str::from_utf8(text) {
        Err(e) if e.error_len().is_none() => None,
        _ => Some(buf.len()),
    }
}
