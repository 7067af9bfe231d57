//! Multipart message framing.
//!
//! Every message on the daemon sockets is a sequence of byte frames,
//! encoded as one count byte followed by each frame as a 4 byte
//! big-endian length and its bytes. Message boundaries are preserved:
//! one event is one message, one command request is one message, one
//! reply is one message.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound on a single frame. A length prefix above this is treated
/// as stream corruption rather than a frame to buffer.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// One message: zero or more byte frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    pub frames: Vec<Bytes>,
}

impl Multipart {
    pub fn new(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    /// A `[topic, payload]` message, the shape used for commands and events.
    pub fn tagged(topic: &str, payload: Bytes) -> Self {
        Self {
            frames: vec![Bytes::copy_from_slice(topic.as_bytes()), payload],
        }
    }

    /// Consume the message and return its first frame, empty if there is none.
    pub fn into_first(self) -> Bytes {
        self.frames.into_iter().next().unwrap_or_default()
    }
}

/// Codec for multipart messages over a byte stream.
#[derive(Debug, Default)]
pub struct MultipartCodec;

impl Decoder for MultipartCodec {
    type Item = Multipart;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(Option::None);
        }

        // First byte is the frame count, then each frame is a 4 byte
        // big-endian length and that many bytes. Walk the lengths without
        // consuming anything until the whole message has arrived.
        let count = src[0] as usize;
        let mut lengths = Vec::with_capacity(count);
        let mut offset = 1;

        for _ in 0..count {
            if src.len() < offset + 4 {
                return Ok(Option::None);
            }
            let length = u32::from_be_bytes([
                src[offset],
                src[offset + 1],
                src[offset + 2],
                src[offset + 3],
            ]) as usize;
            if length > MAX_FRAME_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame of {} bytes exceeds the {} byte cap", length, MAX_FRAME_LEN),
                ));
            }
            lengths.push(length);
            offset += 4 + length;
        }

        if src.len() < offset {
            return Ok(Option::None);
        }

        src.advance(1);
        let mut frames = Vec::with_capacity(count);
        for length in lengths {
            src.advance(4);
            frames.push(src.split_to(length).freeze());
        }

        Ok(Some(Multipart { frames }))
    }
}

impl Encoder<Multipart> for MultipartCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Multipart, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.frames.len() > u8::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("message of {} frames exceeds the frame count byte", item.frames.len()),
            ));
        }
        if let Some(oversized) = item.frames.iter().find(|frame| frame.len() > MAX_FRAME_LEN) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes exceeds the {} byte cap", oversized.len(), MAX_FRAME_LEN),
            ));
        }

        let total: usize = item.frames.iter().map(|frame| 4 + frame.len()).sum();
        dst.reserve(1 + total);

        dst.put_u8(item.frames.len() as u8);
        for frame in &item.frames {
            dst.put_u32(frame.len() as u32);
            dst.put_slice(frame);
        }

        Ok(())
    }
}
