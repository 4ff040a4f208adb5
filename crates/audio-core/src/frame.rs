//! Wire framing for the carrier media stream
//!
//! The carrier expects μ-law audio in fixed 20 ms frames: 160 bytes at
//! 8000 Hz mono. [`FrameChunker`] accumulates encoded bytes from arbitrary
//! upstream chunk boundaries and yields exactly-sized frames; the final
//! partial frame is padded out with μ-law silence on flush.

use std::collections::VecDeque;
use std::time::Duration;

use crate::mulaw::MULAW_SILENCE;

/// Sample rate of the telephony wire format, in Hz
pub const WIRE_SAMPLE_RATE: u32 = 8000;

/// Size of one outbound wire frame in bytes (one byte per μ-law sample)
pub const FRAME_BYTES: usize = 160;

/// Nominal playback duration of one wire frame
pub const FRAME_DURATION: Duration = Duration::from_millis(20);

/// Re-chunks a μ-law byte stream into fixed-size wire frames.
#[derive(Debug, Default)]
pub struct FrameChunker {
    buffer: VecDeque<u8>,
}

impl FrameChunker {
    /// Create an empty chunker
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
        }
    }

    /// Append encoded bytes from an upstream chunk
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes.iter().copied());
    }

    /// Take the next complete 160-byte frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        if self.buffer.len() < FRAME_BYTES {
            return None;
        }
        Some(self.buffer.drain(..FRAME_BYTES).collect())
    }

    /// Drain the trailing partial frame, padded to full size with silence.
    ///
    /// Returns `None` when no bytes are pending.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            return None;
        }
        let mut frame: Vec<u8> = self.buffer.drain(..).collect();
        frame.resize(FRAME_BYTES, MULAW_SILENCE);
        Some(frame)
    }

    /// Number of bytes currently buffered
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
