//! Audio primitives for the switchboard telephony bridge.
//!
//! Everything a live call needs to move audio between the carrier wire format
//! and the speech vendors:
//!
//! - [`mulaw`]: bit-exact G.711 μ-law encode/decode (the telephony wire codec)
//! - [`frame`]: 20 ms / 160-byte wire framing and the [`frame::FrameChunker`]
//! - [`resample`]: normalization of vendor PCM down to the 8 kHz wire rate
//! - [`wav`]: the 44-byte PCM WAV container handed to the recognizer
//!
//! All PCM in this crate is 16-bit signed little-endian mono.

pub mod error;
pub mod frame;
pub mod mulaw;
pub mod resample;
pub mod wav;

pub use error::{AudioError, AudioResult};
pub use frame::{FrameChunker, FRAME_BYTES, FRAME_DURATION, WIRE_SAMPLE_RATE};
pub use mulaw::{decode_mulaw, decode_mulaw_slice, encode_mulaw, encode_mulaw_slice, MULAW_SILENCE};
pub use resample::{Downsampler, SampleAssembler};
pub use wav::wav_container;
