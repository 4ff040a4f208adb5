//! Recognizer container framing
//!
//! The speech recognizer takes a standard 44-byte RIFF/WAVE header followed
//! by raw PCM16 payload: mono, 8000 Hz, 16 bits per sample, byte rate 16000,
//! block align 2. Size fields are computed from the payload length.

use crate::frame::WIRE_SAMPLE_RATE;

const HEADER_LEN: usize = 44;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Wrap decoded PCM16 samples in a WAV container for the recognizer.
pub fn wav_container(samples: &[i16]) -> Vec<u8> {
    let payload_len = samples.len() * 2;
    let byte_rate = WIRE_SAMPLE_RATE * CHANNELS as u32 * BITS_PER_SAMPLE as u32 / 8;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;

    let mut out = Vec::with_capacity(HEADER_LEN + payload_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + payload_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&WIRE_SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(payload_len as u32).to_le_bytes());

    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(buf: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn header_fields_for_payload_length() {
        let samples = vec![0i16; 123];
        let payload_len = samples.len() * 2;
        let wav = wav_container(&samples);

        assert_eq!(wav.len(), HEADER_LEN + payload_len);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), (36 + payload_len) as u32);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1); // PCM
        assert_eq!(u16_at(&wav, 22), 1); // mono
        assert_eq!(u32_at(&wav, 24), 8000);
        assert_eq!(u32_at(&wav, 28), 16000); // byte rate
        assert_eq!(u16_at(&wav, 32), 2); // block align
        assert_eq!(u16_at(&wav, 34), 16); // bits per sample
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), payload_len as u32);
    }

    #[test]
    fn payload_is_little_endian_pcm() {
        let wav = wav_container(&[0x0102i16, -2]);
        assert_eq!(&wav[44..], &[0x02, 0x01, 0xFE, 0xFF]);
    }

    #[test]
    fn empty_payload_is_header_only() {
        let wav = wav_container(&[]);
        assert_eq!(wav.len(), HEADER_LEN);
        assert_eq!(u32_at(&wav, 4), 36);
        assert_eq!(u32_at(&wav, 40), 0);
    }
}
