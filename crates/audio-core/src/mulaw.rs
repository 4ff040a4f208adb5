//! G.711 μ-law transcoding
//!
//! Bit-exact companding between 16-bit linear PCM and the 8-bit μ-law wire
//! format used on the telephony media stream. Encode: sign bit, clamp the
//! magnitude to [`MULAW_CLIP`], add the [`MULAW_BIAS`], locate the exponent as
//! the highest set bit of the biased magnitude (bit 14 down, floor 0), take
//! the 4 mantissa bits below it, and emit the ones'-complement of the packed
//! codeword. Decode reverses the complement and expands the segment.

/// Companding bias added to the magnitude before the exponent search
pub const MULAW_BIAS: i32 = 0x84;

/// Maximum linear magnitude representable after companding
pub const MULAW_CLIP: i32 = 32635;

/// μ-law encoding of a zero sample (digital silence)
pub const MULAW_SILENCE: u8 = 0xFF;

/// Encode one 16-bit linear PCM sample to μ-law.
pub fn encode_mulaw(sample: i16) -> u8 {
    let mut pcm = sample as i32;

    let sign: u8 = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0
    };

    if pcm > MULAW_CLIP {
        pcm = MULAW_CLIP;
    }
    pcm += MULAW_BIAS;

    // Highest set bit between 14 and 7 selects the segment.
    let mut exponent: u8 = 7;
    let mut mask = 0x4000;
    while pcm & mask == 0 && exponent > 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = ((pcm >> (exponent + 3)) & 0x0F) as u8;
    !(sign | (exponent << 4) | mantissa)
}

/// Decode one μ-law byte to a 16-bit linear PCM sample.
pub fn decode_mulaw(byte: u8) -> i16 {
    let codeword = !byte;
    let sign = codeword & 0x80;
    let exponent = (codeword >> 4) & 0x07;
    let mantissa = (codeword & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;

    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Encode a slice of PCM samples to μ-law bytes.
pub fn encode_mulaw_slice(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode_mulaw(s)).collect()
}

/// Decode a slice of μ-law bytes to PCM samples.
pub fn decode_mulaw_slice(bytes: &[u8]) -> Vec<i16> {
    bytes.iter().map(|&b| decode_mulaw(b)).collect()
}
