//! Vendor PCM normalization
//!
//! Speech vendors synthesize PCM16 at their own native rate (typically
//! 24 kHz) and deliver it in arbitrary byte chunks over a streaming body.
//! Before the wire codec sees it, the stream has to become whole samples at
//! the 8 kHz wire rate — without losing phase at chunk boundaries.
//!
//! [`SampleAssembler`] carries the split byte of an odd-length chunk across
//! calls; [`Downsampler`] keeps the fractional read position and the previous
//! sample so linear interpolation stays continuous from one chunk to the
//! next.

use crate::error::{AudioError, AudioResult};

/// Reassembles 16-bit little-endian samples from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct SampleAssembler {
    carry: Option<u8>,
}

impl SampleAssembler {
    pub fn new() -> Self {
        Self { carry: None }
    }

    /// Convert a byte chunk into samples, carrying any trailing half-sample.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<i16> {
        if chunk.is_empty() {
            return Vec::new();
        }

        let mut bytes: Vec<u8>;
        let data: &[u8] = match self.carry.take() {
            Some(first) => {
                bytes = Vec::with_capacity(chunk.len() + 1);
                bytes.push(first);
                bytes.extend_from_slice(chunk);
                &bytes
            }
            None => chunk,
        };

        let mut samples = Vec::with_capacity(data.len() / 2);
        let mut iter = data.chunks_exact(2);
        for pair in &mut iter {
            samples.push(i16::from_le_bytes([pair[0], pair[1]]));
        }
        if let [last] = iter.remainder() {
            self.carry = Some(*last);
        }
        samples
    }
}

/// Stateful linear-interpolation rate converter (downsampling only).
#[derive(Debug)]
pub struct Downsampler {
    /// Input samples consumed per output sample
    step: f64,
    /// Fractional read position into the virtual input stream
    position: f64,
    /// Last sample of the previous chunk, for boundary interpolation
    previous: Option<i16>,
}

impl Downsampler {
    /// Create a converter from `input_rate` down to `output_rate`.
    pub fn new(input_rate: u32, output_rate: u32) -> AudioResult<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(AudioError::invalid_configuration("sample rates must be non-zero"));
        }
        if output_rate > input_rate {
            return Err(AudioError::UnsupportedRateConversion {
                input_rate,
                output_rate,
                reason: "upsampling is not supported".to_string(),
            });
        }
        Ok(Self {
            step: input_rate as f64 / output_rate as f64,
            position: 0.0,
            previous: None,
        })
    }

    /// Convert one chunk of input samples, preserving phase across calls.
    pub fn process(&mut self, input: &[i16]) -> Vec<i16> {
        if input.is_empty() {
            return Vec::new();
        }

        // The virtual stream is the carried sample (if any) followed by this
        // chunk; interpolation never reads past its last sample.
        let carried = self.previous;
        let total = input.len() + carried.is_some() as usize;
        let sample_at = |index: usize| -> f64 {
            match carried {
                Some(prev) if index == 0 => prev as f64,
                Some(_) => input[index - 1] as f64,
                None => input[index] as f64,
            }
        };

        let mut out = Vec::with_capacity((input.len() as f64 / self.step) as usize + 1);
        while (self.position.floor() as usize) + 1 < total {
            let index = self.position.floor() as usize;
            let frac = self.position - index as f64;
            let s0 = sample_at(index);
            let s1 = sample_at(index + 1);
            out.push((s0 + (s1 - s0) * frac).round() as i16);
            self.position += self.step;
        }

        self.previous = Some(input[input.len() - 1]);
        self.position -= (total - 1) as f64;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembler_pairs_bytes_little_endian() {
        let mut assembler = SampleAssembler::new();
        let samples = assembler.push(&[0x02, 0x01, 0xFE, 0xFF]);
        assert_eq!(samples, vec![0x0102, -2]);
    }

    #[test]
    fn assembler_carries_split_byte() {
        let mut assembler = SampleAssembler::new();
        assert_eq!(assembler.push(&[0x02]), vec![]);
        assert_eq!(assembler.push(&[0x01, 0xFE]), vec![0x0102]);
        assert_eq!(assembler.push(&[0xFF]), vec![-2]);
    }

    #[test]
    fn downsampler_rejects_upsampling() {
        assert!(Downsampler::new(8000, 24000).is_err());
        assert!(Downsampler::new(0, 8000).is_err());
    }

    #[test]
    fn downsampler_3to1_ratio() {
        let mut down = Downsampler::new(24000, 8000).unwrap();
        let input: Vec<i16> = (0..3000).map(|i| (i % 100) as i16).collect();
        let out = down.process(&input);
        // One output per three inputs, give or take the carried boundary.
        assert!((out.len() as i64 - 1000).abs() <= 1, "got {}", out.len());
    }

    #[test]
    fn downsampler_integer_positions_pass_through() {
        // With an exact 3:1 ratio the read position stays integral, so
        // outputs are exact input samples.
        let mut down = Downsampler::new(24000, 8000).unwrap();
        let input: Vec<i16> = (0..30).collect();
        let out = down.process(&input);
        assert_eq!(out, vec![0, 3, 6, 9, 12, 15, 18, 21, 24, 27]);
    }

    #[test]
    fn downsampler_is_continuous_across_chunks() {
        let input: Vec<i16> = (0..6000).map(|i| ((i * 7) % 2048 - 1024) as i16).collect();

        let mut whole = Downsampler::new(24000, 8000).unwrap();
        let expected = whole.process(&input);

        let mut split = Downsampler::new(24000, 8000).unwrap();
        let mut actual = Vec::new();
        // Uneven chunk sizes exercise the carried-sample path.
        for chunk in input.chunks(77) {
            actual.extend(split.process(chunk));
        }

        assert_eq!(actual.len(), expected.len());
        assert_eq!(actual, expected);
    }

    #[test]
    fn downsampler_interpolates_fractional_positions() {
        // 4:3 ratio forces fractional positions between known samples.
        let mut down = Downsampler::new(8000, 6000).unwrap();
        let out = down.process(&[0, 300, 600, 900, 1200, 1500]);
        assert_eq!(out[0], 0);
        // Position 4/3 between 300 and 600.
        assert_eq!(out[1], 400);
        // Position 8/3 between 600 and 900.
        assert_eq!(out[2], 800);
    }
}
