//! Mixing and PCM conversion kernel.
//!
//! Pure functions over sample data: gain scaling, accumulation of
//! layered buffers, peak normalization, and the single float-to-PCM
//! conversion point shared by every playback path.

use crate::sample::SampleBuffer;

/// Full-scale value for 16-bit PCM output.
const PCM_FULL_SCALE: f32 = 32_767.0;

/// Returns a scaled duplicate of the buffer's samples.
///
/// The stored buffer is never mutated; gain is applied to a copy.
pub(crate) fn apply_gain(samples: &[f32], gain: f32) -> Vec<f32> {
    samples.iter().map(|s| s * gain).collect()
}

/// Mixes the given buffers into a single normalized accumulator.
///
/// The accumulator spans the longest referenced buffer; shorter buffers
/// stop contributing past their own end. After accumulation the result
/// is peak-normalized so constructive overlap cannot clip.
pub(crate) fn mix(buffers: &[(SampleBuffer, f32)]) -> Vec<f32> {
    let max_len = buffers.iter().map(|(buffer, _)| buffer.len()).max().unwrap_or(0);
    let mut accumulator = vec![0.0f32; max_len];

    for (buffer, gain) in buffers {
        for (slot, sample) in accumulator.iter_mut().zip(buffer.samples()) {
            *slot += sample * gain;
        }
    }

    normalize_peak(&mut accumulator);
    accumulator
}

/// Scales the buffer down so its peak lands exactly at unity.
///
/// A peak at or below 1.0 is left untouched; relative balance between
/// layered sounds is preserved either way.
pub(crate) fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |max, s| max.max(s.abs()));
    if peak > 1.0 {
        let scale = 1.0 / peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Converts normalized floats to the device's signed 16-bit format.
///
/// Each sample is clipped to [-1.0, 1.0], scaled by 32767, and
/// truncated toward zero. No dithering and no rounding, so output is
/// bit-for-bit reproducible.
pub(crate) fn to_pcm(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * PCM_FULL_SCALE) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(samples: Vec<f32>) -> SampleBuffer {
        SampleBuffer::new(samples, 44_100)
    }

    #[test]
    fn test_conversion_truncates() {
        let pcm = to_pcm(&[0.5, -0.5, 0.0, 1.0, -1.0]);
        assert_eq!(pcm, vec![16_383, -16_383, 0, 32_767, -32_767]);
    }

    #[test]
    fn test_conversion_clips_out_of_range() {
        let pcm = to_pcm(&[1.5, -2.0]);
        assert_eq!(pcm, vec![32_767, -32_767]);
    }

    #[test]
    fn test_apply_gain_halves_samples() {
        let scaled = apply_gain(&[0.8, -0.4, 0.2], 0.5);
        assert_eq!(scaled, vec![0.4, -0.2, 0.1]);
    }

    #[test]
    fn test_apply_gain_leaves_source_untouched() {
        let source = buffer(vec![0.8, -0.4]);
        let _ = apply_gain(source.samples(), 0.25);
        assert_eq!(source.samples(), &[0.8, -0.4]);
    }

    #[test]
    fn test_mix_spans_longest_buffer() {
        let mixed = mix(&[(buffer(vec![0.1, 0.1, 0.1, 0.1]), 1.0), (buffer(vec![0.2]), 1.0)]);

        assert_eq!(mixed.len(), 4);
        assert!((mixed[0] - 0.3).abs() < 1e-6);
        // The shorter buffer stops contributing past its own end.
        assert!((mixed[1] - 0.1).abs() < 1e-6);
        assert!((mixed[3] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_mix_applies_per_buffer_gain() {
        let mixed = mix(&[(buffer(vec![0.8]), 0.5), (buffer(vec![0.4]), 0.25)]);
        assert!((mixed[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mix_empty_is_empty() {
        assert!(mix(&[]).is_empty());
    }

    #[test]
    fn test_normalize_scales_peak_to_unity() {
        let mut samples = vec![1.6, -0.4, 0.8];
        normalize_peak(&mut samples);

        assert!((samples[0] - 1.0).abs() < 1e-6);
        assert!((samples[1] - (-0.25)).abs() < 1e-6);
        assert!((samples[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_leaves_subunity_untouched() {
        let mut samples = vec![0.9, -0.3];
        normalize_peak(&mut samples);
        assert_eq!(samples, vec![0.9, -0.3]);
    }

    #[test]
    fn test_normalize_handles_negative_peak() {
        let mut samples = vec![0.5, -2.0];
        normalize_peak(&mut samples);

        assert!((samples[0] - 0.25).abs() < 1e-6);
        assert!((samples[1] - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_output_never_exceeds_unity() {
        let mixed = mix(&[
            (buffer(vec![0.9, 0.9]), 1.0),
            (buffer(vec![0.9, -0.9]), 1.0),
            (buffer(vec![0.9]), 1.0),
        ]);

        assert!(mixed.iter().all(|s| s.abs() <= 1.0 + f32::EPSILON));
    }
}
