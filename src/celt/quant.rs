//! The band quantizer: predictive Laplace coding of band energies, a
//! simple quantized pitch gain, and a uniform scalar residual quantizer
//! whose per-coefficient bit depth is derived from each band's share of
//! the remaining byte budget.
//!
//! A real rate allocator (as in `rate.c`) balances bit allocation against a
//! psychoacoustic masking curve and variable per-band importance; that
//! model isn't part of this pipeline; the simplification here distributes
//! the budget evenly across bands, proportional to band width.

use crate::celt::mode::Mode;
use crate::math::{fast_exp2, fast_log2};
use crate::range_coder::{laplace_start_freq, RangeDecoder, RangeEncoder};
use crate::EncoderError;

/// Decay rate (Q14) used for the Laplace-coded energy deltas. Larger values
/// make the distribution flatter, i.e. more tolerant of big frame-to-frame
/// energy swings.
const ENERGY_DECAY: u32 = 6000;
/// Quantization step for log2-domain energy deltas: 1/8th of a bit.
const ENERGY_STEPS_PER_LOG2: f32 = 8.0;
/// Number of bits used for each quantized pitch gain.
const PITCH_GAIN_BITS: u32 = 5;

/// Encodes `band_e` as a one-step log-domain prediction from `old_band_e`,
/// and updates `old_band_e` to the quantized energies so that the decoder's
/// prediction history stays in lockstep.
pub(crate) fn quant_energy(
    enc: &mut RangeEncoder,
    band_e: &[f32],
    old_band_e: &mut [f32],
) -> Result<(), EncoderError> {
    let fs0 = laplace_start_freq(ENERGY_DECAY);
    for (e, old) in band_e.iter().zip(old_band_e.iter_mut()) {
        let cur_log = fast_log2(e.max(1e-10));
        let old_log = fast_log2(old.max(1e-10));
        let mut delta = ((cur_log - old_log) * ENERGY_STEPS_PER_LOG2).round() as i32;
        enc.encode_laplace(&mut delta, fs0, ENERGY_DECAY)?;
        let quant_log = old_log + delta as f32 / ENERGY_STEPS_PER_LOG2;
        *old = fast_exp2(quant_log);
    }
    Ok(())
}

/// Decodes the band energies encoded by [`quant_energy`], in the same
/// one-step log-domain prediction, updating `old_band_e` in place.
pub(crate) fn unquant_energy(dec: &mut RangeDecoder, old_band_e: &mut [f32]) -> Vec<f32> {
    let fs0 = laplace_start_freq(ENERGY_DECAY);
    let mut band_e = vec![0.0f32; old_band_e.len()];
    for (out, old) in band_e.iter_mut().zip(old_band_e.iter_mut()) {
        let old_log = fast_log2(old.max(1e-10));
        let delta = dec.decode_laplace(fs0, ENERGY_DECAY);
        let quant_log = old_log + delta as f32 / ENERGY_STEPS_PER_LOG2;
        let e = fast_exp2(quant_log);
        *out = e;
        *old = e;
    }
    band_e
}

/// Encodes whether the pitch predictor is used this frame, and if so, a
/// uniformly quantized gain per pitch band.
///
/// Returns whether the pitch predictor was used.
pub(crate) fn quant_pitch(enc: &mut RangeEncoder, gains: &[f32]) -> Result<bool, EncoderError> {
    let has_pitch = gains.iter().any(|&g| g > 0.01);
    enc.encode_bit_logp(u32::from(has_pitch), 1)?;
    if has_pitch {
        let levels = (1u32 << PITCH_GAIN_BITS) - 1;
        for &g in gains {
            let q = (g.clamp(0.0, 1.0) * levels as f32).round() as u32;
            enc.encode_bits(q.min(levels), PITCH_GAIN_BITS)?;
        }
    }
    Ok(has_pitch)
}

/// Decodes what [`quant_pitch`] encoded; returns whether the pitch
/// predictor was used, and the gains (all zero if it was not).
pub(crate) fn unquant_pitch(dec: &mut RangeDecoder, nb_p_bands: usize) -> (bool, Vec<f32>) {
    let has_pitch = dec.decode_bit_logp(1);
    let mut gains = vec![0.0f32; nb_p_bands];
    if has_pitch {
        let levels = (1u32 << PITCH_GAIN_BITS) - 1;
        for g in gains.iter_mut() {
            let q = dec.decode_bits(PITCH_GAIN_BITS);
            *g = q as f32 / levels as f32;
        }
    }
    (has_pitch, gains)
}

fn bits_per_coefficient(bits_per_band: u32, width: usize) -> u32 {
    (bits_per_band as usize / width.max(1)).clamp(1, 8) as u32
}

/// Quantizes `residual` (the normalized spectrum with the pitch prediction
/// already subtracted) band by band, spending `total_bits` spread evenly
/// across bands in proportion to band width.
pub(crate) fn quant_bands(
    mode: &Mode,
    residual: &[f32],
    total_bits: u32,
    enc: &mut RangeEncoder,
) -> Result<(), EncoderError> {
    let channels = mode.channels as usize;
    let frame_bins = mode.frame_bins();
    let nb_bands = mode.nb_e_bands;
    let bits_per_band = total_bits / nb_bands as u32;
    for b in 0..nb_bands {
        let lo = mode.e_band_bounds[b];
        let hi = mode.e_band_bounds[b + 1];
        let width = (hi - lo) * channels;
        let bits = bits_per_coefficient(bits_per_band, width);
        let levels = (1u32 << bits) - 1;
        for c in 0..channels {
            let base = c * frame_bins;
            for k in lo..hi {
                let v = residual[base + k].clamp(-1.0, 1.0);
                let q = (((v + 1.0) * 0.5) * levels as f32).round() as u32;
                enc.encode_bits(q.min(levels), bits)?;
            }
        }
    }
    Ok(())
}

/// Decodes the residual [`quant_bands`] encoded and merges it back onto the
/// predicted spectrum `p`, returning the reconstructed normalized spectrum.
pub(crate) fn unquant_bands(
    mode: &Mode,
    p: &[f32],
    total_bits: u32,
    dec: &mut RangeDecoder,
) -> Vec<f32> {
    let channels = mode.channels as usize;
    let frame_bins = mode.frame_bins();
    let nb_bands = mode.nb_e_bands;
    let bits_per_band = total_bits / nb_bands as u32;
    let mut x = p.to_vec();
    for b in 0..nb_bands {
        let lo = mode.e_band_bounds[b];
        let hi = mode.e_band_bounds[b + 1];
        let width = (hi - lo) * channels;
        let bits = bits_per_coefficient(bits_per_band, width);
        let levels = (1u32 << bits) - 1;
        for c in 0..channels {
            let base = c * frame_bins;
            for k in lo..hi {
                let q = dec.decode_bits(bits);
                let v = (q as f32 / levels as f32) * 2.0 - 1.0;
                x[base + k] += v;
            }
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Channels;

    #[test]
    fn test_energy_round_trips() {
        let mut buffer = vec![0u8; 4096];
        let mut old_enc = vec![1.0f32; 8];
        let mut old_dec = old_enc.clone();
        let band_e = vec![1.2f32, 0.8, 3.5, 0.1, 2.2, 9.0, 0.05, 1.0];

        let mut enc = RangeEncoder::new(&mut buffer);
        quant_energy(&mut enc, &band_e, &mut old_enc).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec = RangeDecoder::new(&buffer);
        let decoded = unquant_energy(&mut dec, &mut old_dec);

        for (a, b) in band_e.iter().zip(decoded.iter()) {
            assert!((a.ln() - b.ln()).abs() < 0.2, "{} vs {}", a, b);
        }
        for (a, b) in old_enc.iter().zip(old_dec.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_pitch_gain_round_trips() {
        let mut buffer = vec![0u8; 64];
        let gains = vec![0.5f32, 0.75, 0.1];

        let mut enc = RangeEncoder::new(&mut buffer);
        let has_pitch = quant_pitch(&mut enc, &gains).unwrap();
        enc.done().unwrap();
        drop(enc);
        assert!(has_pitch);

        let mut dec = RangeDecoder::new(&buffer);
        let (decoded_has_pitch, decoded_gains) = unquant_pitch(&mut dec, gains.len());
        assert!(decoded_has_pitch);
        for (a, b) in gains.iter().zip(decoded_gains.iter()) {
            assert!((a - b).abs() < 0.05, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_no_pitch_round_trips_to_zero_gains() {
        let mut buffer = vec![0u8; 64];
        let gains = vec![0.0f32, 0.0, 0.0];

        let mut enc = RangeEncoder::new(&mut buffer);
        let has_pitch = quant_pitch(&mut enc, &gains).unwrap();
        enc.done().unwrap();
        drop(enc);
        assert!(!has_pitch);

        let mut dec = RangeDecoder::new(&buffer);
        let (decoded_has_pitch, decoded_gains) = unquant_pitch(&mut dec, gains.len());
        assert!(!decoded_has_pitch);
        assert!(decoded_gains.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_bands_round_trip() {
        let mode = Mode::new(48000, Channels::Mono, 32, 2, 8, 4, 2).unwrap();
        let frame_bins = mode.frame_bins();
        let residual: Vec<f32> = (0..frame_bins).map(|i| ((i as f32 * 0.6).sin()) * 0.5).collect();
        let p = vec![0.0f32; frame_bins];

        let mut buffer = vec![0u8; 4096];
        let mut enc = RangeEncoder::new(&mut buffer);
        quant_bands(&mode, &residual, 2000, &mut enc).unwrap();
        enc.done().unwrap();
        drop(enc);

        let mut dec = RangeDecoder::new(&buffer);
        let x = unquant_bands(&mode, &p, 2000, &mut dec);

        for (a, b) in residual.iter().zip(x.iter()) {
            assert!((a - b).abs() < 0.2, "{} vs {}", a, b);
        }
    }
}
