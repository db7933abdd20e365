//! The band processor: per-band energy extraction, normalization, the
//! stereo mid/side-style rotation, and the pitch-gain vector used to scale
//! the predicted spectrum before the residual is quantized.

use crate::celt::mode::Mode;
use crate::math::fast_atan2;
use crate::Channels;

/// Frequency-domain coefficients and band energies are both laid out as
/// `channels` contiguous blocks of `mode.frame_bins()` values: channel `c`
/// occupies `buf[c*frame_bins .. (c+1)*frame_bins]` (coefficients) or
/// `buf[c*nb_e_bands .. (c+1)*nb_e_bands]` (band energies).

/// Computes the per-band, per-channel energy (L2 norm) of `freq`.
pub(crate) fn compute_band_energies(mode: &Mode, freq: &[f32]) -> Vec<f32> {
    let channels = mode.channels as usize;
    let frame_bins = mode.frame_bins();
    let mut band_e = vec![0.0f32; channels * mode.nb_e_bands];
    for c in 0..channels {
        let chan = &freq[c * frame_bins..(c + 1) * frame_bins];
        for b in 0..mode.nb_e_bands {
            let lo = mode.e_band_bounds[b];
            let hi = mode.e_band_bounds[b + 1];
            let sum: f32 = chan[lo..hi].iter().map(|x| x * x).sum();
            band_e[c * mode.nb_e_bands + b] = (sum + 1e-15).sqrt();
        }
    }
    band_e
}

/// Divides every coefficient by its band's energy, producing a spectrum
/// whose per-band L2 norm is (approximately) 1.
pub(crate) fn normalise_bands(mode: &Mode, freq: &[f32], band_e: &[f32]) -> Vec<f32> {
    let channels = mode.channels as usize;
    let frame_bins = mode.frame_bins();
    let mut out = vec![0.0f32; channels * frame_bins];
    for c in 0..channels {
        for b in 0..mode.nb_e_bands {
            let lo = mode.e_band_bounds[b];
            let hi = mode.e_band_bounds[b + 1];
            let e = band_e[c * mode.nb_e_bands + b].max(1e-10);
            for k in lo..hi {
                out[c * frame_bins + k] = freq[c * frame_bins + k] / e;
            }
        }
    }
    out
}

/// The inverse of [`normalise_bands`]: rescales a unit-norm spectrum back
/// up by the band energies.
pub(crate) fn denormalise_bands(mode: &Mode, norm: &[f32], band_e: &[f32]) -> Vec<f32> {
    let channels = mode.channels as usize;
    let frame_bins = mode.frame_bins();
    let mut out = vec![0.0f32; channels * frame_bins];
    for c in 0..channels {
        for b in 0..mode.nb_e_bands {
            let lo = mode.e_band_bounds[b];
            let hi = mode.e_band_bounds[b + 1];
            let e = band_e[c * mode.nb_e_bands + b];
            for k in lo..hi {
                out[c * frame_bins + k] = norm[c * frame_bins + k] * e;
            }
        }
    }
    out
}

/// Rescales every band of `x` back to unit L2 norm in place.
///
/// Used after the stereo unmix, which does not itself preserve per-band
/// norm once the residual has been merged back in.
pub(crate) fn renormalise_bands(mode: &Mode, x: &mut [f32]) {
    let channels = mode.channels as usize;
    let frame_bins = mode.frame_bins();
    for c in 0..channels {
        for b in 0..mode.nb_e_bands {
            let lo = mode.e_band_bounds[b];
            let hi = mode.e_band_bounds[b + 1];
            let base = c * frame_bins;
            let norm: f32 = x[base + lo..base + hi]
                .iter()
                .map(|v| v * v)
                .sum::<f32>()
                .sqrt();
            if norm > 1e-10 {
                for k in lo..hi {
                    x[base + k] /= norm;
                }
            }
        }
    }
}

/// Rotates the left/right channels of a normalized stereo spectrum by a
/// per-band angle derived from the ratio of their energies.
///
/// `sign >= 0` performs the forward (encoder-side) rotation into a
/// mid/side-like basis; `sign < 0` performs the inverse rotation. The
/// rotation is orthogonal, so applying it and then its inverse restores
/// the original spectrum exactly (up to floating-point rounding).
pub(crate) fn stereo_mix(mode: &Mode, x: &mut [f32], band_e: &[f32], sign: i32) {
    if mode.channels != Channels::Stereo {
        return;
    }
    let frame_bins = mode.frame_bins();
    let nb = mode.nb_e_bands;
    for b in 0..nb {
        let lo = mode.e_band_bounds[b];
        let hi = mode.e_band_bounds[b + 1];
        let el = band_e[b];
        let er = band_e[nb + b];
        let angle = fast_atan2(el, er);
        let (s, c) = (angle.sin(), angle.cos());
        for k in lo..hi {
            let l = x[k];
            let r = x[frame_bins + k];
            if sign >= 0 {
                x[k] = l * c + r * s;
                x[frame_bins + k] = -l * s + r * c;
            } else {
                x[k] = l * c - r * s;
                x[frame_bins + k] = l * s + r * c;
            }
        }
    }
}

/// Computes a per-pitch-band gain minimizing `|X - gain*P|^2`, clamped to
/// `[0, 1]` (the predictor is never allowed to add energy).
pub(crate) fn compute_pitch_gain(mode: &Mode, x: &[f32], p: &[f32]) -> Vec<f32> {
    let channels = mode.channels as usize;
    let frame_bins = mode.frame_bins();
    let mut gains = vec![0.0f32; mode.nb_p_bands];
    for b in 0..mode.nb_p_bands {
        let lo = mode.p_band_bounds[b];
        let hi = mode.p_band_bounds[b + 1];
        let mut num = 0.0f32;
        let mut den = 0.0f32;
        for c in 0..channels {
            let base = c * frame_bins;
            for k in lo..hi {
                num += x[base + k] * p[base + k];
                den += p[base + k] * p[base + k];
            }
        }
        gains[b] = (num / (den + 1e-10)).clamp(0.0, 1.0);
    }
    gains
}

/// Scales the predicted spectrum `p` band-by-band by `gains`, in place.
pub(crate) fn pitch_quant_bands(mode: &Mode, p: &mut [f32], gains: &[f32]) {
    let channels = mode.channels as usize;
    let frame_bins = mode.frame_bins();
    for b in 0..mode.nb_p_bands {
        let lo = mode.p_band_bounds[b];
        let hi = mode.p_band_bounds[b + 1];
        let g = gains[b];
        for c in 0..channels {
            let base = c * frame_bins;
            for k in lo..hi {
                p[base + k] *= g;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_mode() -> Mode {
        Mode::new(48000, Channels::Stereo, 32, 2, 8, 4, 2).unwrap()
    }

    #[test]
    fn test_normalise_bands_are_unit_norm() {
        let mode = stereo_mode();
        let frame_bins = mode.frame_bins();
        let freq: Vec<f32> = (0..2 * frame_bins).map(|i| (i as f32 * 0.21).sin() * 5.0).collect();
        let band_e = compute_band_energies(&mode, &freq);
        let x = normalise_bands(&mode, &freq, &band_e);

        for c in 0..2 {
            for b in 0..mode.nb_e_bands {
                let lo = mode.e_band_bounds[b];
                let hi = mode.e_band_bounds[b + 1];
                let base = c * frame_bins;
                let norm: f32 = x[base + lo..base + hi].iter().map(|v| v * v).sum::<f32>().sqrt();
                assert!((norm - 1.0).abs() < 1e-3, "band {} norm {}", b, norm);
            }
        }
    }

    #[test]
    fn test_normalise_denormalise_round_trip() {
        let mode = stereo_mode();
        let frame_bins = mode.frame_bins();
        let freq: Vec<f32> = (0..2 * frame_bins).map(|i| (i as f32 * 0.37).cos() * 3.0).collect();
        let band_e = compute_band_energies(&mode, &freq);
        let x = normalise_bands(&mode, &freq, &band_e);
        let reconstructed = denormalise_bands(&mode, &x, &band_e);

        for (a, b) in freq.iter().zip(reconstructed.iter()) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_stereo_mix_preserves_energy_and_is_invertible() {
        let mode = stereo_mode();
        let frame_bins = mode.frame_bins();
        let freq: Vec<f32> = (0..2 * frame_bins).map(|i| (i as f32 * 0.11).sin()).collect();
        let band_e = compute_band_energies(&mode, &freq);
        let mut x = normalise_bands(&mode, &freq, &band_e);

        let energy_before: f32 = x.iter().map(|v| v * v).sum();
        stereo_mix(&mode, &mut x, &band_e, 1);
        let energy_after_forward: f32 = x.iter().map(|v| v * v).sum();
        assert!((energy_before - energy_after_forward).abs() < 1e-3);

        stereo_mix(&mode, &mut x, &band_e, -1);
        let energy_after_inverse: f32 = x.iter().map(|v| v * v).sum();
        assert!((energy_before - energy_after_inverse).abs() < 1e-3);
    }
}
