//! Frame-level plumbing shared by the encoder and decoder: the sine-sine
//! (Princen-Bradley) analysis/synthesis window, the multi-block windowed
//! MDCT/inverse-MDCT, and the synthesis-history shift that keeps the
//! pitch analyzer's search buffer current.

use std::f32::consts::PI;

use crate::celt::Mdct;

/// Builds a `2*n`-sample sine-sine window: unity in the non-overlapping
/// center, and a `sin(pi/2 * sin^2(...))` taper over the `overlap` samples
/// at each edge. This is the window shape required for perfect
/// reconstruction under 50%-overlap MDCT analysis/synthesis (the
/// Princen-Bradley condition).
pub(crate) fn build_window(n: usize, overlap: usize) -> Vec<f32> {
    let n4 = (n - overlap) / 2;
    let mut window = vec![0.0f32; 2 * n];
    for i in 0..overlap {
        let s = (0.5 * PI * (i as f32 + 0.5) / overlap as f32).sin();
        window[n4 + i] = (0.5 * PI * s * s).sin();
        window[2 * n - n4 - i - 1] = window[n4 + i];
    }
    for w in window.iter_mut().skip(n - n4).take(2 * n4) {
        *w = 1.0;
    }
    window
}

/// Runs `b` windowed MDCT blocks of size `n` over `channels` contiguous
/// per-channel segments of `input` (each `(b+1)*n` samples, consecutive
/// blocks overlapping by `n` samples), writing `b*n` coefficients per
/// channel into the returned buffer (channel-major, same layout as
/// [`crate::celt::bands`]).
///
/// Returns the coefficients together with the total windowed energy
/// across every block and channel, which the pitch analyzer's gating rule
/// compares against the pitch segment's windowed energy.
pub(crate) fn compute_mdcts(
    mdct: &Mdct,
    window: &[f32],
    input: &[f32],
    channels: usize,
    frame_bins: usize,
    n: usize,
    b: usize,
) -> (Vec<f32>, f32) {
    let seg_len = (b + 1) * n;
    debug_assert_eq!(input.len(), channels * seg_len);
    debug_assert_eq!(window.len(), 2 * n);

    let mut freq = vec![0.0f32; channels * frame_bins];
    let mut energy = 1e-15f32;
    let mut windowed = vec![0.0f32; 2 * n];
    let mut coeffs = vec![0.0f32; n];

    for c in 0..channels {
        let seg = &input[c * seg_len..(c + 1) * seg_len];
        for blk in 0..b {
            for j in 0..2 * n {
                let v = window[j] * seg[blk * n + j];
                windowed[j] = v;
                energy += v * v;
            }
            mdct.forward(&windowed, &mut coeffs);
            freq[c * frame_bins + blk * n..c * frame_bins + (blk + 1) * n].copy_from_slice(&coeffs);
        }
    }
    (freq, energy)
}

/// The adjoint of [`compute_mdcts`]: windows and overlap-adds `b` inverse
/// MDCT blocks back into the tail `b*n` samples (per channel) of
/// `out_mem`, carrying the trailing `overlap` samples of each block into
/// `mdct_overlap` for the next call.
///
/// `out_mem` must already have had its tail `b*n` samples (per channel)
/// vacated by [`shift_history`].
#[allow(clippy::too_many_arguments)]
pub(crate) fn compute_inv_mdcts(
    mdct: &Mdct,
    window: &[f32],
    freq: &[f32],
    out_mem: &mut [f32],
    mdct_overlap: &mut [f32],
    channels: usize,
    frame_bins: usize,
    n: usize,
    b: usize,
    overlap: usize,
    max_period: usize,
) {
    let n4 = (n - overlap) / 2;
    let mut coeffs = vec![0.0f32; n];
    let mut windowed = vec![0.0f32; 2 * n];

    for c in 0..channels {
        let out_base = c * max_period;
        let ov_base = c * overlap;
        for blk in 0..b {
            coeffs.copy_from_slice(&freq[c * frame_bins + blk * n..c * frame_bins + (blk + 1) * n]);
            mdct.backward(&coeffs, &mut windowed);
            for j in 0..2 * n {
                windowed[j] *= window[j];
            }

            let write_base = out_base + max_period - b * n + blk * n;
            for j in 0..overlap {
                out_mem[write_base + j] = windowed[n4 + j] + mdct_overlap[ov_base + j];
            }
            for j in 0..2 * n4 {
                out_mem[write_base + overlap + j] = windowed[n4 + overlap + j];
            }
            for j in 0..overlap {
                mdct_overlap[ov_base + j] = windowed[n + n4 + j];
            }
        }
    }
}

/// Shifts each channel's synthesis-history buffer left by `shift` samples,
/// vacating the tail for the next [`compute_inv_mdcts`] call.
pub(crate) fn shift_history(out_mem: &mut [f32], channels: usize, max_period: usize, shift: usize) {
    for c in 0..channels {
        let base = c * max_period;
        out_mem.copy_within(base + shift..base + max_period, base);
        for v in out_mem[base + max_period - shift..base + max_period].iter_mut() {
            *v = 0.0;
        }
    }
}
