//! Linear-prediction utilities used for the floating-point profile's
//! packet-loss concealment: autocorrelation, Levinson-Durbin recursion, and
//! the FIR/IIR filters built from the resulting coefficients.
//!
//! These mirror the fixed-point routines in the original reference
//! implementation's `plc.c`, with the `#ifdef FIXED_POINT` rescaling
//! branches dropped since only the floating-point profile is implemented
//! here.

/// Windowed autocorrelation of `x` up to `lag`, with the first `overlap`
/// and last `overlap` samples tapered by `window` and a small noise floor
/// added to `ac[0]` to keep the Levinson-Durbin recursion well-conditioned.
pub(crate) fn autocorr(x: &[f32], window: &[f32], overlap: usize, lag: usize) -> Vec<f32> {
    let n = x.len();
    let mut tapered = x.to_vec();
    let taper_len = overlap.min(n);
    for i in 0..taper_len {
        tapered[i] *= window[i];
        tapered[n - i - 1] *= window[i];
    }

    let mut ac = vec![0.0f32; lag + 1];
    for l in 0..=lag {
        let mut sum = 0.0f32;
        for i in l..n {
            sum += tapered[i] * tapered[i - l];
        }
        ac[l] = sum;
    }
    ac[0] += 10.0;
    ac
}

/// Levinson-Durbin recursion: derives `order` LPC coefficients from an
/// autocorrelation sequence `ac` (of length `order + 1`).
pub(crate) fn lpc(ac: &[f32], order: usize) -> Vec<f32> {
    debug_assert!(ac.len() >= order + 1);
    let mut coeffs = vec![0.0f32; order];
    let mut error = ac[0];
    if ac[0] == 0.0 {
        return coeffs;
    }

    for i in 0..order {
        let mut rr = ac[i + 1];
        for j in 0..i {
            rr += coeffs[j] * ac[i - j];
        }
        let r = -rr / (error + 1e-15);
        coeffs[i] = r;

        let half = i / 2;
        for j in 0..half {
            let tmp1 = coeffs[j];
            let tmp2 = coeffs[i - 1 - j];
            coeffs[j] = tmp1 + r * tmp2;
            coeffs[i - 1 - j] = tmp2 + r * tmp1;
        }
        if i % 2 == 1 {
            coeffs[half] += r * coeffs[half];
        }

        error -= r * r * error;
        if error < 1e-5 * ac[0] {
            break;
        }
    }
    coeffs
}

/// An FIR filter: `y[i] = x[i] + sum_j num[j] * mem[j]`, with `mem` the
/// filter's shift-register state, updated in place across calls.
pub(crate) fn fir(x: &[f32], num: &[f32], mem: &mut [f32]) -> Vec<f32> {
    let order = num.len();
    let mut y = vec![0.0f32; x.len()];
    for (out, &xi) in y.iter_mut().zip(x.iter()) {
        let mut sum = xi;
        for j in 0..order {
            sum += num[j] * mem[j];
        }
        for j in (1..order).rev() {
            mem[j] = mem[j - 1];
        }
        if order > 0 {
            mem[0] = xi;
        }
        *out = sum;
    }
    y
}

/// An IIR filter: `y[i] = x[i] - sum_j den[j] * mem[j]`, with `mem` the
/// filter's shift-register state of past outputs, updated in place across
/// calls.
pub(crate) fn iir(x: &[f32], den: &[f32], mem: &mut [f32]) -> Vec<f32> {
    let order = den.len();
    let mut y = vec![0.0f32; x.len()];
    for (out, &xi) in y.iter_mut().zip(x.iter()) {
        let mut sum = xi;
        for j in 0..order {
            sum -= den[j] * mem[j];
        }
        for j in (1..order).rev() {
            mem[j] = mem[j - 1];
        }
        if order > 0 {
            mem[0] = sum;
        }
        *out = sum;
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autocorr_lag_zero_is_largest() {
        let x: Vec<f32> = (0..64).map(|i| (i as f32 * 0.2).sin()).collect();
        let window = vec![1.0f32; 8];
        let ac = autocorr(&x, &window, 8, 10);
        for &a in &ac[1..] {
            assert!(ac[0] >= a.abs());
        }
    }

    #[test]
    fn test_lpc_reduces_prediction_error_on_periodic_signal() {
        let x: Vec<f32> = (0..256).map(|i| (i as f32 * 0.3).sin()).collect();
        let window = vec![1.0f32; 16];
        let ac = autocorr(&x, &window, 16, 8);
        let coeffs = lpc(&ac, 8);
        assert_eq!(coeffs.len(), 8);
        assert!(coeffs.iter().any(|&c| c.abs() > 1e-6));
    }

    #[test]
    fn test_fir_iir_are_approximate_inverses() {
        let num = vec![0.3f32, -0.1, 0.05];
        let x: Vec<f32> = (0..128).map(|i| (i as f32 * 0.11).sin()).collect();

        let mut fir_mem = vec![0.0f32; num.len()];
        let filtered = fir(&x, &num, &mut fir_mem);

        let mut iir_mem = vec![0.0f32; num.len()];
        let den: Vec<f32> = num.iter().map(|&c| -c).collect();
        let recovered = iir(&filtered, &den, &mut iir_mem);

        for (a, b) in x.iter().zip(recovered.iter()) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }
}
