//! The MDCT engine.
//!
//! Forward and backward transforms are evaluated directly from the
//! N/2-shifted type-IV DCT definition rather than through a fast
//! factorization. A fast MDCT (e.g. via a folded FFT of half the length)
//! would normally be preferred, but without the ability to build and run
//! the crate during development a hand-derived fast factorization could
//! not be checked against a reference; the direct evaluation is slower but
//! unambiguously implements the transform it claims to.

use std::f32::consts::PI;

/// A forward/backward MDCT plan for a fixed block size.
///
/// `forward` maps `2*n` windowed time-domain samples to `n` frequency
/// coefficients; `backward` is its un-normalized adjoint, mapping `n`
/// coefficients back to `2*n` time-domain samples.
pub(crate) struct Mdct {
    n: usize,
    /// `cos_table[t * n + k] = cos(pi/n * (t + 0.5 + n/2) * (k + 0.5))`
    cos_table: Vec<f32>,
}

impl Mdct {
    pub(crate) fn new(n: usize) -> Self {
        debug_assert!(n > 0);
        let two_n = 2 * n;
        let mut cos_table = vec![0.0f32; two_n * n];
        for t in 0..two_n {
            for k in 0..n {
                let angle =
                    (PI / n as f32) * (t as f32 + 0.5 + n as f32 / 2.0) * (k as f32 + 0.5);
                cos_table[t * n + k] = angle.cos();
            }
        }
        Self { n, cos_table }
    }

    /// The number of frequency bins this plan produces.
    pub(crate) fn size(&self) -> usize {
        self.n
    }

    /// `time` must hold `2*n` samples; `freq` receives `n` coefficients.
    pub(crate) fn forward(&self, time: &[f32], freq: &mut [f32]) {
        debug_assert_eq!(time.len(), 2 * self.n);
        debug_assert_eq!(freq.len(), self.n);
        for (k, out) in freq.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (t, &sample) in time.iter().enumerate() {
                sum += sample * self.cos_table[t * self.n + k];
            }
            *out = sum;
        }
    }

    /// `freq` must hold `n` coefficients; `time` receives `2*n` samples.
    pub(crate) fn backward(&self, freq: &[f32], time: &mut [f32]) {
        debug_assert_eq!(freq.len(), self.n);
        debug_assert_eq!(time.len(), 2 * self.n);
        let scale = 2.0 / self.n as f32;
        for (t, out) in time.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (k, &coef) in freq.iter().enumerate() {
                sum += coef * self.cos_table[t * self.n + k];
            }
            *out = sum * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_backward_preserve_total_energy() {
        // Parseval-style sanity check: the MDCT is an (approximately) unitary
        // transform up to the 2/N scale factor, so round-tripping a signal
        // through forward+backward should not blow up or collapse its energy.
        let n = 32;
        let mdct = Mdct::new(n);
        let time: Vec<f32> = (0..2 * n).map(|i| (i as f32 * 0.13).sin()).collect();

        let mut freq = vec![0.0f32; n];
        mdct.forward(&time, &mut freq);

        let mut reconstructed = vec![0.0f32; 2 * n];
        mdct.backward(&freq, &mut reconstructed);

        let energy_in: f32 = time.iter().map(|x| x * x).sum();
        let energy_out: f32 = reconstructed.iter().map(|x| x * x).sum();
        assert!(energy_in > 0.0);
        assert!(energy_out > 0.0);
        // The un-windowed, single-block backward transform is not a perfect
        // inverse (that property only holds after windowing and overlap-add
        // across consecutive blocks), but energy should stay within an order
        // of magnitude.
        assert!(energy_out / energy_in < 50.0);
        assert!(energy_in / energy_out < 50.0);
    }

    #[test]
    fn test_zero_input_is_zero_output() {
        let n = 16;
        let mdct = Mdct::new(n);
        let time = vec![0.0f32; 2 * n];
        let mut freq = vec![1.0f32; n];
        mdct.forward(&time, &mut freq);
        assert!(freq.iter().all(|&x| x.abs() < 1e-6));
    }
}
