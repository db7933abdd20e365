//! A radix-2 Cooley-Tukey FFT over [`Complex32`], used by the pitch
//! analyzer to turn the synthesis-history search into a frequency-domain
//! cross-correlation.

use std::f32::consts::PI;

use num_complex::Complex32;

/// An in-place radix-2 FFT for a fixed, power-of-two transform length.
///
/// Twiddle factors are computed once in [`Fft::new`] and reused by every
/// `forward`/`inverse` call.
pub(crate) struct Fft {
    size: usize,
    twiddles: Vec<Complex32>,
}

impl Fft {
    /// Builds an FFT plan for transforms of length `size`.
    ///
    /// `size` must be a power of two.
    pub(crate) fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        let twiddles = (0..size / 2)
            .map(|k| {
                let theta = -2.0 * PI * (k as f32) / (size as f32);
                Complex32::new(theta.cos(), theta.sin())
            })
            .collect();
        Self { size, twiddles }
    }

    /// The transform length this plan was built for.
    pub(crate) fn len(&self) -> usize {
        self.size
    }

    /// In-place forward FFT.
    pub(crate) fn forward(&self, a: &mut [Complex32]) {
        debug_assert_eq!(a.len(), self.size);
        bit_reverse_permute(a);
        let n = self.size;
        let mut len = 2;
        while len <= n {
            let stride = n / len;
            let mut i = 0;
            while i < n {
                for k in 0..len / 2 {
                    let w = self.twiddles[k * stride];
                    let u = a[i + k];
                    let v = a[i + k + len / 2] * w;
                    a[i + k] = u + v;
                    a[i + k + len / 2] = u - v;
                }
                i += len;
            }
            len <<= 1;
        }
    }

    /// In-place inverse FFT, including the `1/N` normalization.
    pub(crate) fn inverse(&self, a: &mut [Complex32]) {
        for x in a.iter_mut() {
            *x = x.conj();
        }
        self.forward(a);
        let scale = 1.0 / self.size as f32;
        for x in a.iter_mut() {
            *x = x.conj() * scale;
        }
    }
}

fn bit_reverse_permute(a: &mut [Complex32]) {
    let n = a.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            a.swap(i, j);
        }
    }
}
