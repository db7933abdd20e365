//! Closed-loop pitch analysis: finds the lag in the synthesis-history
//! buffer whose content best correlates with the current frame, via a
//! frequency-domain cross-correlation.

use num_complex::Complex32;

use crate::celt::Fft;

/// Per-lag decay applied to the cross-correlation before the max search:
/// `PITCH_DECAY.powi(lag)`. This biases the search toward shorter lags so
/// that, among near-equally good candidates (as any periodic signal
/// produces at every multiple of its true period), the search doesn't
/// drift to a needlessly long one; it is the same shorter-lag-preference
/// a real pitch search chases with sub-multiple checks, approximated here
/// as a plain decay instead.
const PITCH_DECAY: f32 = 0.9995;

/// Searches a fixed-length synthesis-history buffer for the best-matching
/// lag against a target frame.
pub(crate) struct PitchSearch {
    fft: Fft,
}

impl PitchSearch {
    /// `history_len` is the length (and FFT size) of the synthesis-history
    /// buffer that will be searched; it must be a power of two.
    pub(crate) fn new(history_len: usize) -> Self {
        Self {
            fft: Fft::new(history_len),
        }
    }

    /// Finds the lag in `0..lag_count` at which `history` best correlates
    /// with `target`, via the FFT convolution theorem.
    ///
    /// `history` must have exactly `history_len` samples (the length this
    /// plan was built for); `target` may be shorter and is implicitly
    /// zero-padded. `lag_count` must be at least 1.
    pub(crate) fn find_pitch(&self, target: &[f32], history: &[f32], lag_count: usize) -> usize {
        let n = self.fft.len();
        debug_assert_eq!(history.len(), n);
        debug_assert!(target.len() <= n);
        debug_assert!(lag_count >= 1);

        let mut t: Vec<Complex32> = (0..n)
            .map(|i| Complex32::new(*target.get(i).unwrap_or(&0.0), 0.0))
            .collect();
        let mut h: Vec<Complex32> = history.iter().map(|&x| Complex32::new(x, 0.0)).collect();

        self.fft.forward(&mut t);
        self.fft.forward(&mut h);

        let mut cross: Vec<Complex32> = t.iter().zip(h.iter()).map(|(a, b)| a * b.conj()).collect();
        self.fft.inverse(&mut cross);

        let lag_count = lag_count.min(n);
        let mut best_lag = 0usize;
        let mut best_val = f32::MIN;
        let mut decay = 1.0f32;
        for (lag, c) in cross.iter().enumerate().take(lag_count) {
            let weighted = c.re * decay;
            if weighted > best_val {
                best_val = weighted;
                best_lag = lag;
            }
            decay *= PITCH_DECAY;
        }
        best_lag
    }
}
