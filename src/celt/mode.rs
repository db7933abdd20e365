//! The `Mode`: an immutable, caller-constructed description of the frame
//! geometry (block size, channel count, band layout) the encoder and
//! decoder are built around.

use crate::celt::MAX_PERIOD;
use crate::Channels;

/// Errors returned while constructing a [`Mode`].
#[derive(Debug)]
pub enum ModeError {
    /// The requested combination of block size, channel count, overlap or
    /// band counts is not usable.
    InvalidConfiguration(&'static str),
}

impl std::fmt::Display for ModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeError::InvalidConfiguration(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ModeError {}

/// Static configuration shared by an [`EncoderState`](crate::EncoderState)
/// and a [`DecoderState`](crate::DecoderState): block geometry, channel
/// count, and the band layout used by the band processor and quantizer.
///
/// A `Mode` carries no state of its own beyond these fixed parameters; it is
/// built once and handed to both ends of the pipeline by reference.
#[derive(Clone, Debug)]
pub struct Mode {
    pub(crate) sample_rate: u32,
    pub(crate) channels: Channels,
    pub(crate) mdct_size: usize,
    pub(crate) nb_mdct_blocks: usize,
    pub(crate) overlap: usize,
    pub(crate) nb_e_bands: usize,
    pub(crate) e_band_bounds: Vec<usize>,
    pub(crate) nb_p_bands: usize,
    pub(crate) p_band_bounds: Vec<usize>,
}

impl Mode {
    /// Builds a new `Mode`.
    ///
    /// # Arguments
    /// * `sample_rate`    - Informational; the pipeline itself is
    ///                      sample-rate agnostic.
    /// * `channels`       - Mono or stereo.
    /// * `mdct_size`      - `N`, the number of frequency bins per MDCT block.
    /// * `nb_mdct_blocks` - `B`, the number of MDCT blocks per frame.
    /// * `overlap`        - The window's overlap region, `<= mdct_size`.
    /// * `nb_e_bands`     - Number of energy bands the `B*N` bins are split into.
    /// * `nb_p_bands`     - Number of pitch-gain bands the `B*N` bins are split into.
    pub fn new(
        sample_rate: u32,
        channels: Channels,
        mdct_size: usize,
        nb_mdct_blocks: usize,
        overlap: usize,
        nb_e_bands: usize,
        nb_p_bands: usize,
    ) -> Result<Self, ModeError> {
        if mdct_size == 0 || nb_mdct_blocks == 0 {
            return Err(ModeError::InvalidConfiguration(
                "mdct_size and nb_mdct_blocks must be non-zero",
            ));
        }
        if overlap == 0 || overlap > mdct_size {
            return Err(ModeError::InvalidConfiguration(
                "overlap must be in 1..=mdct_size",
            ));
        }
        if (mdct_size - overlap) % 2 != 0 {
            return Err(ModeError::InvalidConfiguration(
                "mdct_size - overlap must be even",
            ));
        }
        if nb_e_bands == 0 || nb_p_bands == 0 {
            return Err(ModeError::InvalidConfiguration(
                "band counts must be non-zero",
            ));
        }
        let frame_bins = mdct_size * nb_mdct_blocks;
        if nb_e_bands > frame_bins || nb_p_bands > frame_bins {
            return Err(ModeError::InvalidConfiguration(
                "too many bands for the frame size",
            ));
        }
        if (nb_mdct_blocks + 1) * mdct_size + 2 > MAX_PERIOD {
            return Err(ModeError::InvalidConfiguration(
                "(nb_mdct_blocks + 1) * mdct_size must leave at least two lags of pitch search range",
            ));
        }

        let e_band_bounds = even_bounds(frame_bins, nb_e_bands);
        let p_band_bounds = even_bounds(frame_bins, nb_p_bands);

        Ok(Self {
            sample_rate,
            channels,
            mdct_size,
            nb_mdct_blocks,
            overlap,
            nb_e_bands,
            e_band_bounds,
            nb_p_bands,
            p_band_bounds,
        })
    }

    /// The number of frequency bins per channel in one frame (`N*B`).
    pub(crate) fn frame_bins(&self) -> usize {
        self.mdct_size * self.nb_mdct_blocks
    }

    /// Half the non-overlapping part of a block's window, `(N-overlap)/2`.
    pub(crate) fn n4(&self) -> usize {
        (self.mdct_size - self.overlap) / 2
    }

    /// The sample rate this mode was constructed with.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The number of channels this mode was constructed with.
    pub fn channels(&self) -> Channels {
        self.channels
    }
}

fn even_bounds(total: usize, n: usize) -> Vec<usize> {
    (0..=n).map(|b| total * b / n).collect()
}

/// Revalidates a `Mode`'s invariants.
///
/// Called once at `EncoderState::new`/`DecoderState::new`; a `Mode` is
/// immutable after construction so there is no need to repeat this check on
/// every `encode`/`decode` call.
pub(crate) fn check_mode(mode: &Mode) -> Result<(), ModeError> {
    if mode.overlap == 0 || mode.overlap > mode.mdct_size {
        return Err(ModeError::InvalidConfiguration(
            "overlap must be in 1..=mdct_size",
        ));
    }
    if (mode.nb_mdct_blocks + 1) * mode.mdct_size + 2 > MAX_PERIOD {
        return Err(ModeError::InvalidConfiguration(
            "(nb_mdct_blocks + 1) * mdct_size must leave at least two lags of pitch search range",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_mode_rejects_bad_overlap() {
        assert!(Mode::new(48000, Channels::Mono, 64, 2, 0, 4, 2).is_err());
        assert!(Mode::new(48000, Channels::Mono, 64, 2, 65, 4, 2).is_err());
    }

    #[test]
    fn test_mode_band_bounds_cover_frame() {
        let mode = Mode::new(48000, Channels::Stereo, 64, 2, 16, 8, 4).unwrap();
        assert_eq!(mode.e_band_bounds.first(), Some(&0));
        assert_eq!(mode.e_band_bounds.last(), Some(&mode.frame_bins()));
        assert_eq!(mode.e_band_bounds.len(), mode.nb_e_bands + 1);
        assert!(mode.e_band_bounds.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_mode_rejects_history_overflow() {
        // (B+1)*N must fit inside MAX_PERIOD.
        assert!(Mode::new(48000, Channels::Stereo, 600, 2, 16, 8, 4).is_err());
    }
}
