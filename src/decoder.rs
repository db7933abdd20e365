//! The top-level decoder state machine: the mirror image of
//! [`crate::EncoderState`]. Owns the same MDCT plan, overlap-carry and
//! synthesis-history buffers, and band-energy prediction history, and
//! drives one frame through the inverse pipeline on every `decode` call.

use crate::celt::bands::{denormalise_bands, pitch_quant_bands, renormalise_bands, stereo_mix};
use crate::celt::mode::{check_mode, Mode};
use crate::celt::quant::{unquant_bands, unquant_energy, unquant_pitch};
use crate::celt::{build_window, compute_inv_mdcts, compute_mdcts, shift_history, Lifecycle, Mdct, MAX_PERIOD};
use crate::range_coder::{RangeDecoder, Tell};
use crate::{Channels, DecoderError};

/// Decoder-side state for one audio stream.
///
/// Construct one per stream with [`DecoderState::new`], then call
/// [`DecoderState::decode`] once per frame, in the same order the
/// corresponding frames were encoded. Passing `None` in place of a frame's
/// bytes asks the decoder to conceal the loss using the last decoded
/// pitch lag instead of failing.
pub struct DecoderState {
    mode: Mode,
    mdct: Mdct,
    window: Vec<f32>,
    mdct_overlap: Vec<f32>,
    out_mem: Vec<f32>,
    old_band_e: Vec<f32>,
    deemph_mem: Vec<f32>,
    last_pitch_index: usize,
    lifecycle: Lifecycle,
}

impl DecoderState {
    /// Builds a fresh decoder for `mode`. `mode` is cloned; the caller is
    /// free to share the same `Mode` between an encoder and a decoder.
    pub fn new(mode: &Mode) -> Result<Self, DecoderError> {
        check_mode(mode).map_err(|_| DecoderError::InvalidMode)?;

        let n = mode.mdct_size;
        let channels = mode.channels as usize;
        let window = build_window(n, mode.overlap);

        Ok(Self {
            mode: mode.clone(),
            mdct: Mdct::new(n),
            window,
            mdct_overlap: vec![0.0; mode.overlap * channels],
            out_mem: vec![0.0; MAX_PERIOD * channels],
            old_band_e: vec![1e-2; mode.nb_e_bands * channels],
            deemph_mem: vec![0.0; channels],
            last_pitch_index: 0,
            lifecycle: Lifecycle::Fresh,
        })
    }

    /// Decodes one frame into `pcm` (exactly `mode.frame_bins() * channels`
    /// interleaved samples).
    ///
    /// `data` is the byte payload produced by a matching
    /// [`crate::EncoderState::encode`] call, or `None` to request loss
    /// concealment for a frame that never arrived.
    pub fn decode(&mut self, data: Option<&[u8]>, pcm: &mut [i16]) -> Result<(), DecoderError> {
        if self.lifecycle == Lifecycle::Failed {
            return Err(DecoderError::InternalError(
                "decoder is in a failed state and must be recreated",
            ));
        }

        let mode = self.mode.clone();
        let n = mode.mdct_size;
        let b = mode.nb_mdct_blocks;
        let c = mode.channels as usize;
        let frame_bins = mode.frame_bins();
        let overlap = mode.overlap;
        let seg_len = (b + 1) * n;
        let max_lag = MAX_PERIOD - seg_len;

        if pcm.len() != b * n * c {
            return Err(DecoderError::InternalError(
                "pcm length does not match the frame size",
            ));
        }

        let synth_freq = match data {
            Some(bytes) => {
                if bytes.len() < 4 {
                    return Err(DecoderError::InternalError(
                        "input buffer is too small for a frame",
                    ));
                }
                let total_bits = bytes.len() as u32 * 8;

                let mut dec = RangeDecoder::new(bytes);
                let band_e = unquant_energy(&mut dec, &mut self.old_band_e);

                let (has_pitch, gains) = unquant_pitch(&mut dec, mode.nb_p_bands);
                let p = if has_pitch {
                    let pitch_index = dec.decode_uint(max_lag as u32) as usize;
                    self.last_pitch_index = pitch_index;

                    let pitch_segment: Vec<f32> = (0..c)
                        .flat_map(|ch| {
                            self.out_mem[ch * MAX_PERIOD + pitch_index..ch * MAX_PERIOD + pitch_index + seg_len]
                                .to_vec()
                        })
                        .collect();
                    let (freq_pitch, _) =
                        compute_mdcts(&self.mdct, &self.window, &pitch_segment, c, frame_bins, n, b);
                    let band_ep = crate::celt::bands::compute_band_energies(&mode, &freq_pitch);
                    let mut p = crate::celt::bands::normalise_bands(&mode, &freq_pitch, &band_ep);
                    if mode.channels == Channels::Stereo {
                        stereo_mix(&mode, &mut p, &band_e, 1);
                    }
                    pitch_quant_bands(&mode, &mut p, &gains);
                    p
                } else {
                    let _ = dec.decode_uint(128);
                    vec![0.0f32; c * frame_bins]
                };

                let bits_so_far = dec.tell();
                let remaining_bits = total_bits.saturating_sub(bits_so_far);
                let mut x = unquant_bands(&mode, &p, remaining_bits, &mut dec);

                if mode.channels == Channels::Stereo {
                    stereo_mix(&mode, &mut x, &band_e, -1);
                    renormalise_bands(&mode, &mut x);
                }

                let mut val = 0u32;
                let mut corrupted = false;
                while dec.tell() < total_bits {
                    if dec.decode_uint(2) != val {
                        corrupted = true;
                    }
                    val = 1 - val;
                }
                if corrupted {
                    return Err(DecoderError::CorruptedData);
                }

                denormalise_bands(&mode, &x, &band_e)
            }
            None => {
                // Packet loss concealment: resynthesize from the last known
                // pitch lag without touching the energy prediction history,
                // so a real frame decoded right afterwards still predicts
                // from the last value it actually saw.
                let pitch_index = self.last_pitch_index.min(max_lag.saturating_sub(1));
                let pitch_segment: Vec<f32> = (0..c)
                    .flat_map(|ch| {
                        self.out_mem[ch * MAX_PERIOD + pitch_index..ch * MAX_PERIOD + pitch_index + seg_len].to_vec()
                    })
                    .collect();
                let (freq_pitch, _) =
                    compute_mdcts(&self.mdct, &self.window, &pitch_segment, c, frame_bins, n, b);
                freq_pitch
            }
        };

        shift_history(&mut self.out_mem, c, MAX_PERIOD, b * n);
        compute_inv_mdcts(
            &self.mdct,
            &self.window,
            &synth_freq,
            &mut self.out_mem,
            &mut self.mdct_overlap,
            c,
            frame_bins,
            n,
            b,
            overlap,
            MAX_PERIOD,
        );

        for ch in 0..c {
            let out_base = ch * MAX_PERIOD + MAX_PERIOD - b * n;
            for i in 0..b * n {
                let tmp = self.out_mem[out_base + i] + 0.8 * self.deemph_mem[ch];
                self.deemph_mem[ch] = tmp;
                // -32768 is deliberately excluded: output is clamped to a
                // symmetric range.
                pcm[i * c + ch] = tmp.round().clamp(-32767.0f32, 32767.0f32) as i16;
            }
        }

        self.lifecycle = Lifecycle::Streaming;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EncoderState;

    fn test_mode() -> Mode {
        Mode::new(48000, Channels::Mono, 32, 2, 8, 4, 2).unwrap()
    }

    #[test]
    fn test_decode_rejects_wrong_frame_size() {
        let mode = test_mode();
        let mut dec = DecoderState::new(&mode).unwrap();
        let out = vec![0u8; 64];
        let mut pcm = vec![0i16; mode.frame_bins() - 1];
        assert!(dec.decode(Some(&out), &mut pcm).is_err());
    }

    #[test]
    fn test_concealment_produces_a_frame_without_erroring() {
        let mode = test_mode();
        let mut enc = EncoderState::new(&mode).unwrap();
        let mut dec = DecoderState::new(&mode).unwrap();
        let pcm = vec![100i16; mode.frame_bins()];
        let mut out = vec![0u8; 64];
        let mut pcm_out = vec![0i16; mode.frame_bins()];

        enc.encode(&pcm, &mut out).unwrap();
        dec.decode(Some(&out), &mut pcm_out).unwrap();
        // Simulate a lost packet; this must not error even though no bytes
        // arrived.
        assert!(dec.decode(None, &mut pcm_out).is_ok());
    }

    #[test]
    fn test_corrupted_trailer_is_detected() {
        // A buffer much larger than the payload needs guarantees the
        // trailer-padding loop actually runs, so flipping its last byte is
        // guaranteed to be caught.
        let mode = test_mode();
        let mut enc = EncoderState::new(&mode).unwrap();
        let mut dec = DecoderState::new(&mode).unwrap();
        let pcm = vec![0i16; mode.frame_bins()];
        let mut out = vec![0u8; 512];
        let mut pcm_out = vec![0i16; mode.frame_bins()];

        enc.encode(&pcm, &mut out).unwrap();
        let last = out.len() - 1;
        out[last] ^= 0xFF;
        assert!(dec.decode(Some(&out), &mut pcm_out).is_err());
    }
}
