#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
//! A low-delay, constant-bitrate perceptual audio codec core.
//!
//! The pipeline is a frame-oriented overlapped MDCT transform coder: each
//! frame is windowed with a sine-sine (Princen-Bradley) window, transformed
//! with a bank of type-IV DCTs, predicted against a closed-loop pitch
//! search over the decoder's own synthesis history, and the residual
//! spectrum is range-coded under a fixed per-frame bit budget. Every call
//! to [`EncoderState::encode`] writes exactly the caller-provided number of
//! bytes, and every call to [`DecoderState::decode`] consumes exactly that
//! many bytes back, which makes the wire format constant bitrate by
//! construction rather than by padding.
//!
//! A [`Mode`] fixes the frame geometry (block size, channel count, and band
//! layout) an [`EncoderState`]/[`DecoderState`] pair is built around; build
//! one `Mode` and hand it to both ends of a stream.
pub use decoder::DecoderState;
pub use decoder_error::DecoderError;
pub use encoder::{EncodeOutcome, EncoderState};
pub use encoder_error::EncoderError;

pub use celt::mode::{Mode, ModeError};
pub use celt::{Diagnostics, FloatingPolicy, Lifecycle, NumericPolicy, MAX_PERIOD};

pub(crate) mod celt;
mod decoder;
mod decoder_error;
mod encoder;
mod encoder_error;
pub(crate) mod math;
pub(crate) mod range_coder;

// Affects the following targets: avr and msp430
#[cfg(any(target_pointer_width = "8", target_pointer_width = "16"))]
compile_error!("usize needs to be at least 32 bit wide");

/// Audio channels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Channels {
    /// Mono - 1 channel
    Mono = 1,
    /// Stereo - 2 channels
    Stereo = 2,
}
