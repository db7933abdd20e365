//! The CELT-style frame pipeline: the MDCT engine, the pitch analyzer, the
//! band processor, the band quantizer, and the plumbing the top-level
//! encoder/decoder state machines drive them with.

pub(crate) mod bands;
mod fft;
mod frame;
pub(crate) mod lpc;
pub(crate) mod mode;
pub(crate) mod quant;
mod mdct;
mod pitch;

pub(crate) use fft::Fft;
pub(crate) use frame::{build_window, compute_inv_mdcts, compute_mdcts, shift_history};
pub(crate) use mdct::Mdct;
pub(crate) use pitch::PitchSearch;

/// Length, in samples per channel, of the synthesis-history buffer the
/// pitch analyzer searches for a matching period.
pub const MAX_PERIOD: usize = 1024;

/// Marker for a codec numeric profile: the representation used for
/// samples, band energies, and normalized coefficients throughout the
/// pipeline.
///
/// Only [`FloatingPolicy`] is implemented. The trait exists so a
/// fixed-point profile could be added later without changing the shape of
/// the band processor or quantizer call sites.
pub trait NumericPolicy: Copy + Clone + std::fmt::Debug {}

/// The floating-point numeric profile: samples, band energies and
/// normalized coefficients are all `f32`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatingPolicy;

impl NumericPolicy for FloatingPolicy {}

/// Non-fatal conditions accumulated while encoding a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Diagnostics {
    /// Set when the range coder finished with more bits of the byte budget
    /// unused than is typical; carries the number of unused bits.
    pub many_unused_bits: Option<u32>,
}

/// Coarse lifecycle of an encoder or decoder state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    /// Constructed, nothing encoded or decoded yet.
    Fresh,
    /// At least one frame has been processed successfully.
    Streaming,
    /// The last operation failed; the state machine should be recreated.
    Failed,
}
