//! Encoder errors.

/// Errors thrown by the encoder.
#[derive(Debug)]
pub enum EncoderError {
    /// The `Mode` handed to `EncoderState::new` failed validation.
    InvalidMode,
    /// The output buffer could not hold what the range coder needed to
    /// write; `out` must be at least as large as the intended constant
    /// bitrate frame size.
    BufferToSmall,
    /// An internal encoder error.
    InternalError(&'static str),
}

impl std::fmt::Display for EncoderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncoderError::InvalidMode => {
                write!(f, "invalid mode")
            }
            EncoderError::BufferToSmall => {
                write!(f, "output buffer is too small")
            }
            EncoderError::InternalError(message) => {
                write!(f, "{}", message)
            }
        }
    }
}

impl std::error::Error for EncoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
