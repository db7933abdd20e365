//! Decoder errors.

/// Errors thrown by the decoder.
#[derive(Debug)]
pub enum DecoderError {
    /// The `Mode` handed to `DecoderState::new` failed validation.
    InvalidMode,
    /// The packet failed the trailer check, or otherwise could not be
    /// decoded consistently.
    CorruptedData,
    /// An internal decoder error.
    InternalError(&'static str),
}

impl std::fmt::Display for DecoderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecoderError::InvalidMode => {
                write!(f, "invalid mode")
            }
            DecoderError::CorruptedData => {
                write!(f, "corrupted data")
            }
            DecoderError::InternalError(message) => {
                write!(f, "{}", message)
            }
        }
    }
}

impl std::error::Error for DecoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
