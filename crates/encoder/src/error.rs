use thiserror::Error;

/// Errors surfaced by [`SpectrumEncoder`](crate::SpectrumEncoder).
///
/// Any of these during `encode` aborts the whole batch: callers never receive
/// a partial list of embeddings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    /// Configuration is inconsistent (zero chunk size, wrong tensor types, ...).
    /// Raised at construction time only.
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),
    /// The inference service could not be reached or answered with a non-success status.
    #[error("inference request failed: {0}")]
    Transport(String),
    /// The service answered, but the payload does not match the inference protocol.
    #[error("invalid inference response: {0}")]
    Protocol(String),
    /// The requested output tensor was present but held no data.
    #[error("inference service returned empty output '{0}'")]
    EmptyOutput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = EncoderError::Transport("connection refused".into());
        assert!(err.to_string().contains("inference request failed"));
        assert!(err.to_string().contains("connection refused"));

        let err = EncoderError::EmptyOutput("embedding".into());
        assert_eq!(
            err.to_string(),
            "inference service returned empty output 'embedding'"
        );
    }

    #[test]
    fn errors_are_comparable() {
        assert_eq!(
            EncoderError::InvalidConfig("x".into()),
            EncoderError::InvalidConfig("x".into())
        );
        assert_ne!(
            EncoderError::Protocol("x".into()),
            EncoderError::Transport("x".into())
        );
    }
}
