use std::fmt;
use thiserror::Error;

/// A single provider that failed during a fallback chain.
///
/// Failures are recorded for diagnostics and never surfaced on their own;
/// only exhaustion of a whole chain becomes [`StickerError::AllProvidersFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

/// Errors produced by the sticker codec and pipeline.
#[derive(Debug, Error)]
pub enum StickerError {
    /// The input is not a structurally valid RIFF/WebP container.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// No `VP8 ` or `VP8L` chunk was found while extracting a still frame.
    #[error("No VP8/VP8L image chunk found")]
    NoImageChunk,

    /// Every provider in a chain failed and no local fallback was configured.
    #[error("All providers failed: {}", join_failures(.0))]
    AllProvidersFailed(Vec<ProviderFailure>),

    /// The media type is not one the requested operation accepts.
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// Caller-supplied text or arguments were rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no providers configured".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_failed_lists_every_provider() {
        let err = StickerError::AllProvidersFailed(vec![
            ProviderFailure::new("ezgif", "HTTP 503"),
            ProviderFailure::new("cloudconvert", "Response is not an image"),
        ]);
        assert_eq!(
            err.to_string(),
            "All providers failed: ezgif: HTTP 503; cloudconvert: Response is not an image"
        );
    }

    #[test]
    fn all_failed_with_empty_chain() {
        let err = StickerError::AllProvidersFailed(Vec::new());
        assert_eq!(err.to_string(), "All providers failed: no providers configured");
    }

    #[test]
    fn malformed_message() {
        let err = StickerError::MalformedContainer("Missing RIFF signature".into());
        assert_eq!(err.to_string(), "Malformed container: Missing RIFF signature");
    }
}
