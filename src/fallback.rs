//! Ordered provider chains with a local last resort.
//!
//! [`attempt`] runs providers strictly one after another. The first success
//! wins; each failure is logged, handed to the caller's `on_failure` hook
//! and recorded in the [`Outcome`]. When every provider has failed, the
//! caller's [`LocalFallback`] produces the result. Without one, the chain
//! ends in [`StickerError::AllProvidersFailed`].

use crate::error::{ProviderFailure, StickerError};
use crate::provider::{LocalFallback, Provider};

/// Where the bytes of an [`Outcome`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// The input was already in the requested form.
    Input,
    Provider(String),
    LocalFallback(String),
}

impl Source {
    pub fn name(&self) -> &str {
        match self {
            Self::Input => "input",
            Self::Provider(name) | Self::LocalFallback(name) => name,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::LocalFallback(_))
    }
}

/// Result of a provider chain.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub bytes: Vec<u8>,
    pub source: Source,
    /// Providers that failed before `source` produced the bytes, in order.
    pub failures: Vec<ProviderFailure>,
}

/// Run `providers` in order against `input`.
///
/// # Example
///
/// ```rust,no_run
/// use wa_sticker::fallback::attempt;
/// use wa_sticker::provider::{PlaceholderWebp, Provider, TextPrompt};
///
/// # async fn example(providers: Vec<Box<dyn Provider<TextPrompt>>>) {
/// let input = TextPrompt::new("hello");
/// let fallback = PlaceholderWebp::default();
/// let outcome = attempt(&providers, &input, Some(&fallback), |f| {
///     eprintln!("{f}");
/// })
/// .await
/// .unwrap();
/// println!("Produced by {}", outcome.source.name());
/// # }
/// ```
pub async fn attempt<I, F>(
    providers: &[Box<dyn Provider<I>>],
    input: &I,
    fallback: Option<&dyn LocalFallback<I>>,
    mut on_failure: F,
) -> Result<Outcome, StickerError>
where
    I: Sync + ?Sized,
    F: FnMut(&ProviderFailure),
{
    let mut failures = Vec::new();

    for provider in providers {
        log::info!("  Trying {}...", provider.name());

        let reason = match provider.produce(input).await {
            Ok(bytes) if !bytes.is_empty() => {
                log::info!("  {} succeeded ({} bytes)", provider.name(), bytes.len());
                return Ok(Outcome {
                    bytes,
                    source: Source::Provider(provider.name().to_string()),
                    failures,
                });
            }
            Ok(_) => "returned an empty body".to_string(),
            Err(e) => format!("{e:#}"),
        };

        let failure = ProviderFailure::new(provider.name(), reason);
        log::warn!("  {failure}");
        on_failure(&failure);
        failures.push(failure);
    }

    match fallback {
        Some(local) => {
            log::info!("  All providers failed, using {}", local.name());
            Ok(Outcome {
                bytes: local.generate(input),
                source: Source::LocalFallback(local.name().to_string()),
                failures,
            })
        }
        None => Err(StickerError::AllProvidersFailed(failures)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        name: &'static str,
        reply: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Provider<str> for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn produce(&self, _input: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(text) => Ok(text.as_bytes().to_vec()),
                None => anyhow::bail!("HTTP 503"),
            }
        }
    }

    struct Fixed;

    impl LocalFallback<str> for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn generate(&self, input: &str) -> Vec<u8> {
            format!("fallback:{input}").into_bytes()
        }
    }

    fn chain(replies: &[Option<&'static str>]) -> (Vec<Box<dyn Provider<str>>>, Vec<Arc<AtomicUsize>>) {
        const NAMES: [&str; 4] = ["first", "second", "third", "fourth"];
        let counters: Vec<_> = replies.iter().map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let providers = replies
            .iter()
            .zip(&counters)
            .enumerate()
            .map(|(i, (reply, calls))| {
                Box::new(Scripted {
                    name: NAMES[i],
                    reply: *reply,
                    calls: calls.clone(),
                }) as Box<dyn Provider<str>>
            })
            .collect();
        (providers, counters)
    }

    fn calls(counters: &[Arc<AtomicUsize>]) -> Vec<usize> {
        counters.iter().map(|c| c.load(Ordering::SeqCst)).collect()
    }

    #[tokio::test]
    async fn first_success_wins() {
        let (providers, counters) = chain(&[None, None, Some("ok"), Some("later")]);
        let mut seen = Vec::new();

        let outcome = attempt(&providers, "x", Some(&Fixed), |f| seen.push(f.provider.clone()))
            .await
            .unwrap();

        assert_eq!(outcome.bytes, b"ok");
        assert_eq!(outcome.source, Source::Provider("third".into()));
        assert_eq!(calls(&counters), vec![1, 1, 1, 0]);
        assert_eq!(seen, vec!["first", "second"]);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].reason, "HTTP 503");
    }

    #[tokio::test]
    async fn exhausted_chain_uses_fallback() {
        let (providers, counters) = chain(&[None, None]);
        let outcome = attempt(&providers, "brat", Some(&Fixed), |_| {}).await.unwrap();

        assert_eq!(outcome.bytes, b"fallback:brat");
        assert!(outcome.source.is_fallback());
        assert_eq!(outcome.source.name(), "fixed");
        assert_eq!(calls(&counters), vec![1, 1]);
        assert_eq!(outcome.failures.len(), 2);
    }

    #[tokio::test]
    async fn exhausted_chain_without_fallback_fails() {
        let (providers, _) = chain(&[None, None]);
        let err = attempt(&providers, "x", None, |_| {}).await.unwrap_err();
        match err {
            StickerError::AllProvidersFailed(failures) => {
                let names: Vec<_> = failures.iter().map(|f| f.provider.as_str()).collect();
                assert_eq!(names, vec!["first", "second"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_body_is_a_failure() {
        let (providers, counters) = chain(&[Some(""), Some("real")]);
        let outcome = attempt(&providers, "x", None, |_| {}).await.unwrap();
        assert_eq!(outcome.bytes, b"real");
        assert_eq!(outcome.failures[0].reason, "returned an empty body");
        assert_eq!(calls(&counters), vec![1, 1]);
    }

    #[tokio::test]
    async fn empty_chain_goes_straight_to_fallback() {
        let providers: Vec<Box<dyn Provider<str>>> = Vec::new();
        let outcome = attempt(&providers, "x", Some(&Fixed), |_| {}).await.unwrap();
        assert!(outcome.source.is_fallback());
        assert!(outcome.failures.is_empty());

        assert!(matches!(
            attempt(&providers, "x", None, |_| {}).await,
            Err(StickerError::AllProvidersFailed(_))
        ));
    }

    #[tokio::test]
    async fn providers_are_never_retried() {
        let (providers, counters) = chain(&[None, None, None]);
        let _ = attempt(&providers, "x", None, |_| {}).await;
        assert_eq!(calls(&counters), vec![1, 1, 1]);
    }
}
