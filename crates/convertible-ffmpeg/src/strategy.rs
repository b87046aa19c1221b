//! Strategy trait and a name-keyed registry of strategies.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::CompletionCallback;
use crate::request::TranscodeRequest;
use crate::{Error, Result};

/// A pluggable transcoding backend.
pub trait Strategy: Send + Sync {
    /// Registry key, e.g. `"ffmpeg"`.
    fn name(&self) -> &str;

    /// Validate and start a transcode; see
    /// [`TranscodeAdapter::transcode`](crate::TranscodeAdapter::transcode).
    fn transcode(
        &self,
        request: TranscodeRequest,
        on_complete: Option<CompletionCallback>,
    ) -> Result<()>;
}

/// Registry dispatching requests to strategies by name.
///
/// The first strategy registered is the default.
#[derive(Default, Clone)]
pub struct Convertible {
    strategies: HashMap<String, Arc<dyn Strategy>>,
    default: Option<String>,
}

impl Convertible {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy, replacing any previous one with the same name.
    pub fn use_strategy(&mut self, strategy: impl Strategy + 'static) -> &mut Self {
        let name = strategy.name().to_string();
        tracing::debug!("registering strategy {name}");
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.strategies.insert(name, Arc::new(strategy));
        self
    }

    /// Look up a strategy by name.
    pub fn strategy(&self, name: &str) -> Result<Arc<dyn Strategy>> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownStrategy(name.to_string()))
    }

    /// Registered strategy names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Transcode with the default strategy.
    pub fn transcode(
        &self,
        request: TranscodeRequest,
        on_complete: Option<CompletionCallback>,
    ) -> Result<()> {
        let name = self
            .default
            .as_deref()
            .ok_or_else(|| Error::UnknownStrategy("<default>".to_string()))?;
        self.transcode_with(name, request, on_complete)
    }

    /// Transcode with a named strategy.
    pub fn transcode_with(
        &self,
        name: &str,
        request: TranscodeRequest,
        on_complete: Option<CompletionCallback>,
    ) -> Result<()> {
        self.strategy(name)?.transcode(request, on_complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Named {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Strategy for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn transcode(
            &self,
            _request: TranscodeRequest,
            on_complete: Option<CompletionCallback>,
        ) -> Result<()> {
            self.seen.lock().push(self.name);
            if let Some(callback) = on_complete {
                callback(Ok(()));
            }
            Ok(())
        }
    }

    #[test]
    fn first_registered_strategy_is_default() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Convertible::new();
        registry
            .use_strategy(Named {
                name: "ffmpeg",
                seen: Arc::clone(&seen),
            })
            .use_strategy(Named {
                name: "other",
                seen: Arc::clone(&seen),
            });

        registry
            .transcode(TranscodeRequest::new("in.avi", "out.mp4"), None)
            .unwrap();
        registry
            .transcode_with("other", TranscodeRequest::new("in.avi", "out.mp4"), None)
            .unwrap();

        assert_eq!(*seen.lock(), vec!["ffmpeg", "other"]);
        assert_eq!(registry.names(), vec!["ffmpeg", "other"]);
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let registry = Convertible::new();
        let err = registry
            .transcode(TranscodeRequest::new("in.avi", "out.mp4"), None)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy(_)));
        assert!(registry.strategy("ffmpeg").is_err());
    }

    #[test]
    fn callback_is_forwarded() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Convertible::new();
        registry.use_strategy(Named {
            name: "ffmpeg",
            seen,
        });

        let done = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&done);
        registry
            .transcode(
                TranscodeRequest::new("in.avi", "out.mp4"),
                Some(Box::new(move |r| *slot.lock() = Some(r))),
            )
            .unwrap();
        assert_eq!(*done.lock(), Some(Ok(())));
    }
}
