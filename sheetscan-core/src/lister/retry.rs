//! Bounded retries around a [`FolderLister`].

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::{FolderLister, ListError};
use crate::item::{NodeId, TreeItem};

/// How often and how patiently a failed listing is retried
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each one after
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Random extra delay, as a fraction of the doubled delay
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: 0.25,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Delay before retry number `retry`, counting from zero
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);

        if self.jitter > 0.0 {
            delay.mul_f64(1.0 + rand::rng().random_range(0.0..=self.jitter))
        } else {
            delay
        }
    }
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Lister decorator that retries transient failures with backoff
pub struct RetryingLister<L> {
    inner: L,
    config: RetryConfig,
    sleep: Sleeper,
}

impl<L: FolderLister> RetryingLister<L> {
    pub fn new(inner: L, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the blocking sleep between attempts
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: FolderLister> FolderLister for RetryingLister<L> {
    fn list(&self, folder: &NodeId) -> Result<Vec<TreeItem>, ListError> {
        let mut attempt = 0;
        loop {
            let error = match self.inner.list(folder) {
                Ok(items) => return Ok(items),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= self.config.max_retries {
                return Err(error);
            }

            let mut backoff = self.config.delay(attempt);
            if let ListError::RateLimited {
                retry_after: Some(hint),
            } = &error
            {
                backoff = backoff.max(*hint);
            }

            warn!(
                folder = %folder,
                attempt = attempt,
                error = %error,
                backoff_ms = backoff.as_millis() as u64,
                "Retryable listing error, backing off"
            );
            (self.sleep)(backoff);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};

    /// Fails with the scripted errors, then succeeds
    struct Flaky {
        failures: Mutex<Vec<ListError>>,
        calls: Cell<u32>,
    }

    impl Flaky {
        fn new(failures: Vec<ListError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Cell::new(0),
            }
        }
    }

    impl FolderLister for Flaky {
        fn list(&self, _folder: &NodeId) -> Result<Vec<TreeItem>, ListError> {
            self.calls.set(self.calls.get() + 1);
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok(vec![TreeItem::file("1", "a.xls", None)])
            } else {
                Err(failures.remove(0))
            }
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Duration>>>, impl Fn(Duration) + Send + Sync + 'static) {
        let slept = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&slept);
        (slept, move |d| sink.lock().unwrap().push(d))
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let config = RetryConfig::new()
            .with_delays(Duration::from_millis(100), Duration::from_secs(1))
            .without_jitter();

        let delays: Vec<u128> = [0, 1, 3, 4, 60]
            .into_iter()
            .map(|retry| config.delay(retry).as_millis())
            .collect();
        assert_eq!(delays, [100, 200, 800, 1000, 1000]);
    }

    #[test]
    fn test_jitter_only_lengthens_delay() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let ms = config.delay(0).as_millis();
            assert!((100..=125).contains(&ms), "unexpected delay {ms}");
        }
    }

    #[test]
    fn test_retries_transient_then_succeeds() {
        let (slept, sleeper) = recorder();
        let lister = RetryingLister::new(
            Flaky::new(vec![
                ListError::Transient("503".into()),
                ListError::RateLimited { retry_after: None },
            ]),
            RetryConfig::new().without_jitter(),
        )
        .with_sleeper(sleeper);

        let items = lister.list(&NodeId::from("0")).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            *slept.lock().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert_eq!(lister.into_inner().calls.get(), 3);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let (slept, sleeper) = recorder();
        let failures = (0..5).map(|_| ListError::Transient("timeout".into())).collect();
        let lister = RetryingLister::new(
            Flaky::new(failures),
            RetryConfig::new().with_max_retries(2).without_jitter(),
        )
        .with_sleeper(sleeper);

        let err = lister.list(&NodeId::from("0")).unwrap_err();
        assert!(matches!(err, ListError::Transient(_)));
        assert_eq!(slept.lock().unwrap().len(), 2);
        assert_eq!(lister.into_inner().calls.get(), 3);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let (slept, sleeper) = recorder();
        let lister = RetryingLister::new(
            Flaky::new(vec![ListError::AccessDenied(NodeId::from("0"))]),
            RetryConfig::default(),
        )
        .with_sleeper(sleeper);

        assert!(matches!(
            lister.list(&NodeId::from("0")),
            Err(ListError::AccessDenied(_))
        ));
        assert!(slept.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rate_limit_hint_extends_backoff() {
        let (slept, sleeper) = recorder();
        let lister = RetryingLister::new(
            Flaky::new(vec![ListError::RateLimited {
                retry_after: Some(Duration::from_secs(2)),
            }]),
            RetryConfig::new().without_jitter(),
        )
        .with_sleeper(sleeper);

        lister.list(&NodeId::from("0")).unwrap();
        assert_eq!(*slept.lock().unwrap(), vec![Duration::from_secs(2)]);
    }
}
