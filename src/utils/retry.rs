//! Retry with exponential backoff and API handle failover
//!
//! `RetryWithBackoff` wraps calls made on behalf of an [`ApiBound`] object.
//! When a call fails with a retryable error the wrapper sleeps, grows the
//! delay by the backoff factor, demotes the object's current handle in the
//! pool and hands it the pool's next one before trying again.
//!
//! By default there is no attempt limit and no delay cap: a retryable error
//! is retried until the call succeeds.

use crate::error::{ApiError, RetryError};
use crate::services::api_pool::{ApiBound, ApiPool, DefaultApiPool};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default delay before the first retry
pub const DEFAULT_DELAY: Duration = Duration::from_secs(6);

/// Default multiplier applied to the delay after each failure
pub const DEFAULT_BACKOFF: f64 = 2.0;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Multiplier for exponential backoff, must be greater than 1
    pub backoff: f64,

    /// Maximum delay between retries, jitter included. Must not be less than
    /// `initial_delay`. `None` lets the delay grow unbounded.
    pub max_delay: Option<Duration>,

    /// Maximum number of attempts, the initial one included. `None` retries
    /// until success.
    pub max_attempts: Option<u32>,

    /// Add a random extra of up to the current delay to each sleep, still
    /// bounded by `max_delay`
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_DELAY,
            backoff: DEFAULT_BACKOFF,
            max_delay: None,
            max_attempts: None,
            use_jitter: false,
        }
    }
}

impl RetryConfig {
    /// Create a validated config with the given delay and backoff
    pub fn new(initial_delay: Duration, backoff: f64) -> Result<Self, ApiError> {
        let config = Self {
            initial_delay,
            backoff,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a validated config from a delay in (fractional) seconds
    pub fn from_secs_f64(delay_secs: f64, backoff: f64) -> Result<Self, ApiError> {
        check_backoff(backoff)?;
        if !(delay_secs > 0.0) {
            return Err(invalid("delay must be greater than 0"));
        }
        let initial_delay = Duration::try_from_secs_f64(delay_secs)
            .map_err(|e| ApiError::InvalidArgument(format!("delay out of range: {}", e)))?;
        Self::new(initial_delay, backoff)
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set maximum attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Check the invariants a retry loop relies on
    pub fn validate(&self) -> Result<(), ApiError> {
        check_backoff(self.backoff)?;
        if self.initial_delay.is_zero() {
            return Err(invalid("delay must be greater than 0"));
        }
        if self.max_attempts == Some(0) {
            return Err(invalid("max_attempts must be at least 1"));
        }
        if let Some(max) = self.max_delay {
            if max.is_zero() {
                return Err(invalid("max_delay must be greater than 0"));
            }
            if max < self.initial_delay {
                return Err(invalid("max_delay must not be less than delay"));
            }
        }
        Ok(())
    }

    /// Delay that follows `delay` after one more failure
    pub fn next_delay(&self, delay: Duration) -> Duration {
        // f64 -> u64 casts saturate, so an unbounded delay tops out instead
        // of panicking
        let scaled = Duration::from_nanos((delay.as_nanos() as f64 * self.backoff).round() as u64);
        match self.max_delay {
            Some(max) => scaled.min(max),
            None => scaled,
        }
    }

    /// Time to actually sleep for `delay`, including jitter if enabled
    fn sleep_duration(&self, delay: Duration) -> Duration {
        if !self.use_jitter {
            return delay;
        }
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        let jitter = rand::thread_rng().gen_range(0..=nanos);
        let pause = delay.saturating_add(Duration::from_nanos(jitter));
        match self.max_delay {
            Some(max) => pause.min(max),
            None => pause,
        }
    }

    fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

fn check_backoff(backoff: f64) -> Result<(), ApiError> {
    // Written so that NaN fails as well
    if !(backoff > 1.0) {
        return Err(invalid("backoff must be greater than 1"));
    }
    Ok(())
}

fn invalid(message: &str) -> ApiError {
    ApiError::InvalidArgument(message.to_string())
}

/// Result of a retry operation
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result
    pub result: Result<T, RetryError<E>>,

    /// Number of attempts made
    pub attempts: u32,

    /// Total time spent sleeping between attempts
    pub total_delay: Duration,
}

// Attempting -> Succeeded
//            -> Backoff -> Attempting
//            -> FatalFailure
// There is no terminal state for running out of retries unless
// `max_attempts` is set.
enum RetryState<T, E> {
    Attempting,
    Backoff,
    Succeeded(T),
    FatalFailure(RetryError<E>),
}

type PoolAccessor<H> = Arc<dyn Fn() -> Arc<ApiPool<H>> + Send + Sync>;

/// Retry wrapper bound to a pool of API handles
pub struct RetryWithBackoff<H> {
    pool_accessor: PoolAccessor<H>,
    config: RetryConfig,
}

impl<H> Clone for RetryWithBackoff<H> {
    fn clone(&self) -> Self {
        Self {
            pool_accessor: Arc::clone(&self.pool_accessor),
            config: self.config.clone(),
        }
    }
}

impl<H> fmt::Debug for RetryWithBackoff<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryWithBackoff")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<H> RetryWithBackoff<H>
where
    H: Clone + PartialEq + fmt::Debug,
{
    /// Create a retry wrapper with the given delay and backoff
    ///
    /// `pool_accessor` is called once per wrapped call to get the pool the
    /// replacement handles come from.
    pub fn new<A>(pool_accessor: A, delay: Duration, backoff: f64) -> Result<Self, ApiError>
    where
        A: Fn() -> Arc<ApiPool<H>> + Send + Sync + 'static,
    {
        Self::with_config(pool_accessor, RetryConfig::new(delay, backoff)?)
    }

    /// Create a retry wrapper from a full config
    pub fn with_config<A>(pool_accessor: A, config: RetryConfig) -> Result<Self, ApiError>
    where
        A: Fn() -> Arc<ApiPool<H>> + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            pool_accessor: Arc::new(pool_accessor),
            config,
        })
    }

    /// Create a retry wrapper that always uses `pool`
    pub fn from_pool(pool: Arc<ApiPool<H>>, config: RetryConfig) -> Result<Self, ApiError>
    where
        H: Send + 'static,
    {
        Self::with_config(move || Arc::clone(&pool), config)
    }

    /// Create a retry wrapper bound to the default pool of `T`
    pub fn for_type<T>(config: RetryConfig) -> Result<Self, ApiError>
    where
        T: DefaultApiPool<Handle = H> + 'static,
    {
        Self::with_config(T::default_api_pool, config)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation`, retrying on any error
    pub fn run<T, R, E, F>(&self, target: &mut T, operation: F) -> Result<R, RetryError<E>>
    where
        T: ApiBound<Handle = H>,
        F: FnMut(&mut T) -> Result<R, E>,
    {
        self.run_with_stats(target, |_: &E| true, operation).result
    }

    /// Run `operation`, retrying only errors accepted by `is_retryable`
    ///
    /// Any other error is returned at once, without sleeping and without
    /// touching the pool.
    pub fn run_if<T, R, E, F, P>(
        &self,
        target: &mut T,
        is_retryable: P,
        operation: F,
    ) -> Result<R, RetryError<E>>
    where
        T: ApiBound<Handle = H>,
        F: FnMut(&mut T) -> Result<R, E>,
        P: Fn(&E) -> bool,
    {
        self.run_with_stats(target, is_retryable, operation).result
    }

    /// Blocking retry loop, returning the result along with retry statistics
    pub fn run_with_stats<T, R, E, F, P>(
        &self,
        target: &mut T,
        is_retryable: P,
        mut operation: F,
    ) -> RetryResult<R, E>
    where
        T: ApiBound<Handle = H>,
        F: FnMut(&mut T) -> Result<R, E>,
        P: Fn(&E) -> bool,
    {
        let mut delay = self.config.initial_delay;
        let pool = (self.pool_accessor)();
        let mut attempts = 0;
        let mut total_delay = Duration::ZERO;
        let mut state = RetryState::Attempting;

        loop {
            state = match state {
                RetryState::Attempting => {
                    attempts += 1;
                    match operation(&mut *target) {
                        Ok(value) => RetryState::Succeeded(value),
                        Err(err) => self.classify(err, attempts, &is_retryable),
                    }
                }
                RetryState::Backoff => {
                    let pause = self.config.sleep_duration(delay);
                    log_retry(attempts, pause, target.api());
                    std::thread::sleep(pause);
                    total_delay += pause;
                    delay = self.config.next_delay(delay);

                    match swap_handle(&pool, target) {
                        Ok(()) => RetryState::Attempting,
                        Err(err) => RetryState::FatalFailure(err.into()),
                    }
                }
                RetryState::Succeeded(value) => {
                    log_recovered(attempts, total_delay);
                    return RetryResult {
                        result: Ok(value),
                        attempts,
                        total_delay,
                    };
                }
                RetryState::FatalFailure(err) => {
                    return RetryResult {
                        result: Err(err),
                        attempts,
                        total_delay,
                    };
                }
            };
        }
    }

    /// Async counterpart of [`run`](Self::run)
    ///
    /// The operation is given a clone of the target's current handle on each
    /// attempt.
    pub async fn run_async<T, R, E, F, Fut>(
        &self,
        target: &mut T,
        operation: F,
    ) -> Result<R, RetryError<E>>
    where
        T: ApiBound<Handle = H>,
        F: FnMut(H) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        self.run_async_with_stats(target, |_: &E| true, operation)
            .await
            .result
    }

    /// Async counterpart of [`run_if`](Self::run_if)
    pub async fn run_async_if<T, R, E, F, Fut, P>(
        &self,
        target: &mut T,
        is_retryable: P,
        operation: F,
    ) -> Result<R, RetryError<E>>
    where
        T: ApiBound<Handle = H>,
        F: FnMut(H) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        P: Fn(&E) -> bool,
    {
        self.run_async_with_stats(target, is_retryable, operation)
            .await
            .result
    }

    /// Async retry loop, sleeping with `tokio::time::sleep`
    pub async fn run_async_with_stats<T, R, E, F, Fut, P>(
        &self,
        target: &mut T,
        is_retryable: P,
        mut operation: F,
    ) -> RetryResult<R, E>
    where
        T: ApiBound<Handle = H>,
        F: FnMut(H) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        P: Fn(&E) -> bool,
    {
        let mut delay = self.config.initial_delay;
        let pool = (self.pool_accessor)();
        let mut attempts = 0;
        let mut total_delay = Duration::ZERO;
        let mut state = RetryState::Attempting;

        loop {
            state = match state {
                RetryState::Attempting => {
                    attempts += 1;
                    match operation(target.api().clone()).await {
                        Ok(value) => RetryState::Succeeded(value),
                        Err(err) => self.classify(err, attempts, &is_retryable),
                    }
                }
                RetryState::Backoff => {
                    let pause = self.config.sleep_duration(delay);
                    log_retry(attempts, pause, target.api());
                    tokio::time::sleep(pause).await;
                    total_delay += pause;
                    delay = self.config.next_delay(delay);

                    match swap_handle(&pool, target) {
                        Ok(()) => RetryState::Attempting,
                        Err(err) => RetryState::FatalFailure(err.into()),
                    }
                }
                RetryState::Succeeded(value) => {
                    log_recovered(attempts, total_delay);
                    return RetryResult {
                        result: Ok(value),
                        attempts,
                        total_delay,
                    };
                }
                RetryState::FatalFailure(err) => {
                    return RetryResult {
                        result: Err(err),
                        attempts,
                        total_delay,
                    };
                }
            };
        }
    }

    fn classify<R, E, P>(&self, err: E, attempts: u32, is_retryable: &P) -> RetryState<R, E>
    where
        P: Fn(&E) -> bool,
    {
        if !is_retryable(&err) {
            return RetryState::FatalFailure(RetryError::Operation(err));
        }
        if self.config.attempts_exhausted(attempts) {
            tracing::warn!(attempts, "Giving up after reaching max attempts");
            return RetryState::FatalFailure(RetryError::Operation(err));
        }
        RetryState::Backoff
    }
}

/// Demote the target's handle and give it the pool's current one
fn swap_handle<T, H>(pool: &ApiPool<H>, target: &mut T) -> Result<(), ApiError>
where
    T: ApiBound<Handle = H>,
    H: Clone + PartialEq + fmt::Debug,
{
    pool.demote(target.api());
    let next = pool.get_current()?;
    target.set_api(next);
    Ok(())
}

fn log_retry<H: fmt::Debug>(attempt: u32, delay: Duration, handle: &H) {
    tracing::warn!(
        attempt,
        delay_ms = delay.as_millis() as u64,
        handle = ?handle,
        "Request failed, retrying with next API handle"
    );
}

fn log_recovered(attempts: u32, total_delay: Duration) {
    if attempts > 1 {
        tracing::info!(
            attempts,
            total_delay_ms = total_delay.as_millis() as u64,
            "Request succeeded after retries"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api_pool::PoolStats;

    #[derive(Debug)]
    struct AdAccount {
        api: &'static str,
        swaps: u32,
    }

    impl AdAccount {
        fn new(api: &'static str) -> Self {
            Self { api, swaps: 0 }
        }
    }

    impl ApiBound for AdAccount {
        type Handle = &'static str;

        fn api(&self) -> &&'static str {
            &self.api
        }

        fn set_api(&mut self, api: &'static str) {
            self.api = api;
            self.swaps += 1;
        }
    }

    #[derive(Debug, PartialEq)]
    enum RequestError {
        Transient,
        Rejected,
    }

    fn pool() -> Arc<ApiPool<&'static str>> {
        Arc::new(ApiPool::new(&["a", "b", "c"]))
    }

    fn retry_for(pool: &Arc<ApiPool<&'static str>>, config: RetryConfig) -> RetryWithBackoff<&'static str> {
        RetryWithBackoff::from_pool(Arc::clone(pool), config).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(6));
        assert_eq!(config.backoff, 2.0);
        assert!(config.max_delay.is_none());
        assert!(config.max_attempts.is_none());
        assert!(!config.use_jitter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_construction_rejects_bad_parameters() {
        assert!(matches!(
            RetryConfig::from_secs_f64(6.0, 1.0),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(RetryConfig::from_secs_f64(6.0, 0.5).is_err());
        assert!(RetryConfig::from_secs_f64(0.0, 2.0).is_err());
        assert!(RetryConfig::from_secs_f64(-1.0, 2.0).is_err());
        assert!(RetryConfig::from_secs_f64(f64::NAN, 2.0).is_err());
        assert!(RetryConfig::from_secs_f64(6.0, f64::NAN).is_err());
        assert!(RetryConfig::from_secs_f64(f64::INFINITY, 2.0).is_err());

        assert!(RetryWithBackoff::new(pool_of_one, Duration::ZERO, 2.0).is_err());
        assert!(RetryWithBackoff::new(pool_of_one, Duration::from_secs(1), 1.0).is_err());
        assert!(RetryWithBackoff::new(pool_of_one, Duration::from_millis(10), 1.5).is_ok());
    }

    fn pool_of_one() -> Arc<ApiPool<&'static str>> {
        Arc::new(ApiPool::new(&["only"]))
    }

    #[test]
    fn test_backoff_message_matches_parameter() {
        let err = RetryConfig::from_secs_f64(1.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("backoff"));
        let err = RetryConfig::from_secs_f64(0.0, 2.0).unwrap_err();
        assert!(err.to_string().contains("delay"));
    }

    #[test]
    fn test_with_config_validates_limits() {
        let config = RetryConfig::default().with_max_attempts(0);
        assert!(RetryWithBackoff::with_config(pool_of_one, config).is_err());

        let config = RetryConfig::default().with_max_delay(Duration::ZERO);
        assert!(RetryWithBackoff::with_config(pool_of_one, config).is_err());
    }

    #[test]
    fn test_max_delay_below_initial_delay_is_rejected() {
        let config = RetryConfig::new(Duration::from_millis(100), 2.0)
            .unwrap()
            .with_max_delay(Duration::from_millis(20));

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
        assert!(err.to_string().contains("max_delay"));
        assert!(RetryWithBackoff::with_config(pool_of_one, config).is_err());

        let config = RetryConfig::new(Duration::from_millis(100), 2.0)
            .unwrap()
            .with_max_delay(Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pauses_never_exceed_max_delay() {
        let pool = pool();
        let config = RetryConfig::new(Duration::from_millis(10), 2.0)
            .unwrap()
            .with_max_delay(Duration::from_millis(15))
            .with_jitter(true);
        let retry = retry_for(&pool, config);
        let mut account = AdAccount::new("a");
        let mut calls = 0;

        let result = retry.run_with_stats(
            &mut account,
            |_: &RequestError| true,
            |account| {
                calls += 1;
                if calls <= 2 {
                    Err(RequestError::Transient)
                } else {
                    Ok(account.api)
                }
            },
        );

        assert_eq!(result.result.unwrap(), "c");
        assert_eq!(result.attempts, 3);
        // 10ms then 20ms before jitter, each pause capped at 15ms
        assert!(result.total_delay >= Duration::from_millis(25));
        assert!(result.total_delay <= Duration::from_millis(30));
    }

    #[test]
    fn test_next_delay() {
        let config = RetryConfig::new(Duration::from_millis(100), 2.0).unwrap();
        assert_eq!(config.next_delay(Duration::from_millis(100)), Duration::from_millis(200));
        assert_eq!(config.next_delay(Duration::from_millis(400)), Duration::from_millis(800));

        let config = config.with_max_delay(Duration::from_millis(500));
        assert_eq!(config.next_delay(Duration::from_millis(400)), Duration::from_millis(500));

        let config = RetryConfig::new(Duration::from_millis(100), 1.5).unwrap();
        assert_eq!(config.next_delay(Duration::from_millis(100)), Duration::from_millis(150));
    }

    #[test]
    fn test_next_delay_saturates() {
        let config = RetryConfig::default();
        let huge = Duration::from_nanos(u64::MAX);
        assert_eq!(config.next_delay(huge), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn test_sleep_duration_with_jitter() {
        let config = RetryConfig::new(Duration::from_millis(100), 2.0)
            .unwrap()
            .with_jitter(true);

        for _ in 0..20 {
            let pause = config.sleep_duration(Duration::from_millis(100));
            assert!(pause >= Duration::from_millis(100));
            assert!(pause <= Duration::from_millis(200));
        }

        let capped = config.with_max_delay(Duration::from_millis(120));
        for _ in 0..20 {
            let pause = capped.sleep_duration(Duration::from_millis(100));
            assert!(pause >= Duration::from_millis(100));
            assert!(pause <= Duration::from_millis(120));
        }
    }

    #[test]
    fn test_success_first_attempt_leaves_pool_alone() {
        let pool = pool();
        let retry = retry_for(&pool, RetryConfig::default());
        let mut account = AdAccount::new("a");

        let result = retry.run_with_stats(&mut account, |_: &RequestError| true, |_| Ok(42));

        assert_eq!(result.result.unwrap(), 42);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.total_delay, Duration::ZERO);
        assert_eq!(account.swaps, 0);
        assert_eq!(pool.stats(), PoolStats { active: 3, awaiting: 0 });
    }

    #[test]
    fn test_two_failures_then_success() {
        let pool = pool();
        let retry = retry_for(&pool, RetryConfig::new(Duration::from_millis(10), 2.0).unwrap());
        let mut account = AdAccount::new("a");
        let mut calls = 0;

        let result = retry.run_with_stats(
            &mut account,
            |err: &RequestError| *err == RequestError::Transient,
            |account| {
                calls += 1;
                if calls <= 2 {
                    Err(RequestError::Transient)
                } else {
                    Ok(account.api)
                }
            },
        );

        assert_eq!(result.result.unwrap(), "c");
        assert_eq!(result.attempts, 3);
        assert_eq!(result.total_delay, Duration::from_millis(30));
        assert_eq!(account.swaps, 2);
        assert_eq!(account.api, "c");

        let (active, awaiting) = pool.snapshot();
        assert_eq!(active, vec!["c"]);
        assert_eq!(awaiting, vec!["a", "b"]);
    }

    #[test]
    fn test_non_matching_error_propagates_immediately() {
        let pool = pool();
        let retry = retry_for(&pool, RetryConfig::default());
        let mut account = AdAccount::new("a");

        let result = retry.run_with_stats(
            &mut account,
            |err: &RequestError| *err == RequestError::Transient,
            |_| Err::<(), _>(RequestError::Rejected),
        );

        assert!(matches!(
            result.result,
            Err(RetryError::Operation(RequestError::Rejected))
        ));
        assert_eq!(result.attempts, 1);
        assert_eq!(result.total_delay, Duration::ZERO);
        assert_eq!(account.swaps, 0);
        assert_eq!(pool.stats(), PoolStats { active: 3, awaiting: 0 });
    }

    #[test]
    fn test_max_attempts_returns_last_error() {
        let pool = pool();
        let config = RetryConfig::new(Duration::from_millis(1), 2.0)
            .unwrap()
            .with_max_attempts(3);
        let retry = retry_for(&pool, config);
        let mut account = AdAccount::new("a");

        let result = retry.run_with_stats(
            &mut account,
            |_: &RequestError| true,
            |_| Err::<(), _>(RequestError::Transient),
        );

        assert!(matches!(
            result.result,
            Err(RetryError::Operation(RequestError::Transient))
        ));
        assert_eq!(result.attempts, 3);
        assert_eq!(account.swaps, 2);
    }

    #[test]
    fn test_single_handle_pool_keeps_retrying_same_handle() {
        let pool = pool_of_one();
        let retry = retry_for(&pool, RetryConfig::new(Duration::from_millis(1), 2.0).unwrap());
        let mut account = AdAccount::new("only");
        let mut calls = 0;

        let value = retry
            .run(&mut account, |account| {
                calls += 1;
                if calls < 3 {
                    Err("throttled")
                } else {
                    Ok(account.api)
                }
            })
            .unwrap();

        assert_eq!(value, "only");
        assert_eq!(account.swaps, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_retry_swaps_handles() {
        let pool = pool();
        let retry = retry_for(&pool, RetryConfig::default());
        let mut account = AdAccount::new("a");
        let mut seen = Vec::new();

        let result = retry
            .run_async_with_stats(
                &mut account,
                |err: &RequestError| *err == RequestError::Transient,
                |handle| {
                    seen.push(handle);
                    let outcome = if handle == "c" {
                        Ok(handle)
                    } else {
                        Err(RequestError::Transient)
                    };
                    async move { outcome }
                },
            )
            .await;

        assert_eq!(result.result.unwrap(), "c");
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(result.total_delay, Duration::from_secs(6 + 12));
        assert_eq!(account.swaps, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_non_matching_error() {
        let pool = pool();
        let retry = retry_for(&pool, RetryConfig::default());
        let mut account = AdAccount::new("a");

        let result = retry
            .run_async_if(
                &mut account,
                |err: &RequestError| *err == RequestError::Transient,
                |_| async { Err::<(), _>(RequestError::Rejected) },
            )
            .await;

        assert!(matches!(
            result,
            Err(RetryError::Operation(RequestError::Rejected))
        ));
        assert_eq!(pool.stats(), PoolStats { active: 3, awaiting: 0 });
    }
}
