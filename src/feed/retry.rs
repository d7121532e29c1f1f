use crate::config::types::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// What the feed returned when it throttled a request.
#[derive(Debug, Clone)]
pub struct ThrottleSignal {
    pub uri: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// 1 for the first throttled response to this URI.
    pub attempt: u32,
}

impl ThrottleSignal {
    /// `Retry-After` in seconds, when the feed sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
            .and_then(|(_, value)| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Wait(Duration),
    GiveUp,
}

pub trait RetryPolicy: Send + Sync {
    /// Called for every throttled response before the same request is reissued.
    fn on_throttled(&self, signal: &ThrottleSignal) -> RetryDecision;

    /// Called after the `attempt`-th consecutive transient failure of a request.
    fn on_transient(&self, attempt: u32) -> RetryDecision;
}

/// Constant wait between retries.
///
/// With the defaults this retries throttled requests forever, 10 seconds
/// apart, and transient failures three times.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    interval: Duration,
    jitter: Duration,
    max_attempts: Option<u32>,
    transient_retries: u32,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl FixedDelay {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            interval: config.interval,
            jitter: config.jitter,
            max_attempts: config.max_attempts,
            transient_retries: config.transient_retries,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        self.interval + Duration::from_millis(extra)
    }
}

impl RetryPolicy for FixedDelay {
    fn on_throttled(&self, signal: &ThrottleSignal) -> RetryDecision {
        match self.max_attempts {
            Some(max) if signal.attempt >= max => RetryDecision::GiveUp,
            _ => RetryDecision::Wait(self.delay()),
        }
    }

    fn on_transient(&self, attempt: u32) -> RetryDecision {
        if attempt > self.transient_retries {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Wait(self.delay())
        }
    }
}
