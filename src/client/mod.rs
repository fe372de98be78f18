//! Generation client - one prompt in, one completion out

mod openai;

pub use openai::OpenAiClient;

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::Result;

/// Text-generation service
#[allow(async_fn_in_trait)]
pub trait GenerationClient {
    /// Single attempt, no streaming
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Bounded retry for transient upstream failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(250),
        }
    }

    /// Exponential backoff plus random jitter. `attempt` is 1-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        backoff + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Call `client`, retrying only errors that report themselves transient
pub async fn complete_with_retry<C: GenerationClient>(
    client: &C,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    let mut attempt = 1;
    loop {
        match client.complete(prompt).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "generation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabError;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedClient {
        replies: RefCell<VecDeque<Result<String>>>,
        calls: RefCell<u32>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl GenerationClient for ScriptedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            *self.calls.borrow_mut() += 1;
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(LabError::Network("script exhausted".into())))
        }
    }

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let client = ScriptedClient::new(vec![Err(LabError::RateLimited), Ok("[]".into())]);
        let res = complete_with_retry(&client, "p", &instant(1)).await;
        assert!(matches!(res, Err(LabError::RateLimited)));
        assert_eq!(*client.calls.borrow(), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let client = ScriptedClient::new(vec![
            Err(LabError::Network("reset".into())),
            Err(LabError::Api { status: 502, message: "bad gateway".into() }),
            Ok("[]".into()),
        ]);
        let res = complete_with_retry(&client, "p", &instant(3)).await.unwrap();
        assert_eq!(res, "[]");
        assert_eq!(*client.calls.borrow(), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_auth() {
        let client =
            ScriptedClient::new(vec![Err(LabError::Auth("bad key".into())), Ok("[]".into())]);
        let res = complete_with_retry(&client, "p", &instant(3)).await;
        assert!(matches!(res, Err(LabError::Auth(_))));
        assert_eq!(*client.calls.borrow(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let client = ScriptedClient::new(vec![
            Err(LabError::Timeout(30)),
            Err(LabError::Timeout(30)),
            Ok("[]".into()),
        ]);
        let res = complete_with_retry(&client, "p", &instant(2)).await;
        assert!(matches!(res, Err(LabError::Timeout(30))));
        assert_eq!(*client.calls.borrow(), 2);
    }

    #[test]
    fn test_delay_grows_and_stays_bounded() {
        let policy = RetryPolicy::new(3);
        let first = policy.delay_for(1);
        let second = policy.delay_for(2);
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(750));
        assert!(second >= Duration::from_millis(1000) && second <= Duration::from_millis(1250));
    }

    #[test]
    fn test_policy_never_below_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::default(), RetryPolicy::none());
    }
}
