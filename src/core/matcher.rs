//! TimeoutMatcher: regex matching under a wall-clock deadline
//!
//! Every match runs on the blocking pool and is raced against a deadline.
//! A late match is dropped and reported as "no match", never as an error.

use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

/// Captured groups of one match: index 0 is the whole match.
pub type Groups = Vec<Option<String>>;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutMatcher {
    timeout: Duration,
}

impl Default for TimeoutMatcher {
    fn default() -> Self { Self::new(Duration::from_millis(crate::core::paths::defaults::MATCH_TIMEOUT_MS)) }
}

impl TimeoutMatcher {
    pub fn new(timeout: Duration) -> Self { Self { timeout } }
    pub fn timeout(&self) -> Duration { self.timeout }

    /// Run `job` in an isolated blocking task; `None` if it misses the deadline or panics.
    pub async fn run<T, F>(&self, job: F) -> Option<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(self.timeout, tokio::task::spawn_blocking(job)).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "match task failed");
                None
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "match timed out");
                None
            }
        }
    }

    /// Captures of the first match of `regex` in `text`.
    pub async fn captures(&self, regex: &Arc<Regex>, text: &str) -> Option<Groups> {
        let (re, text) = (Arc::clone(regex), text.to_string());
        self.run(move || {
            re.captures(&text)
                .map(|c| c.iter().map(|m| m.map(|m| m.as_str().to_string())).collect::<Groups>())
        })
        .await
        .flatten()
    }

    pub async fn is_match(&self, regex: &Arc<Regex>, text: &str) -> bool {
        let (re, text) = (Arc::clone(regex), text.to_string());
        self.run(move || re.is_match(&text)).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_groups() {
        let m = TimeoutMatcher::default();
        let re = Arc::new(Regex::new(r"^(?:hello (.*))$").unwrap());
        let groups = m.captures(&re, "hello world").await.unwrap();
        assert_eq!(groups[0].as_deref(), Some("hello world"));
        assert_eq!(groups[1].as_deref(), Some("world"));
        assert!(m.captures(&re, "goodbye").await.is_none());
    }

    #[tokio::test]
    async fn test_deadline_is_no_match() {
        let m = TimeoutMatcher::new(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let late = m.run(|| { std::thread::sleep(Duration::from_millis(300)); true }).await;
        assert!(late.is_none());
        assert!(started.elapsed() < Duration::from_millis(250));
    }
}
