//! Runtime configuration shared by the decider and the activity worker

use std::time::Duration;

use crate::identity::generate_identity;
use crate::reliability::RetryPolicy;

/// Validation errors reported synchronously at startup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("domain must not be empty")]
    MissingDomain,

    #[error("task list must not be empty")]
    MissingTaskList,

    #[error("region must not be empty")]
    MissingRegion,
}

/// Configuration for a [`Decider`](crate::Decider) or an [`ActivityWorker`](crate::ActivityWorker)
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// SWS domain to poll
    pub domain: String,

    /// Task list to poll
    pub task_list: String,

    /// Poller identity; derived from the host when unset
    pub identity: Option<String>,

    /// Service region
    pub region: String,

    /// Maximum tasks in flight; 0 means unbounded
    pub max_workers: usize,

    /// Interval between activity heartbeats
    pub heartbeat_interval: Duration,

    /// Sleep after a failed poll before polling again
    pub poll_error_backoff: Duration,

    /// Retry policy for decision posts, history pages and terminal acknowledgements
    pub retry: RetryPolicy,
}

impl WorkerConfig {
    /// Create a configuration with default limits
    pub fn new(
        domain: impl Into<String>,
        task_list: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            task_list: task_list.into(),
            identity: None,
            region: region.into(),
            max_workers: 0,
            heartbeat_interval: Duration::from_secs(60),
            poll_error_backoff: Duration::from_secs(1),
            retry: RetryPolicy::acknowledgement(),
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `SWS_DOMAIN`, `SWS_TASK_LIST`: polling target
    /// - `SWS_REGION` or `AWS_REGION`: service region
    /// - `SWS_IDENTITY`: poller identity (optional)
    /// - `SWS_MAX_WORKERS`: pool size, 0 for unbounded (default 0)
    /// - `SWS_HEARTBEAT_SECS`: heartbeat interval (default 60)
    pub fn from_env() -> Self {
        let region = std::env::var("SWS_REGION")
            .or_else(|_| std::env::var("AWS_REGION"))
            .unwrap_or_default();

        let mut config = Self::new(
            std::env::var("SWS_DOMAIN").unwrap_or_default(),
            std::env::var("SWS_TASK_LIST").unwrap_or_default(),
            region,
        );

        config.identity = std::env::var("SWS_IDENTITY")
            .ok()
            .filter(|s| !s.is_empty());

        config.max_workers = std::env::var("SWS_MAX_WORKERS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        if let Some(secs) = std::env::var("SWS_HEARTBEAT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.heartbeat_interval = Duration::from_secs(secs);
        }

        config
    }

    /// Set the poller identity
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Set the pool size (0 = unbounded)
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the backoff after a failed poll
    pub fn with_poll_error_backoff(mut self, backoff: Duration) -> Self {
        self.poll_error_backoff = backoff;
        self
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check that the polling target is fully specified
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::MissingDomain);
        }
        if self.task_list.trim().is_empty() {
            return Err(ConfigError::MissingTaskList);
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingRegion);
        }
        Ok(())
    }

    /// The configured identity, or a freshly derived one
    pub fn resolved_identity(&self) -> String {
        match &self.identity {
            Some(identity) if !identity.is_empty() => identity.clone(),
            _ => generate_identity(),
        }
    }
}
