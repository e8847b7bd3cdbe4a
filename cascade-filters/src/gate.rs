//! Loading gate: wait until every loading indicator is hidden.
//!
//! Pages re-render dependent dropdowns and result tables asynchronously and
//! offer no completion event, so the gate polls indicator visibility through
//! the [`PageDriver`] and sleeps between checks.

use cascade_common::{CascadeError, Result};
use cascade_drivers::PageDriver;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default timeout for a single wait (15 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default interval between visibility checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// Lower bound on the poll sleep; a zero interval would spin without yielding time.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Which indicators to watch and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Selectors whose visibility means work is in flight.
    pub indicators: Vec<String>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Extra pause once idle, for content that keeps shifting after the
    /// spinner hides. Zero skips it.
    pub settle: Duration,
}

impl GateConfig {
    pub fn new(indicators: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            indicators: indicators.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            indicators: vec![
                ".loading".to_string(),
                ".spinner".to_string(),
                ".mantine-LoadingOverlay-root".to_string(),
            ],
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle: Duration::ZERO,
        }
    }
}

/// Wait until none of `config.indicators` is visible.
///
/// Returns immediately, without sleeping, when the indicator set is empty or
/// everything is already hidden. Fails with [`CascadeError::Timeout`] once
/// `config.timeout` has elapsed with an indicator still visible; the final
/// sleep is clamped to the remaining budget, so the error surfaces no later
/// than `timeout + poll_interval`. Driver errors abort the wait.
pub async fn await_idle(driver: &dyn PageDriver, config: &GateConfig) -> Result<()> {
    let start = Instant::now();
    let poll = config.poll_interval.max(MIN_POLL_INTERVAL);

    loop {
        let visible = visible_indicators(driver, &config.indicators).await?;
        let waited = start.elapsed();

        if visible.is_empty() {
            debug!(target: "cascade.gate", ?waited, "page idle");
            if !config.settle.is_zero() {
                driver.sleep(config.settle).await;
            }
            return Ok(());
        }

        if waited >= config.timeout {
            warn!(
                target: "cascade.gate",
                ?waited,
                visible = ?visible,
                "loading indicators still visible at deadline"
            );
            return Err(CascadeError::Timeout { waited, visible });
        }

        driver.sleep(poll.min(config.timeout - waited)).await;
    }
}

async fn visible_indicators(driver: &dyn PageDriver, indicators: &[String]) -> Result<Vec<String>> {
    let mut visible = Vec::new();
    for indicator in indicators {
        if driver.is_visible(indicator).await? {
            visible.push(indicator.clone());
        }
    }
    Ok(visible)
}
