//! Strategy configuration surface and the compile-time registry.
//!
//! Strategy selection is a plain enum mapped to constructors, not runtime
//! class loading. Construction fails fast: a strategy refuses to start with
//! undefined firing behavior.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    CottrellPool, CottrellTimedPool, DynamicPool, NoDelay, OutputStrategy, RandomDelay,
    SynchronousBatch, ThresholdBatch, ThresholdOrTimedBatch, TimedBatch, Wiring,
};

/// Which output strategy a node runs, with its named parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Zero added latency baseline.
    NoDelay,
    /// Fixed-size batch (`BATCH_SIZE`).
    SynchronousBatch { batch_size: usize },
    /// Recurring full drain (`SENDING_RATE`, milliseconds).
    TimedBatch { sending_rate_ms: u64 },
    /// Threshold pool (`THRESHOLD`, `POOL_SIZE`).
    ThresholdBatch { threshold: usize, pool_size: usize },
    /// Size or timer, whichever first (`BATCH_SIZE`, `SENDING_RATE`).
    ThresholdOrTimedBatch { batch_size: usize, sending_rate_ms: u64 },
    /// Constant-size replacement pool (`POOL_SIZE`).
    CottrellPool { pool_size: usize },
    /// Timed excess drain (`POOL_SIZE`, `SENDING_RATE`).
    CottrellTimedPool { pool_size: usize, sending_rate_ms: u64 },
    /// Fractional timed drain (`SENDING_RATE`, `MIN_MESSAGES`, `FRACTION`).
    DynamicPool {
        sending_rate_ms: u64,
        min_messages: usize,
        fraction: f64,
    },
    /// Independent per-message delay (`MAX_RANDOM_DELAY`, milliseconds).
    RandomDelay { max_delay_ms: u64 },
}

impl StrategyConfig {
    /// Checks the parameter set without building anything, so a node can
    /// reject its configuration before wiring collaborators.
    pub fn validate(&self) -> Result<(), StrategyError> {
        use StrategyConfig::*;
        match *self {
            NoDelay => Ok(()),
            SynchronousBatch { batch_size } => positive(batch_size, "BATCH_SIZE"),
            TimedBatch { sending_rate_ms } => positive_ms(sending_rate_ms, "SENDING_RATE"),
            ThresholdBatch {
                threshold,
                pool_size,
            } => {
                positive(threshold, "THRESHOLD")?;
                if threshold <= pool_size {
                    return Err(StrategyError::ThresholdTooSmall {
                        threshold,
                        pool_size,
                    });
                }
                Ok(())
            }
            ThresholdOrTimedBatch {
                batch_size,
                sending_rate_ms,
            } => {
                positive(batch_size, "BATCH_SIZE")?;
                positive_ms(sending_rate_ms, "SENDING_RATE")
            }
            CottrellPool { pool_size } => positive(pool_size, "POOL_SIZE"),
            CottrellTimedPool {
                pool_size,
                sending_rate_ms,
            } => {
                positive(pool_size, "POOL_SIZE")?;
                positive_ms(sending_rate_ms, "SENDING_RATE")
            }
            DynamicPool {
                sending_rate_ms,
                min_messages: _,
                fraction,
            } => {
                positive_ms(sending_rate_ms, "SENDING_RATE")?;
                if fraction > 0.0 && fraction <= 1.0 {
                    Ok(())
                } else {
                    Err(StrategyError::FractionOutOfRange(fraction))
                }
            }
            RandomDelay { max_delay_ms } => positive_ms(max_delay_ms, "MAX_RANDOM_DELAY"),
        }
    }
}

fn positive(value: usize, name: &'static str) -> Result<(), StrategyError> {
    if value == 0 {
        Err(StrategyError::ParameterNotPositive { name })
    } else {
        Ok(())
    }
}

fn positive_ms(value: u64, name: &'static str) -> Result<(), StrategyError> {
    if value == 0 {
        Err(StrategyError::ParameterNotPositive { name })
    } else {
        Ok(())
    }
}

/// Configuration rejections; all fatal at construction.
#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    /// A required parameter is absent or zero.
    #[error("{name} must be a positive value")]
    ParameterNotPositive { name: &'static str },

    /// The threshold pool would never release anything.
    #[error("THRESHOLD ({threshold}) must exceed POOL_SIZE ({pool_size})")]
    ThresholdTooSmall { threshold: usize, pool_size: usize },

    /// The dynamic pool fraction must lie in `(0, 1]`.
    #[error("FRACTION must lie in (0, 1], got {0}")]
    FractionOutOfRange(f64),
}

/// Builds the configured strategy against the given collaborators.
pub fn build(
    config: &StrategyConfig,
    wiring: Wiring,
) -> Result<Arc<dyn OutputStrategy>, StrategyError> {
    config.validate()?;
    debug!("output strategy configured: {config:?}");
    let wiring = Arc::new(wiring);
    let strategy: Arc<dyn OutputStrategy> = match *config {
        StrategyConfig::NoDelay => Arc::new(NoDelay::new(wiring)),
        StrategyConfig::SynchronousBatch { batch_size } => {
            Arc::new(SynchronousBatch::new(batch_size, wiring))
        }
        StrategyConfig::TimedBatch { sending_rate_ms } => Arc::new(TimedBatch::new(
            Duration::from_millis(sending_rate_ms),
            wiring,
        )),
        StrategyConfig::ThresholdBatch {
            threshold,
            pool_size,
        } => Arc::new(ThresholdBatch::new(threshold, pool_size, wiring)),
        StrategyConfig::ThresholdOrTimedBatch {
            batch_size,
            sending_rate_ms,
        } => Arc::new(ThresholdOrTimedBatch::new(
            batch_size,
            Duration::from_millis(sending_rate_ms),
            wiring,
        )),
        StrategyConfig::CottrellPool { pool_size } => Arc::new(CottrellPool::new(pool_size, wiring)),
        StrategyConfig::CottrellTimedPool {
            pool_size,
            sending_rate_ms,
        } => Arc::new(CottrellTimedPool::new(
            pool_size,
            Duration::from_millis(sending_rate_ms),
            wiring,
        )),
        StrategyConfig::DynamicPool {
            sending_rate_ms,
            min_messages,
            fraction,
        } => Arc::new(DynamicPool::new(
            Duration::from_millis(sending_rate_ms),
            min_messages,
            fraction,
            wiring,
        )),
        StrategyConfig::RandomDelay { max_delay_ms } => Arc::new(RandomDelay::new(
            Duration::from_millis(max_delay_ms),
            wiring,
        )),
    };
    Ok(strategy)
}
