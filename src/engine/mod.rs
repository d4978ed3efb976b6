//! External engine access
//!
//! - `command`: engine argv construction
//! - `invoker`: spawn, capture, timeout
//! - `envelope`: classify raw output into a result envelope
//! - `pool`: bound the number of engines running at once
//!
//! [`EngineRunner`] ties them together for the route handlers.

pub mod command;
pub mod envelope;
pub mod invoker;
pub mod pool;

pub use command::{build_engine_args, EngineCall};
pub use envelope::{codes, normalize, ErrorInfo, ResultEnvelope};
pub use invoker::{invoke, InvocationOutcome, InvocationRequest};
pub use pool::{EnginePool, PoolError};

use std::path::PathBuf;
use std::time::Duration;

use crate::config::EngineConfig;

/// Runs engine calls with the configured command, timeout and concurrency bound
#[derive(Debug)]
pub struct EngineRunner {
    command: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    mock: bool,
    pool: EnginePool,
}

impl EngineRunner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            command: config.command.clone(),
            working_dir: config.working_dir.clone(),
            timeout: config.timeout(),
            mock: config.mock,
            pool: EnginePool::new(config.max_concurrent, config.max_queued),
        }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn pool(&self) -> &EnginePool {
        &self.pool
    }

    /// Run one call through the pool, the invoker and the normalizer
    pub async fn run(&self, call: &EngineCall) -> ResultEnvelope {
        let argv = match build_engine_args(&self.command, call, self.mock) {
            Ok(argv) => argv,
            Err(e) => {
                return ResultEnvelope::Failure {
                    error: ErrorInfo::new(
                        codes::SERVER_ERROR,
                        format!("Failed to encode engine arguments: {}", e),
                    ),
                    exit_code: invoker::NO_EXIT_CODE,
                };
            }
        };

        let _slot = match self.pool.acquire().await {
            Ok(slot) => slot,
            Err(e) => {
                return ResultEnvelope::Failure {
                    error: ErrorInfo::new(codes::ENGINE_BUSY, e.to_string()),
                    exit_code: invoker::NO_EXIT_CODE,
                };
            }
        };

        let request = InvocationRequest::new(argv)
            .with_timeout(self.timeout)
            .with_working_dir(self.working_dir.clone());

        log::debug!("Running engine mode={} round={}", call.mode, call.round);
        let outcome = invoke(&request).await;
        normalize(&outcome)
    }
}
