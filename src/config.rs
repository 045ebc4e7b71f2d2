use std::env;

use crate::scheduler::RunOptions;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_workers: usize,
    pub desired_chunk_size: usize,
    pub progress_interval: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("PORT", defaults.port),
            max_workers: env_or("MAX_WORKERS", defaults.max_workers),
            desired_chunk_size: env_or("DESIRED_CHUNK_SIZE", defaults.desired_chunk_size),
            progress_interval: env_or("PROGRESS_INTERVAL", defaults.progress_interval),
        }
    }

    /// Run options for one request, letting the request override the
    /// configured worker bounds.
    pub fn run_options(
        &self,
        max_workers: Option<usize>,
        desired_chunk_size: Option<usize>,
    ) -> RunOptions {
        RunOptions {
            max_workers: max_workers.unwrap_or(self.max_workers).max(1),
            desired_chunk_size: desired_chunk_size.unwrap_or(self.desired_chunk_size).max(1),
            report_interval: self.progress_interval.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = RunOptions::default();
        Self {
            port: 8080,
            max_workers: defaults.max_workers,
            desired_chunk_size: defaults.desired_chunk_size,
            progress_interval: defaults.report_interval,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
