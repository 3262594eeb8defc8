//! Bounded pool for independent per-symbol HTTP fetches.

use crate::error::FetchResult;
use futures::StreamExt;
use futures::stream;
use rand::Rng;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const MAX_WORKERS: usize = 16;

/// Random pause taken by a worker after each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Jitter {
    pub const NONE: Jitter = Jitter { min_ms: 0, max_ms: 0 };

    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    fn pick(&self) -> Duration {
        if self.max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

/// Runs `fetch` for every symbol with at most `workers` requests in flight.
///
/// Failures are logged with the symbol and dropped; only successful results
/// come back, keyed by symbol. Completion order is not preserved.
pub async fn fetch_all<T, F, Fut>(
    symbols: &[String],
    workers: usize,
    jitter: Jitter,
    fetch: F,
) -> BTreeMap<String, T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let workers = workers.clamp(1, MAX_WORKERS);
    let start_time = Instant::now();
    info!(symbols = symbols.len(), workers, "Starting fetch");

    let outcomes: Vec<(String, FetchResult<T>)> = stream::iter(symbols.iter().cloned())
        .map(|symbol| {
            let request = fetch(symbol.clone());
            async move {
                let result = request.await;
                let pause = jitter.pick();
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                (symbol, result)
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let mut results = BTreeMap::new();
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                debug!(ticker = %symbol, "Fetched");
                results.insert(symbol, value);
            }
            Err(e) => warn!(ticker = %symbol, error = %e, "Skipping ticker"),
        }
    }

    info!(
        fetched = results.len(),
        skipped = symbols.len() - results.len(),
        elapsed_s = start_time.elapsed().as_secs_f64(),
        "Fetch finished"
    );
    results
}
