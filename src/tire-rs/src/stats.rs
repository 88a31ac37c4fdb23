use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Response, Result};

/// Request counters shared by every clone of a client
#[derive(Debug, Default)]
pub struct ClientStats {
    requests: AtomicU64,
    connection_failures: AtomicU64,
    engine_errors: AtomicU64,
    searches: AtomicU64,
    engine_time_ms: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub connection_failures: u64,
    pub engine_errors: u64,
    pub searches: u64,
    pub engine_time_ms: u64,
}

impl StatsSnapshot {
    pub fn error_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            (self.connection_failures + self.engine_errors) as f64 / self.requests as f64
        }
    }
}

impl ClientStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, outcome: &Result<Response>) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Ok(response) if !response.is_success() && !response.is_not_found() => {
                self.engine_errors.fetch_add(1, Ordering::Relaxed);
            }
            Err(Error::Connection(_)) | Err(Error::PoolTimeout(_)) => {
                self.connection_failures.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub(crate) fn record_search(&self, took_ms: u64) {
        self.searches.fetch_add(1, Ordering::Relaxed);
        self.engine_time_ms.fetch_add(took_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            engine_errors: self.engine_errors.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            engine_time_ms: self.engine_time_ms.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let stats = ClientStats::new();
        stats.record(&Ok(Response::new(200, "{}")));
        stats.record(&Ok(Response::new(404, "{}")));
        stats.record(&Ok(Response::new(500, "{}")));
        stats.record(&Err(Error::Connection("refused".to_string())));
        stats.record_search(12);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests, 4);
        assert_eq!(snapshot.engine_errors, 1);
        assert_eq!(snapshot.connection_failures, 1);
        assert_eq!(snapshot.searches, 1);
        assert_eq!(snapshot.engine_time_ms, 12);
        assert!((snapshot.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_error_rate() {
        assert_eq!(StatsSnapshot::default().error_rate(), 0.0);
    }
}
