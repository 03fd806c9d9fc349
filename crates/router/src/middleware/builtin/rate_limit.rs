use crate::PathParams;
use crate::error::BoxError;
use crate::middleware::{Flow, Middleware};
use crate::view::{RequestView, ResponseView};
use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

/// Allows at most `max_requests` per client within a sliding `window`.
///
/// Clients are told apart by remote IP address; requests without one share a single budget.
/// State lives in memory and is not shared between router instances. Clients whose hits have
/// all left the window are evicted, at most once per window.
#[derive(Debug)]
pub struct RateLimit {
    max_requests: usize,
    window: Duration,
    hits: Mutex<Hits>,
}

#[derive(Debug, Default)]
struct Hits {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl Hits {
    fn sweep(&mut self, now: Instant, window: Duration) {
        if self.last_sweep.is_some_and(|last| now.duration_since(last) < window) {
            return;
        }
        self.clients.retain(|_, hits| hits.back().is_some_and(|&hit| now.duration_since(hit) < window));
        self.last_sweep = Some(now);
    }
}

pub fn rate_limit(max_requests: usize, window: Duration) -> RateLimit {
    RateLimit { max_requests, window, hits: Mutex::new(Hits::default()) }
}

impl RateLimit {
    /// Records a hit for `client` at `now`, returning false when the budget is used up.
    fn try_acquire(&self, client: String, now: Instant) -> bool {
        let mut hits = self.hits.lock();
        hits.sweep(now, self.window);

        let window = hits.clients.entry(client).or_default();
        while window.front().is_some_and(|&hit| now.duration_since(hit) >= self.window) {
            window.pop_front();
        }

        if window.len() >= self.max_requests {
            return false;
        }
        window.push_back(now);
        true
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.hits.lock().clients.len()
    }
}

#[async_trait]
impl Middleware for RateLimit {
    async fn handle(
        &self,
        req: &mut dyn RequestView,
        resp: &mut dyn ResponseView,
        _params: &PathParams<'_, '_>,
    ) -> Result<Flow, BoxError> {
        let client = req.remote_addr().map_or_else(|| "unknown".to_owned(), |addr| addr.ip().to_string());
        if self.try_acquire(client, Instant::now()) {
            return Ok(Flow::Continue);
        }

        debug!(path = req.path(), "rate limit exceeded");
        resp.with_error("Rate limit exceeded. Try again later.", StatusCode::TOO_MANY_REQUESTS);
        Ok(Flow::Halt)
    }
}
