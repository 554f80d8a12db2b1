use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::ErrorResponse;

/// Fixed-window counter for one key
#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        // Reset if window expired
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Sharded rate limiter to reduce lock contention
///
/// Keys are hashed to pick one of several independently locked maps.
#[derive(Clone)]
pub struct HttpRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitBucket>>>>,
    limit: u32,
    window: Duration,
    max_buckets: usize,
}

impl HttpRateLimiter {
    /// `limit` requests per `window` for each key, 16 shards.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_shards(limit, window, 16)
    }

    pub fn with_shards(limit: u32, window: Duration, shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            limit,
            window,
            max_buckets: 10_000,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Drop buckets whose window ended more than one window ago.
    pub async fn cleanup_expired_buckets(&self) {
        let now = Instant::now();
        let grace_period = self.window;
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_key, bucket| {
                bucket.reset_at > now || (now - bucket.reset_at) < grace_period
            });
            total_cleaned += before - buckets.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets"
            );
        }
    }

    /// Count one request against `key`. Returns the remaining allowance, or the time until
    /// the window resets when the key is over its limit.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let shard = &self.shards[self.shard_index(key)];
        let mut buckets = shard.lock().await;

        if buckets.len() >= self.max_buckets {
            let now = Instant::now();
            let grace_period = self.window;
            buckets.retain(|_key, bucket| {
                bucket.reset_at > now || (now - bucket.reset_at) < grace_period
            });

            if buckets.len() >= self.max_buckets {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(key_to_remove) = oldest_key {
                    buckets.remove(&key_to_remove);
                }
            }
        }

        let window = self.window;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(window));

        let (allowed, remaining) = bucket.check_and_increment(self.limit, window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }
}

fn rate_limit_key(request: &Request) -> String {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!("ip:{}:{}", ip, request.uri().path())
}

/// HTTP rate limiting middleware, keyed by client IP and endpoint.
///
/// Adds `X-RateLimit-Limit` and `X-RateLimit-Remaining` to every response, and
/// `Retry-After` on `429 Too Many Requests`.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<HttpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = rate_limit_key(&request);
    let limit = rate_limiter.limit();

    let (mut response, remaining, retry_after) = match rate_limiter.check_rate_limit(&key).await
    {
        Ok(remaining) => (next.run(request).await, remaining, None),
        Err(reset_in) => {
            tracing::warn!(rate_limit_key = %key, limit, "Rate limit exceeded");
            let response = (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(ErrorResponse::new(
                    "too many requests, slow down!",
                    "RATE_LIMITED",
                )),
            )
                .into_response();
            (response, 0, Some(reset_in.as_secs().max(1)))
        }
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Some(seconds) = retry_after {
        if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
            headers.insert("Retry-After", value);
        }
    }

    response
}
