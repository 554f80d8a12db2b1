//! Storage name allocation.

use std::sync::Arc;

const MAX_ORIGINAL_NAME_LENGTH: usize = 200;
const FALLBACK_NAME: &str = "upload";

/// Source of the millisecond timestamp used as the storage name prefix.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock frozen at a given instant, for tests and reproducible runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Reduce a client-supplied filename to a single safe path segment.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]` becomes `_`.
/// Names that are already safe are returned unchanged.
pub fn sanitize_original_name(original: &str) -> String {
    let last_segment = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let sanitized: String = last_segment
        .chars()
        .take(MAX_ORIGINAL_NAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        return FALLBACK_NAME.to_string();
    }

    sanitized
}

/// Derives storage names of the form `<unixMillis>-<originalName>`.
#[derive(Clone)]
pub struct NameAllocator {
    clock: Arc<dyn Clock>,
}

impl NameAllocator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Allocate a storage name. Performs no I/O and does not check for collisions.
    pub fn allocate(&self, original_name: &str) -> String {
        format!(
            "{}-{}",
            self.clock.now_millis(),
            sanitize_original_name(original_name)
        )
    }

    /// Allocate a name that cannot collide with [`allocate`](Self::allocate) output for the
    /// same millisecond, by inserting a random token after the timestamp.
    pub fn allocate_disambiguated(&self, original_name: &str) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            self.clock.now_millis(),
            &token[..8],
            sanitize_original_name(original_name)
        )
    }
}

impl std::fmt::Debug for NameAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameAllocator").finish_non_exhaustive()
    }
}
