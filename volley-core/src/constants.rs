/// Response statuses counted as a successful call (2xx and 3xx).
pub const SUCCESS_STATUS_RANGE: std::ops::RangeInclusive<u16> = 200..=399;

/// Header carrying the bearer credential when a workload has an auth token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

pub const DEFAULT_OPERATIONS: u64 = 1;

pub const DEFAULT_CONCURRENCY: u64 = 1;
