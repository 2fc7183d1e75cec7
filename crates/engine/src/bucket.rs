//! Per-user token buckets for advisory rate limiting.
//!
//! A bucket grants `max_tokens` operations per `reset_interval` seconds.
//! Buckets serialize to a fixed 32-byte record value (four i64 fields,
//! little-endian) and live under the reserved internal key prefix.

use crate::error::{EngineError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Serialized size: max_tokens, tokens, timestamp, reset_interval.
pub const BUCKET_BYTES: usize = 32;

/// Checks rate-limit parameters. Shared with config validation.
pub fn validate_params(max_tokens: i64, reset_interval: i64) -> Result<()> {
    if max_tokens <= 0 {
        return Err(EngineError::BadConfig(format!(
            "tokenbucket config: max_tokens must be a positive number, but {} was given",
            max_tokens
        )));
    }
    if reset_interval <= 0 {
        return Err(EngineError::BadConfig(format!(
            "tokenbucket config: reset_interval must be a positive number, but {} was given",
            reset_interval
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBucket {
    pub max_tokens: i64,
    pub tokens: i64,
    /// Start of the current interval, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Interval length in seconds.
    pub reset_interval: i64,
}

impl TokenBucket {
    /// A fresh, full bucket whose interval starts now.
    #[must_use]
    pub fn new(max_tokens: i64, reset_interval: i64) -> Self {
        Self {
            max_tokens,
            tokens: max_tokens,
            timestamp: unix_now(),
            reset_interval,
        }
    }

    /// Takes one token if available. When the interval has elapsed the
    /// bucket refills first (minus the token being taken).
    pub fn try_consume(&mut self) -> bool {
        let now = unix_now();
        if now - self.timestamp > self.reset_interval {
            self.timestamp = now;
            self.tokens = self.max_tokens - 1;
            return true;
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            return true;
        }

        false
    }

    /// Seconds until the bucket refills; surfaced in the rejection error.
    #[must_use]
    pub fn retry_in_secs(&self) -> i64 {
        (self.reset_interval - (unix_now() - self.timestamp)).max(0)
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BUCKET_BYTES);
        out.extend_from_slice(&self.max_tokens.to_le_bytes());
        out.extend_from_slice(&self.tokens.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.reset_interval.to_le_bytes());
        out
    }

    /// Decodes a bucket record value; `None` if the value has the wrong
    /// size (the bucket is then recreated fresh).
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != BUCKET_BYTES {
            return None;
        }
        let field = |i: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            i64::from_le_bytes(buf)
        };
        Some(Self {
            max_tokens: field(0),
            tokens: field(1),
            timestamp: field(2),
            reset_interval: field(3),
        })
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
