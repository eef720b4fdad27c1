//! Request signing for the field, user and order services.
//!
//! Every outbound request carries three headers derived from the target
//! service's name, its shared signature key and the current Unix time:
//!
//! - `x-service-name`: the configured service name
//! - `x-request-at`: the Unix timestamp (seconds) used for signing
//! - `x-api-key`: lowercase hex SHA-256 of `name:key:timestamp`
//!
//! The signature key itself is never transmitted. Signing is pure and
//! stateless apart from reading the clock, so a fresh signature is built
//! for every request (and every retry of a request).

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use sha2::{Digest, Sha256};

pub const HEADER_SERVICE_NAME: &str = "x-service-name";
pub const HEADER_REQUEST_AT: &str = "x-request-at";
pub const HEADER_API_KEY: &str = "x-api-key";

/// Source of the current Unix time in whole seconds.
pub trait Clock: Send + Sync {
    fn unix_seconds(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock pinned to one instant, for tests and reproducible signatures.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn unix_seconds(&self) -> i64 {
        self.0
    }
}

/// Result of signing: the timestamp that went into the hash and the hash itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub timestamp: i64,
    pub api_key: String,
}

/// Build the canonical string hashed into `x-api-key`.
pub fn canonical_string(service_name: &str, signature_key: &str, timestamp: i64) -> String {
    format!("{}:{}:{}", service_name, signature_key, timestamp)
}

/// Sign at an explicit instant.
pub fn sign_at(service_name: &str, signature_key: &str, timestamp: i64) -> Signature {
    let mut hasher = Sha256::new();
    hasher.update(canonical_string(service_name, signature_key, timestamp).as_bytes());
    Signature {
        timestamp,
        api_key: hex::encode(hasher.finalize()),
    }
}

/// Sign at the current instant of `clock`.
pub fn sign(service_name: &str, signature_key: &str, clock: &dyn Clock) -> Signature {
    sign_at(service_name, signature_key, clock.unix_seconds())
}

/// Signs requests for one backend service.
///
/// Cloning is cheap; the clock is shared.
#[derive(Clone)]
pub struct RequestSigner {
    service_name: String,
    signature_key: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("service_name", &self.service_name)
            .field("signature_key", &"<redacted>")
            .finish()
    }
}

impl RequestSigner {
    pub fn new(service_name: impl Into<String>, signature_key: impl Into<String>) -> Self {
        Self::with_clock(service_name, signature_key, Arc::new(SystemClock))
    }

    pub fn with_clock(
        service_name: impl Into<String>,
        signature_key: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            signature_key: signature_key.into(),
            clock,
        }
    }

    pub fn sign(&self) -> Signature {
        sign(&self.service_name, &self.signature_key, self.clock.as_ref())
    }

    /// Sign now and return the three signature headers.
    pub fn headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let signature = self.sign();
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(HEADER_SERVICE_NAME),
            HeaderValue::from_str(&self.service_name)?,
        );
        headers.insert(
            HeaderName::from_static(HEADER_REQUEST_AT),
            HeaderValue::from_str(&signature.timestamp.to_string())?,
        );
        headers.insert(
            HeaderName::from_static(HEADER_API_KEY),
            HeaderValue::from_str(&signature.api_key)?,
        );
        Ok(headers)
    }
}
