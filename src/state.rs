//! [`ValidationState`]: the opaque handle `prepare` returns and `validate`
//! is re-supplied. The library holds no mutable global state — everything
//! a validate call needs travels inside this value.

use crate::method::Method;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// `(domain, prepareTime, method)`, serializable so a caller can persist it
/// between the prepare and validate calls (and, if they choose, sign it —
/// this crate does not sign or encrypt the handle itself).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationState {
    pub domain: String,
    pub prepare_time: SystemTime,
    pub method: Method,
}

impl ValidationState {
    pub fn new(domain: impl Into<String>, method: Method) -> Self {
        ValidationState {
            domain: domain.into(),
            prepare_time: SystemTime::now(),
            method,
        }
    }

    pub fn is_expired(&self, validity_window: Duration, now: SystemTime) -> bool {
        now.duration_since(self.prepare_time)
            .map(|age| age > validity_window)
            .unwrap_or(false)
    }
}
