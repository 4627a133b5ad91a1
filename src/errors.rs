//! The crate's error taxonomy. Every fallible DCV operation returns
//! [`DcvError`]; the four wire/transport-facing variants
//! ([`DcvError::UnknownHost`], [`DcvError::TextParse`], [`DcvError::Io`],
//! [`DcvError::RecordNotFound`]) are what a DNS or HTTP lookup can fail
//! with, and [`DcvError::DnssecFailure`] covers the one DNSSEC outcome this
//! crate reports (the resolver's AD bit was expected but absent) without
//! ever performing chain-of-trust validation itself.

use crate::dns::Type;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DcvError {
    /// The candidate host had no usable address (NXDOMAIN, or every
    /// candidate FQDN exhausted without a resolver answering at all).
    #[error("unknown host: {0}")]
    UnknownHost(String),

    /// A record of the requested type was looked up successfully, but the
    /// answer section was empty, or the record's payload didn't contain the
    /// text this method needed.
    #[error("record not found: {name} {rtype}")]
    RecordNotFound { name: String, rtype: Type },

    /// A record was found but its content could not be parsed the way the
    /// method expected (malformed Request Token, non-UTF8 TXT content,
    /// unparsable CAA property value, etc).
    #[error("failed to parse response content: {0}")]
    TextParse(String),

    /// DNSSEC was requested (the extended `dnssec_ok` bit was set) but the
    /// resolver's response did not come back with `ad` set.
    #[error("dnssec validation failed for {0}")]
    DnssecFailure(String),

    /// Wraps any lower-level transport failure: socket errors, connect
    /// timeouts, TLS handshake failures, and malformed wire-format messages.
    #[error("i/o error: {0}")]
    Io(String),

    /// A `Config`/`ConfigBuilder` value failed validation (e.g.
    /// `mpicTotalSecondaries` below the BRs' minimum quorum size).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Multi-Perspective Issuance Corroboration ran to completion but the
    /// quorum of agreeing perspectives required by [`crate::config::Config`]
    /// was not reached.
    #[error("corroboration quorum not met: {0}")]
    QuorumNotMet(String),

    /// The [`crate::state::ValidationState`] handle presented to `validate`
    /// is older than its method's configured validity period.
    #[error("validation state has expired")]
    Expired,

    /// The caller asked for a [`crate::Method`] this build doesn't support
    /// (its cargo feature is disabled).
    #[error("method not supported: {0}")]
    UnsupportedMethod(String),

    /// Every candidate name/resolver pair a lookup tried failed, with more
    /// than one distinct error kind among them. Carries the union of those
    /// kinds (spec §4.3: "the client returns an empty record list plus the
    /// union of error kinds observed") rather than surfacing only the last
    /// one tried and masking the rest.
    #[error("{count} candidate(s) failed with distinct errors: {kinds}")]
    Aggregate { count: usize, kinds: String },
}

impl From<std::io::Error> for DcvError {
    fn from(e: std::io::Error) -> Self {
        DcvError::Io(e.to_string())
    }
}

impl From<reqwest::Error> for DcvError {
    fn from(e: reqwest::Error) -> Self {
        DcvError::Io(e.to_string())
    }
}
