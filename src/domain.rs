//! Domain-name normalization and Public Suffix List lookups.
//!
//! Replaces the teacher's punycode-based `Name` type: IDNA normalization is
//! handled the same way [`crate::dns::Message`] normalizes qnames, and
//! registrable-domain computation is delegated to the `psl` crate rather
//! than hand-rolled, with a caller-supplied override hook consulted first.

use crate::errors::DcvError;
use std::sync::OnceLock;

/// Receives a domain first and may return an override registrable suffix;
/// the built-in Public Suffix List is consulted only if this returns
/// `None`. Installed once via [`set_psl_override`].
pub type PslOverrideSupplier = dyn Fn(&str) -> Option<String> + Send + Sync;

static PSL_OVERRIDE: OnceLock<Box<PslOverrideSupplier>> = OnceLock::new();

/// Installs a process-wide PSL override hook. Intended to be called once,
/// at startup, by the embedding application (e.g. to treat an internal
/// private registry's suffixes as public ones). Returns `false` if a hook
/// was already installed.
pub fn set_psl_override(f: Box<PslOverrideSupplier>) -> bool {
    PSL_OVERRIDE.set(f).is_ok()
}

/// Lower-cases and IDNA-normalizes `domain`, ensuring wildcard labels
/// (`*.`) are preserved verbatim rather than punycode-mangled.
pub fn normalize(domain: &str) -> Result<String, DcvError> {
    let domain = domain.trim().trim_end_matches('.');

    if domain.is_empty() {
        return Err(DcvError::TextParse("domain required".to_string()));
    }

    let (label, rest) = match domain.strip_prefix("*.") {
        Some(rest) => ("*.", rest),
        None => ("", domain),
    };

    let ascii = idna::domain_to_ascii(rest)
        .map_err(|e| DcvError::TextParse(format!("invalid domain '{}': {:?}", domain, e)))?;

    Ok(format!("{}{}", label, ascii.to_lowercase()))
}

pub fn is_wildcard(domain: &str) -> bool {
    domain.starts_with("*.")
}

/// Strips a leading wildcard label, if present.
pub fn bare(domain: &str) -> &str {
    domain.strip_prefix("*.").unwrap_or(domain)
}

/// Returns the registrable domain: the override hook's answer if it
/// returns one, otherwise the shortest suffix of `domain` that has one
/// label more than the longest matching Public Suffix List entry.
pub fn registrable_domain(domain: &str) -> Option<String> {
    let domain = bare(domain);

    if let Some(hook) = PSL_OVERRIDE.get() {
        if let Some(overridden) = hook(domain) {
            return Some(overridden);
        }
    }

    psl::domain(domain.as_bytes()).map(|d| String::from_utf8_lossy(d.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_trailing_dot() {
        assert_eq!(normalize("Example.COM.").unwrap(), "example.com");
    }

    #[test]
    fn normalize_preserves_wildcard() {
        assert_eq!(normalize("*.Example.com").unwrap(), "*.example.com");
    }

    #[test]
    fn registrable_domain_of_subdomain() {
        assert_eq!(registrable_domain("www.example.co.uk").as_deref(), Some("example.co.uk"));
    }
}
