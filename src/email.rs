//! Email-address discovery (spec §4.7): the three `EmailSource` strategies
//! a CA can use to find the address(es) it will send a random value to.
//!
//! Every discovered address is paired with its own, distinct random value —
//! the BR forbids reusing one random value across multiple mailboxes — and
//! carries the DNS record name it was found in (empty for `Constructed`).

use crate::domain;
use crate::dns::client::{DnsClient, Exchanger};
use crate::dns::resource::Resource;
use crate::dns::Type;
use crate::errors::DcvError;
use crate::random;
use lazy_static::lazy_static;
use regex::Regex;

/// The constructed local-parts BR §3.2.2.4.4 permits a CA to address.
const CONSTRUCTED_LOCAL_PARTS: [&str; 5] = ["admin", "administrator", "webmaster", "hostmaster", "postmaster"];

lazy_static! {
    /// A pragmatic RFC 5321 address shape check: local-part `@` domain,
    /// both non-empty, no embedded whitespace. This crate does not attempt
    /// full RFC 5321/5322 grammar — it rejects what obviously isn't an
    /// address rather than accepting everything that conceivably could be.
    static ref EMAIL_SHAPE: Regex = Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$").unwrap();
}

fn is_valid_address(addr: &str) -> bool {
    EMAIL_SHAPE.is_match(addr)
}

/// One discovered mailbox, paired with the distinct random value it will be
/// asked to confirm and the DNS record name (if any) it was found in.
#[derive(Clone, Debug)]
pub struct EmailCandidate {
    pub address: String,
    pub random_value: String,
    pub dns_record_name: String,
}

/// Emits `{admin,administrator,webmaster,hostmaster,postmaster}@<domain>`,
/// each paired with its own random value. Never touches the network.
pub fn constructed(domain: &str) -> Vec<EmailCandidate> {
    let domain = domain::bare(domain);
    CONSTRUCTED_LOCAL_PARTS
        .iter()
        .map(|local| EmailCandidate {
            address: format!("{}@{}", local, domain),
            random_value: random::generate(),
            dns_record_name: String::new(),
        })
        .collect()
}

/// Queries `_validation-contactemail.<domain>` TXT; each record's rdata is
/// one candidate address.
pub async fn dns_txt<E: Exchanger>(dns: &DnsClient<E>, domain: &str) -> Result<Vec<EmailCandidate>, DcvError> {
    let domain = domain::bare(domain);
    let name = format!("_validation-contactemail.{}", domain);

    let (records, _) = dns.lookup(&[name.clone()], Type::TXT).await?;

    let mut out = Vec::new();
    for record in records {
        if let Resource::TXT(txt) = record.resource {
            let addr = txt.joined();
            if is_valid_address(&addr) {
                out.push(EmailCandidate {
                    address: addr,
                    random_value: random::generate(),
                    dns_record_name: name.clone(),
                });
            }
        }
    }

    if out.is_empty() {
        log::debug!("email dns_txt discovery for {}: no usable address in {}", domain, name);
        return Err(DcvError::RecordNotFound { name, rtype: Type::TXT });
    }

    log::debug!("email dns_txt discovery for {}: found {} candidate address(es)", domain, out.len());
    Ok(out)
}

/// Queries CAA for `domain` and, if empty, walks up to the registrable
/// domain, collecting `contactemail` property values per RFC 8657.
pub async fn dns_caa<E: Exchanger>(dns: &DnsClient<E>, domain: &str) -> Result<Vec<EmailCandidate>, DcvError> {
    let bare = domain::bare(domain);

    let mut candidates = vec![bare.to_string()];
    if let Some(registrable) = domain::registrable_domain(bare) {
        if registrable != bare {
            candidates.push(registrable);
        }
    }

    let mut last_err = None;
    for name in candidates {
        match dns.lookup(&[name.clone()], Type::CAA).await {
            Ok((records, _)) => {
                let addrs: Vec<EmailCandidate> = records
                    .into_iter()
                    .filter_map(|r| match r.resource {
                        Resource::CAA(caa) if caa.tag.eq_ignore_ascii_case("contactemail") => Some(EmailCandidate {
                            address: caa.value,
                            random_value: random::generate(),
                            dns_record_name: name.clone(),
                        }),
                        _ => None,
                    })
                    .filter(|c| is_valid_address(&c.address))
                    .collect();

                if !addrs.is_empty() {
                    return Ok(addrs);
                }
            }
            Err(e) => last_err = Some(e),
        }
    }

    log::debug!("email dns_caa discovery for {}: no usable contactemail property found", bare);
    Err(last_err.unwrap_or(DcvError::RecordNotFound {
        name: bare.to_string(),
        rtype: Type::CAA,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructed_emits_five_distinct_randoms() {
        let candidates = constructed("example.com");
        assert_eq!(candidates.len(), 5);

        let addrs: Vec<&str> = candidates.iter().map(|c| c.address.as_str()).collect();
        assert_eq!(
            addrs,
            vec![
                "admin@example.com",
                "administrator@example.com",
                "webmaster@example.com",
                "hostmaster@example.com",
                "postmaster@example.com",
            ]
        );

        let randoms: std::collections::HashSet<&str> = candidates.iter().map(|c| c.random_value.as_str()).collect();
        assert_eq!(randoms.len(), 5, "every address must get a distinct random value");
    }

    #[test]
    fn rejects_malformed_address_shapes() {
        assert!(!is_valid_address("not-an-address"));
        assert!(!is_valid_address("@example.com"));
        assert!(!is_valid_address("admin@"));
        assert!(is_valid_address("admin@example.com"));
    }
}
