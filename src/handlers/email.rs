//! BR 3.2.2.4.4 (Constructed) and 3.2.2.4.13/14 (DNS TXT / DNS CAA) — the
//! three `EmailSource` strategies from spec §4.7.

use crate::config::Config;
use crate::dns::client::{DnsClient, Exchanger};
use crate::email::{self, EmailCandidate};
use crate::errors::DcvError;
use crate::evidence::{DomainValidationEvidence, MpicDetails};
use crate::method::Method;
use crate::random;
use crate::state::ValidationState;
use std::collections::BTreeMap;
use std::time::SystemTime;

pub struct EmailPrepare {
    pub candidates: Vec<EmailCandidate>,
    pub state: ValidationState,
}

/// Discovers candidate addresses per `method`'s `EmailSource` and pairs
/// each with its own random value. MPIC is never applied here: address
/// *discovery* is not itself the evidence of control — the subsequent
/// email confirmation (outside this crate) is.
pub async fn prepare<E: Exchanger>(dns: &DnsClient<E>, domain: &str, method: Method) -> Result<EmailPrepare, DcvError> {
    let candidates = match method {
        Method::EmailConstructed => email::constructed(domain),
        Method::EmailTxt => email::dns_txt(dns, domain).await?,
        Method::EmailCaa => email::dns_caa(dns, domain).await?,
        other => return Err(DcvError::UnsupportedMethod(format!("{}", other))),
    };

    Ok(EmailPrepare {
        candidates,
        state: ValidationState::new(domain, method),
    })
}

/// A pure check of the re-supplied `(domain, emailAddress, randomValue)`
/// tuple against the state's expiry/entropy rules (spec §4.8) — actual
/// mail delivery and confirmation happen outside this crate, so there is
/// no remote perspective to corroborate here.
pub fn validate(
    config: &Config,
    state: &ValidationState,
    email_address: &str,
    random_value: &str,
) -> Result<DomainValidationEvidence, DcvError> {
    let now = SystemTime::now();
    if state.is_expired(config.random_value_validity_window, now) {
        log::log!(config.log_level_for_dcv_errors, "email validate for {}: random value expired", state.domain);
        return Err(DcvError::Expired);
    }

    random::verify(config, random_value, state.prepare_time, now).map_err(|e| {
        log::log!(config.log_level_for_dcv_errors, "email validate for {} <{}>: {}", state.domain, email_address, e);
        e
    })?;

    log::debug!("email validate for {} <{}> succeeded", state.domain, email_address);

    Ok(DomainValidationEvidence {
        domain: state.domain.clone(),
        method: state.method,
        validation_date: now,
        br_version: crate::BR_VERSION.to_string(),
        random_value: Some(random_value.to_string()),
        request_token: None,
        file_url: None,
        dns_record_name: None,
        dns_type: None,
        email_address: Some(email_address.to_string()),
        mpic_details: MpicDetails {
            corroborated: true,
            primary_agent_id: "local".to_string(),
            total_quorum: 0,
            attempt_count: 0,
            per_agent_corroboration: BTreeMap::new(),
            non_corroboration_reason: None,
        },
        dnssec_details: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::client::UdpTcpExchanger;
    use crate::dns::client::DnsClient;

    fn test_config() -> Config {
        Config::builder().dns_servers(vec!["127.0.0.1:53".parse().unwrap()]).build().unwrap()
    }

    #[tokio::test]
    async fn scenario_c_constructed_yields_five_addresses() {
        let config = test_config();
        let dns = DnsClient::new(UdpTcpExchanger::default(), config.dns_servers.clone(), 0, false);

        let prepared = prepare(&dns, "example.com", Method::EmailConstructed).await.unwrap();
        assert_eq!(prepared.candidates.len(), 5);

        let randoms: std::collections::HashSet<&str> =
            prepared.candidates.iter().map(|c| c.random_value.as_str()).collect();
        assert_eq!(randoms.len(), 5);
    }

    #[test]
    fn validate_rejects_expired_state() {
        let config = test_config();
        let mut state = ValidationState::new("example.com", Method::EmailConstructed);
        state.prepare_time = SystemTime::now() - std::time::Duration::from_secs(31 * 24 * 3600);

        let result = validate(&config, &state, "admin@example.com", &random::generate());
        assert!(matches!(result, Err(DcvError::Expired)));
    }
}
