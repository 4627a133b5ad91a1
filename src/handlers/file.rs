//! BR 3.2.2.4.18 — File-Based validation. The single collapsed
//! `file`/`fileauth` path spec §9 calls for: one handler, one challenge
//! enum covering both the random-value and Request-Token variants.

use crate::config::Config;
use crate::domain;
use crate::errors::DcvError;
use crate::evidence::DomainValidationEvidence;
use crate::file_client::validation_url;
use crate::method::Method;
use crate::mpic::MpicService;
use crate::random;
use crate::state::ValidationState;
use crate::token;
use chrono::Utc;
use std::time::SystemTime;

pub struct FilePrepare {
    pub random_value: String,
    pub http_url: String,
    pub state: ValidationState,
}

/// Rejects wildcard domains outright (spec §4.8, invariant 7).
pub fn prepare(domain: &str, config: &Config) -> Result<FilePrepare, DcvError> {
    if domain::is_wildcard(domain) {
        return Err(DcvError::TextParse("wildcard domain not allowed for File validation".to_string()));
    }

    Ok(FilePrepare {
        random_value: random::generate(),
        http_url: validation_url(domain, &config.file_validation_filename, false),
        state: ValidationState::new(domain, Method::File),
    })
}

/// Either challenge a File validation can accept in its body.
pub enum Challenge<'a> {
    RandomValue(&'a str),
    RequestToken { key: &'a str, value: &'a str },
}

pub async fn validate(
    config: &Config,
    mpic: &MpicService,
    state: &ValidationState,
    challenge: Challenge<'_>,
) -> Result<DomainValidationEvidence, DcvError> {
    if domain::is_wildcard(&state.domain) {
        return Err(DcvError::TextParse("wildcard domain not allowed for File validation".to_string()));
    }

    let now = SystemTime::now();
    if state.is_expired(config.random_value_validity_window, now) {
        log::log!(config.log_level_for_dcv_errors, "file validate for {}: random value expired", state.domain);
        return Err(DcvError::Expired);
    }

    let mut urls = vec![validation_url(&state.domain, &config.file_validation_filename, false)];
    if config.file_validation_check_https {
        urls.push(validation_url(&state.domain, &config.file_validation_filename, true));
    }

    // HTTP then HTTPS, sequentially (spec §5): an early HTTP success must
    // not consume the HTTPS probe's share of the MPIC deadline.
    let mut last_err = None;
    for url in urls {
        match probe_one(config, mpic, &url, &challenge, now).await {
            Ok(mut evidence) => {
                evidence.domain = state.domain.clone();
                log::debug!("file validate for {} succeeded via {}", state.domain, url);
                return Ok(evidence);
            }
            Err(e) => {
                log::log!(config.log_level_for_dcv_errors, "file validate for {} failed at {}: {}", state.domain, url, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(DcvError::RecordNotFound {
        name: state.domain.clone(),
        rtype: crate::dns::Type::ANY,
    }))
}

async fn probe_one(
    config: &Config,
    mpic: &MpicService,
    url: &str,
    challenge: &Challenge<'_>,
    now: SystemTime,
) -> Result<DomainValidationEvidence, DcvError> {
    let (result, mpic_details) = mpic.corroborate_file(url, config.file_validation_max_body_bytes).await;
    let probe = result?;
    let body = probe.content.as_deref().unwrap_or_default();

    let (random_value, request_token) = match challenge {
        Challenge::RandomValue(expected) => {
            random::find_in_body(body, expected)?;
            (Some((*expected).to_string()), None)
        }
        Challenge::RequestToken { key, value } => {
            let found = token::find_in_body(body, key, value, Utc::now())?;
            (None, Some(found))
        }
    };

    Ok(DomainValidationEvidence {
        domain: String::new(),
        method: Method::File,
        validation_date: now,
        br_version: crate::BR_VERSION.to_string(),
        random_value,
        request_token,
        file_url: Some(probe.found_url.clone()),
        dns_record_name: None,
        dns_type: None,
        email_address: None,
        mpic_details,
        dnssec_details: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::client::{DnsClient, UdpTcpExchanger};
    use crate::file_client::tests_support::MockTransport;
    use crate::file_client::FileClient;
    use crate::mpic::{Agent, LocalAgent};
    use std::sync::Arc;

    fn test_config() -> Config {
        Config::builder().dns_servers(vec!["127.0.0.1:53".parse().unwrap()]).build().unwrap()
    }

    #[tokio::test]
    async fn scenario_b_file_random_value_corroborated() {
        let config = test_config();
        let prepared = prepare("example.com", &config).expect("prepare should succeed");
        assert_eq!(prepared.http_url, "http://example.com/.well-known/pki-validation/fileauth.txt");

        let mock = MockTransport::new();
        mock.set_ok(&prepared.http_url, 200, &format!("{}\n", prepared.random_value));

        let file = Arc::new(FileClient::new(mock));
        let dns: Arc<DnsClient<UdpTcpExchanger>> =
            Arc::new(DnsClient::new(UdpTcpExchanger::default(), config.dns_servers.clone(), 0, false));

        let primary: Arc<dyn Agent> = Arc::new(LocalAgent::new(dns.clone(), file.clone()));
        let secondaries: Vec<(String, Arc<dyn Agent>)> = vec![
            ("sec-1".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
            ("sec-2".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
            ("sec-3".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
        ];
        let mpic = MpicService::new("primary", primary, secondaries, config.mpic_quorum, config.mpic_total_deadline);

        let evidence = validate(&config, &mpic, &prepared.state, Challenge::RandomValue(&prepared.random_value))
            .await
            .expect("validation should succeed");

        assert_eq!(evidence.file_url.as_deref(), Some(prepared.http_url.as_str()));
        assert!(evidence.mpic_details.corroborated);
    }

    #[tokio::test]
    async fn wildcard_domain_rejected_at_prepare() {
        let config = test_config();
        assert!(matches!(prepare("*.example.com", &config), Err(DcvError::TextParse(_))));
    }
}
