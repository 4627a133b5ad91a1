//! ACME HTTP-01 and DNS-01. TLS-ALPN-01 is out of this spec's detail
//! (spec §4.8) and is not implemented.
//!
//! The random value/thumbprint are supplied by the caller (an ACME server
//! already holds the account key); this handler only performs the lookup,
//! MPIC corroboration, and equivalence check.

use crate::config::Config;
use crate::dns::resource::Resource;
use crate::dns::Type;
use crate::errors::DcvError;
use crate::evidence::DomainValidationEvidence;
use crate::file_client::acme_http01_url;
use crate::method::Method;
use crate::mpic::MpicService;
use crate::state::ValidationState;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::time::SystemTime;

/// spec §3's `DcvMethod::UNKNOWN` (the variant picked at validate time) has
/// no counterpart in this crate's exhaustiveness-checked `Method` tagged
/// union (spec §9) — the caller must already know which ACME challenge
/// type it's preparing for. See `DESIGN.md` for this Open Question's
/// resolution.
pub fn prepare(domain: &str, method: Method) -> ValidationState {
    debug_assert!(matches!(method, Method::AcmeHttp01 | Method::AcmeDns01));
    ValidationState::new(domain, method)
}

/// `/.well-known/acme-challenge/<token>`, expecting body `<token>.<thumbprint>`.
pub async fn validate_http01(
    config: &Config,
    mpic: &MpicService,
    state: &ValidationState,
    token: &str,
    thumbprint: &str,
) -> Result<DomainValidationEvidence, DcvError> {
    let now = SystemTime::now();
    if state.is_expired(config.random_value_validity_window, now) {
        log::log!(config.log_level_for_dcv_errors, "acme http-01 validate for {}: state expired", state.domain);
        return Err(DcvError::Expired);
    }

    let url = acme_http01_url(&state.domain, token);
    let (result, mpic_details) = mpic.corroborate_file(&url, config.file_validation_max_body_bytes).await;
    let probe = result.map_err(|e| {
        log::log!(config.log_level_for_dcv_errors, "acme http-01 validate for {} did not corroborate: {}", state.domain, e);
        e
    })?;
    let body = probe.content.as_deref().unwrap_or_default();
    let expected = format!("{}.{}", token, thumbprint);

    if body.trim() != expected {
        log::log!(config.log_level_for_dcv_errors, "acme http-01 validate for {}: body did not match expected token", state.domain);
        return Err(DcvError::RecordNotFound {
            name: url,
            rtype: Type::ANY,
        });
    }

    Ok(DomainValidationEvidence {
        domain: state.domain.clone(),
        method: Method::AcmeHttp01,
        validation_date: now,
        br_version: crate::BR_VERSION.to_string(),
        random_value: None,
        request_token: None,
        file_url: Some(probe.found_url),
        dns_record_name: None,
        dns_type: None,
        email_address: None,
        mpic_details,
        dnssec_details: None,
    })
}

/// `_acme-challenge.<domain>` TXT, expecting `base64url(SHA256("<token>.<thumbprint>"))`.
pub async fn validate_dns01(
    config: &Config,
    mpic: &MpicService,
    state: &ValidationState,
    token: &str,
    thumbprint: &str,
) -> Result<DomainValidationEvidence, DcvError> {
    let now = SystemTime::now();
    if state.is_expired(config.random_value_validity_window, now) {
        log::log!(config.log_level_for_dcv_errors, "acme dns-01 validate for {}: state expired", state.domain);
        return Err(DcvError::Expired);
    }

    let name = format!("_acme-challenge.{}", state.domain);
    let (result, mpic_details) = mpic.corroborate_dns(&[name.clone()], Type::TXT).await;
    let (records, _dnssec) = result.map_err(|e| {
        log::log!(config.log_level_for_dcv_errors, "acme dns-01 validate for {} did not corroborate: {}", state.domain, e);
        e
    })?;

    let digest = Sha256::digest(format!("{}.{}", token, thumbprint).as_bytes());
    let expected = URL_SAFE_NO_PAD.encode(digest);

    let matched = records
        .iter()
        .any(|r| matches!(&r.resource, Resource::TXT(txt) if txt.joined() == expected));

    if !matched {
        log::log!(config.log_level_for_dcv_errors, "acme dns-01 validate for {}: no TXT record matched expected digest", state.domain);
        return Err(DcvError::RecordNotFound { name, rtype: Type::TXT });
    }

    Ok(DomainValidationEvidence {
        domain: state.domain.clone(),
        method: Method::AcmeDns01,
        validation_date: now,
        br_version: crate::BR_VERSION.to_string(),
        random_value: None,
        request_token: None,
        file_url: None,
        dns_record_name: Some(name),
        dns_type: Some(Type::TXT.to_string()),
        email_address: None,
        mpic_details,
        dnssec_details: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::client::{DnsClient, Exchanger};
    use crate::dns::resource::TXT;
    use crate::dns::{Class, Record};
    use crate::file_client::{tests_support::MockTransport, FileClient};
    use crate::mpic::{Agent, LocalAgent};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> Config {
        Config::builder().dns_servers(vec!["127.0.0.1:53".parse().unwrap()]).build().unwrap()
    }

    struct FixedExchanger {
        value: String,
    }

    #[async_trait::async_trait]
    impl Exchanger for FixedExchanger {
        async fn exchange(&self, _server: std::net::SocketAddr, query: &crate::dns::Message) -> std::io::Result<crate::dns::Message> {
            let mut resp = query.clone();
            resp.qr = crate::dns::QR::Response;
            resp.answers = vec![Record {
                name: "_acme-challenge.example.com".to_string(),
                class: Class::Internet,
                ttl: Duration::from_secs(60),
                resource: Resource::TXT(TXT(vec![self.value.as_bytes().to_vec()])),
            }];
            Ok(resp)
        }
    }

    #[tokio::test]
    async fn scenario_d_dns01_matches_expected_digest() {
        let config = test_config();
        let token = "tok";
        let thumbprint = "thb";
        let digest = Sha256::digest(format!("{}.{}", token, thumbprint).as_bytes());
        let expected_value = URL_SAFE_NO_PAD.encode(digest);

        let dns = Arc::new(DnsClient::new(FixedExchanger { value: expected_value }, config.dns_servers.clone(), 0, false));
        let file = Arc::new(FileClient::new(MockTransport::new()));
        let primary: Arc<dyn Agent> = Arc::new(LocalAgent::new(dns.clone(), file.clone()));
        let secondaries: Vec<(String, Arc<dyn Agent>)> = vec![
            ("sec-1".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
            ("sec-2".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
            ("sec-3".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
        ];
        let mpic = MpicService::new("primary", primary, secondaries, config.mpic_quorum, config.mpic_total_deadline);

        let state = prepare("example.com", Method::AcmeDns01);
        let evidence = validate_dns01(&config, &mpic, &state, token, thumbprint).await.unwrap();
        assert_eq!(evidence.dns_record_name.as_deref(), Some("_acme-challenge.example.com"));
    }

    #[tokio::test]
    async fn scenario_d_mismatch_is_rejected() {
        let config = test_config();
        let dns = Arc::new(DnsClient::new(
            FixedExchanger { value: "wrong-value".to_string() },
            config.dns_servers.clone(),
            0,
            false,
        ));
        let file = Arc::new(FileClient::new(MockTransport::new()));
        let primary: Arc<dyn Agent> = Arc::new(LocalAgent::new(dns.clone(), file.clone()));
        let secondaries: Vec<(String, Arc<dyn Agent>)> = vec![
            ("sec-1".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
            ("sec-2".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
            ("sec-3".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
        ];
        let mpic = MpicService::new("primary", primary, secondaries, config.mpic_quorum, config.mpic_total_deadline);

        let state = prepare("example.com", Method::AcmeDns01);
        let result = validate_dns01(&config, &mpic, &state, "tok", "thb").await;
        assert!(matches!(result, Err(DcvError::RecordNotFound { .. })));
    }
}
