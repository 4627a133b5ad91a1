//! BR 3.2.2.4.7 — DNS Change, TXT and CNAME variants.

use crate::config::Config;
use crate::dns::resource::Resource;
use crate::dns::{Record, Type};
use crate::errors::DcvError;
use crate::evidence::DomainValidationEvidence;
use crate::method::Method;
use crate::mpic::MpicService;
use crate::random;
use crate::state::ValidationState;
use std::time::SystemTime;

pub struct DnsPrepare {
    pub random_value: String,
    pub state: ValidationState,
}

/// Mints a random value; prepare never touches the network (spec §4.1/§4.8).
pub fn prepare(domain: &str, method: Method) -> DnsPrepare {
    debug_assert!(matches!(method, Method::DnsTxt | Method::DnsCname));
    DnsPrepare {
        random_value: random::generate(),
        state: ValidationState::new(domain, method),
    }
}

/// `_<label>.<domain>` first (if `dnsDomainLabel` is configured), then the
/// bare domain — the DNS client's "first candidate that answers wins" rule
/// (spec §4.3) realizes the "prefer labeled record" behavior this ordering
/// describes.
fn candidate_names(domain: &str, config: &Config) -> Vec<String> {
    if config.dns_domain_label.is_empty() {
        vec![domain.to_string()]
    } else {
        vec![format!("{}.{}", config.dns_domain_label, domain), domain.to_string()]
    }
}

pub async fn validate(
    config: &Config,
    mpic: &MpicService,
    state: &ValidationState,
    random_value: &str,
) -> Result<DomainValidationEvidence, DcvError> {
    let now = SystemTime::now();
    if state.is_expired(config.random_value_validity_window, now) {
        log::log!(config.log_level_for_dcv_errors, "dns validate for {}: random value expired", state.domain);
        return Err(DcvError::Expired);
    }

    random::verify(config, random_value, state.prepare_time, now)?;

    let rtype = match state.method {
        Method::DnsTxt => Type::TXT,
        Method::DnsCname => Type::CNAME,
        other => return Err(DcvError::UnsupportedMethod(format!("{}", other))),
    };

    let candidates = candidate_names(&state.domain, config);
    let (result, mpic_details) = mpic.corroborate_dns(&candidates, rtype).await;
    let (records, dnssec) = result.map_err(|e| {
        log::log!(config.log_level_for_dcv_errors, "dns validate for {} did not corroborate: {}", state.domain, e);
        e
    })?;

    let matched_name = match_challenge(&records, rtype, random_value).map_err(|e| {
        log::log!(config.log_level_for_dcv_errors, "dns validate for {}: {}", state.domain, e);
        e
    })?;

    log::debug!("dns validate for {} succeeded via {}", state.domain, matched_name);

    Ok(DomainValidationEvidence {
        domain: state.domain.clone(),
        method: state.method,
        validation_date: now,
        br_version: crate::BR_VERSION.to_string(),
        random_value: Some(random_value.to_string()),
        request_token: None,
        file_url: None,
        dns_record_name: Some(matched_name),
        dns_type: Some(rtype.to_string()),
        email_address: None,
        mpic_details,
        dnssec_details: if dnssec.checked_types.is_empty() { None } else { Some((&dnssec).into()) },
    })
}

/// The records returned already belong to whichever single candidate name
/// the DNS client settled on (its inner resolver loop only yields an
/// answer for one name), so finding a matching value here is sufficient to
/// report that name as `dnsRecordName`.
fn match_challenge(records: &[Record], rtype: Type, random_value: &str) -> Result<String, DcvError> {
    for record in records {
        let value = match (&record.resource, rtype) {
            (Resource::TXT(txt), Type::TXT) => txt.joined(),
            (Resource::CNAME(name), Type::CNAME) => name.clone(),
            _ => continue,
        };

        if value == random_value || value.split_whitespace().any(|tok| tok == random_value) {
            return Ok(record.name.clone());
        }
    }

    Err(DcvError::RecordNotFound {
        name: "dns challenge".to_string(),
        rtype,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dns::client::DnsClient;
    use crate::dns::resource::TXT;
    use crate::dns::Class;
    use crate::mpic::{Agent, LocalAgent};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> Config {
        Config::builder().dns_servers(vec!["127.0.0.1:53".parse().unwrap()]).build().unwrap()
    }

    struct FixedExchanger {
        answers: Vec<Record>,
    }

    #[async_trait::async_trait]
    impl crate::dns::client::Exchanger for FixedExchanger {
        async fn exchange(&self, _server: std::net::SocketAddr, query: &crate::dns::Message) -> std::io::Result<crate::dns::Message> {
            let mut resp = query.clone();
            resp.qr = crate::dns::QR::Response;
            resp.answers = self.answers.clone();
            Ok(resp)
        }
    }

    fn txt(name: &str, value: &str) -> Record {
        Record {
            name: name.to_string(),
            class: Class::Internet,
            ttl: Duration::from_secs(60),
            resource: Resource::TXT(TXT(vec![value.as_bytes().to_vec()])),
        }
    }

    #[tokio::test]
    async fn scenario_a_dns_txt_corroborated() {
        let config = test_config();
        let prepared = prepare("example.com", Method::DnsTxt);

        let exchanger = FixedExchanger {
            answers: vec![txt("_dnsauth.example.com", &prepared.random_value)],
        };
        let dns = Arc::new(DnsClient::new(exchanger, config.dns_servers.clone(), 0, false));

        let mock_file = crate::file_client::tests_support::MockTransport::new();
        let file = Arc::new(crate::file_client::FileClient::new(mock_file));

        let primary: Arc<dyn Agent> = Arc::new(LocalAgent::new(dns.clone(), file.clone()));
        let secondaries: Vec<(String, Arc<dyn Agent>)> = vec![
            ("sec-1".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
            ("sec-2".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
            ("sec-3".to_string(), Arc::new(LocalAgent::new(dns.clone(), file.clone()))),
        ];
        let mpic = MpicService::new("primary", primary, secondaries, config.mpic_quorum, config.mpic_total_deadline);

        let mut config_with_label = test_config();
        config_with_label.dns_domain_label = "_dnsauth".to_string();

        let evidence = validate(&config_with_label, &mpic, &prepared.state, &prepared.random_value)
            .await
            .expect("validation should succeed");

        assert_eq!(evidence.dns_record_name.as_deref(), Some("_dnsauth.example.com"));
        assert_eq!(evidence.random_value.as_deref(), Some(prepared.random_value.as_str()));
        assert!(evidence.mpic_details.corroborated);
    }
}
