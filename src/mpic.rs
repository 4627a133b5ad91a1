//! Multi-Perspective Issuance Corroboration: fan a single probe out to a
//! primary and N secondary vantage points and require a quorum of agreement
//! before the result is trusted.
//!
//! Per spec §9's design note, the in-tree stand-in ("`MpicClientImpl`
//! replaying the primary response") is out of scope — this module only
//! specifies the orchestration (fan-out, quorum, cancellation) and the
//! [`Agent`] seam a real remote-perspective transport plugs into.

use crate::dns::client::DnssecDetails;
use crate::dns::{Record, Type};
use crate::errors::DcvError;
use crate::evidence::MpicDetails;
use crate::file_client::{FileClient, FileFetchResult, FileTransport};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;

/// What one perspective saw when asked to probe a file URL. Corroboration
/// only ever needs `status`/`body_sha256`; `content` is populated for the
/// perspective this crate treats as "the" read (the primary, locally) and
/// left `None` for perspectives that, per spec §4.5, "may return only the
/// hash".
#[derive(Clone, Debug)]
pub struct FileProbeResult {
    pub status: u16,
    pub found_url: String,
    pub body_sha256: [u8; 32],
    pub content: Option<String>,
}

/// One network vantage point. A real implementation speaks to a remote
/// agent over whatever RPC transport the embedding CA uses; this crate only
/// consumes the interface.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn probe_dns(&self, candidates: &[String], rtype: Type) -> Result<(Vec<Record>, DnssecDetails), DcvError>;
    async fn probe_file(&self, url: &str, max_body_bytes: usize) -> Result<FileProbeResult, DcvError>;
}

/// The default, in-process [`Agent`]: a real DNS lookup and a real file
/// fetch against this process's own configured clients. Used as the
/// primary perspective, and as a stand-in secondary in tests.
pub struct LocalAgent<E: crate::dns::client::Exchanger, T: FileTransport> {
    dns: std::sync::Arc<crate::dns::client::DnsClient<E>>,
    file: std::sync::Arc<FileClient<T>>,
}

impl<E: crate::dns::client::Exchanger, T: FileTransport> LocalAgent<E, T> {
    pub fn new(dns: std::sync::Arc<crate::dns::client::DnsClient<E>>, file: std::sync::Arc<FileClient<T>>) -> Self {
        LocalAgent { dns, file }
    }
}

#[async_trait]
impl<E, T> Agent for LocalAgent<E, T>
where
    E: crate::dns::client::Exchanger + 'static,
    T: FileTransport + 'static,
{
    async fn probe_dns(&self, candidates: &[String], rtype: Type) -> Result<(Vec<Record>, DnssecDetails), DcvError> {
        self.dns.lookup(candidates, rtype).await
    }

    async fn probe_file(&self, url: &str, max_body_bytes: usize) -> Result<FileProbeResult, DcvError> {
        let fetched: FileFetchResult = self.file.fetch(url, max_body_bytes).await?;
        let hash: [u8; 32] = Sha256::digest(fetched.content.as_bytes()).into();
        Ok(FileProbeResult {
            status: fetched.status,
            found_url: fetched.found_url,
            body_sha256: hash,
            content: Some(fetched.content),
        })
    }
}

/// Orchestrates one primary + N secondary perspectives per probe, applying
/// the quorum rule from spec §4.5.
pub struct MpicService {
    quorum: usize,
    deadline: Duration,
    primary: (String, std::sync::Arc<dyn Agent>),
    secondaries: Vec<(String, std::sync::Arc<dyn Agent>)>,
}

impl MpicService {
    pub fn new(
        primary_id: impl Into<String>,
        primary: std::sync::Arc<dyn Agent>,
        secondaries: Vec<(String, std::sync::Arc<dyn Agent>)>,
        quorum: usize,
        deadline: Duration,
    ) -> Self {
        MpicService {
            quorum,
            deadline,
            primary: (primary_id.into(), primary),
            secondaries,
        }
    }

    /// Corroborates a DNS lookup. Equivalence is the set of record values
    /// for `rtype`, order-insensitive, case-insensitive for names, exact
    /// for TXT (spec §4.5).
    pub async fn corroborate_dns(
        &self,
        candidates: &[String],
        rtype: Type,
    ) -> (Result<(Vec<Record>, DnssecDetails), DcvError>, MpicDetails) {
        let candidates = candidates.to_vec();

        let primary_agent = self.primary.1.clone();
        let primary_candidates = candidates.clone();
        let primary_fut = async move { primary_agent.probe_dns(&primary_candidates, rtype).await };

        let secondary_futs: Vec<(String, _)> = self
            .secondaries
            .iter()
            .map(|(id, agent)| {
                let agent = agent.clone();
                let candidates = candidates.clone();
                (id.clone(), async move { agent.probe_dns(&candidates, rtype).await })
            })
            .collect();

        fan_out(self.primary.0.clone(), primary_fut, secondary_futs, self.quorum, self.deadline, move |a, b| {
            dns_equivalent(rtype, &a.0, &b.0)
        })
        .await
    }

    /// Corroborates a file fetch. Equivalence is status code plus body hash
    /// (spec §4.5) — the primary's returned [`FileProbeResult`] still
    /// carries the actual body (`content`) for the handler to scan.
    pub async fn corroborate_file(&self, url: &str, max_body_bytes: usize) -> (Result<FileProbeResult, DcvError>, MpicDetails) {
        let primary_agent = self.primary.1.clone();
        let primary_url = url.to_string();
        let primary_fut = async move { primary_agent.probe_file(&primary_url, max_body_bytes).await };

        let secondary_futs: Vec<(String, _)> = self
            .secondaries
            .iter()
            .map(|(id, agent)| {
                let agent = agent.clone();
                let url = url.to_string();
                (id.clone(), async move { agent.probe_file(&url, max_body_bytes).await })
            })
            .collect();

        fan_out(self.primary.0.clone(), primary_fut, secondary_futs, self.quorum, self.deadline, file_equivalent).await
    }
}

fn file_equivalent(a: &FileProbeResult, b: &FileProbeResult) -> bool {
    a.status == b.status && a.body_sha256 == b.body_sha256
}

/// Canonicalizes one record's value for the set-equivalence comparison in
/// spec §4.5. Names compare case-insensitively; TXT compares exactly.
fn canonical_value(r: &Record) -> String {
    use crate::dns::resource::Resource;
    match &r.resource {
        Resource::TXT(txt) => txt.joined(),
        Resource::A(ip) => ip.to_string(),
        Resource::AAAA(ip) => ip.to_string(),
        Resource::CNAME(name) | Resource::NS(name) | Resource::PTR(name) => name.to_lowercase(),
        Resource::MX(mx) => format!("{} {}", mx.preference, mx.exchange.to_lowercase()),
        Resource::CAA(caa) => format!("{} {} {}", caa.critical, caa.tag.to_lowercase(), caa.value),
        other => format!("{:?}", other),
    }
}

fn dns_equivalent(rtype: Type, a: &[Record], b: &[Record]) -> bool {
    let norm = |records: &[Record]| -> BTreeSet<String> {
        records.iter().filter(|r| r.r#type() == rtype).map(canonical_value).collect()
    };
    norm(a) == norm(b)
}

/// Runs `primary` and every entry of `secondaries` concurrently, stopping
/// as soon as the quorum decision is reached, the remaining secondaries
/// cannot possibly reach it, all have replied, or `deadline` elapses —
/// whichever comes first (spec §4.5/§5). Anything still in flight at that
/// point is aborted rather than awaited to completion.
async fn fan_out<R, Fut>(
    primary_id: String,
    primary: Fut,
    secondaries: Vec<(String, Fut)>,
    quorum: usize,
    deadline: Duration,
    equivalent: impl Fn(&R, &R) -> bool,
) -> (Result<R, DcvError>, MpicDetails)
where
    R: Send + 'static,
    Fut: Future<Output = Result<R, DcvError>> + Send + 'static,
{
    let total_secondaries = secondaries.len();

    let mut secondary_set: JoinSet<(String, Result<R, DcvError>)> = JoinSet::new();
    for (id, fut) in secondaries {
        secondary_set.spawn(async move { (id, fut.await) });
    }

    let deadline_fut = tokio::time::sleep(deadline);
    tokio::pin!(deadline_fut);

    let primary_result = tokio::select! {
        biased;
        r = primary => r,
        _ = &mut deadline_fut => {
            secondary_set.abort_all();
            log::warn!("mpic fan-out for primary {}: total deadline exceeded before primary responded", primary_id);
            return (
                Err(DcvError::QuorumNotMet("MPIC_TIMEOUT: total deadline exceeded before the primary perspective responded".to_string())),
                MpicDetails {
                    corroborated: false,
                    primary_agent_id: primary_id,
                    total_quorum: quorum,
                    attempt_count: 0,
                    per_agent_corroboration: BTreeMap::new(),
                    non_corroboration_reason: Some("MPIC_TIMEOUT".to_string()),
                },
            );
        }
    };

    let primary_value = match primary_result {
        Ok(v) => v,
        Err(e) => {
            secondary_set.abort_all();
            log::warn!("mpic fan-out for primary {}: primary perspective failed: {}", primary_id, e);
            return (
                Err(DcvError::QuorumNotMet(format!("MPIC_PRIMARY_FAILED: {}", e))),
                MpicDetails {
                    corroborated: false,
                    primary_agent_id: primary_id,
                    total_quorum: quorum,
                    attempt_count: 1,
                    per_agent_corroboration: BTreeMap::new(),
                    non_corroboration_reason: Some(format!("MPIC_PRIMARY_FAILED: {}", e)),
                },
            );
        }
    };

    let mut per_agent = BTreeMap::new();
    let mut corroborated_count = 0usize;
    let mut remaining = total_secondaries;
    let mut attempt_count = 1usize;
    let mut non_corroboration_reason: Option<String> = None;

    while remaining > 0 && corroborated_count < quorum && corroborated_count + remaining >= quorum {
        let next = tokio::select! {
            biased;
            _ = &mut deadline_fut => None,
            item = secondary_set.join_next() => item,
        };

        let (id, result) = match next {
            None => break,
            Some(Ok(pair)) => pair,
            Some(Err(_join_err)) => {
                // Task panicked or was aborted out from under us; its id is
                // unknown so it can't be recorded per-agent, but it still
                // counts against the remaining pool.
                remaining -= 1;
                continue;
            }
        };

        remaining -= 1;
        attempt_count += 1;

        match result {
            Ok(v) if equivalent(&primary_value, &v) => {
                per_agent.insert(id, true);
                corroborated_count += 1;
            }
            Ok(_) => {
                per_agent.insert(id.clone(), false);
                non_corroboration_reason.get_or_insert_with(|| format!("{} returned a non-matching payload", id));
            }
            Err(e) => {
                per_agent.insert(id.clone(), false);
                non_corroboration_reason.get_or_insert_with(|| format!("{}: {}", id, e));
            }
        }
    }

    secondary_set.abort_all();

    let corroborated = corroborated_count >= quorum;
    let details = MpicDetails {
        corroborated,
        primary_agent_id: primary_id,
        total_quorum: quorum,
        attempt_count,
        per_agent_corroboration: per_agent,
        non_corroboration_reason: if corroborated {
            None
        } else {
            Some(non_corroboration_reason.unwrap_or_else(|| "MPIC_QUORUM_NOT_MET".to_string()))
        },
    };

    if corroborated {
        (Ok(primary_value), details)
    } else {
        log::warn!(
            "mpic fan-out for primary {}: quorum not met ({}/{} corroborating, {})",
            details.primary_agent_id,
            corroborated_count,
            details.total_quorum,
            details.non_corroboration_reason.as_deref().unwrap_or("no reason recorded"),
        );
        (
            Err(DcvError::QuorumNotMet("quorum of corroborating perspectives not reached".to_string())),
            details,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resource::Resource;
    use crate::dns::Class;
    use std::time::Duration as StdDuration;

    struct StubAgent {
        dns_result: Result<Vec<Record>, String>,
    }

    #[async_trait]
    impl Agent for StubAgent {
        async fn probe_dns(&self, _candidates: &[String], _rtype: Type) -> Result<(Vec<Record>, DnssecDetails), DcvError> {
            self.dns_result
                .clone()
                .map(|records| (records, DnssecDetails::default()))
                .map_err(DcvError::TextParse)
        }

        async fn probe_file(&self, _url: &str, _max_body_bytes: usize) -> Result<FileProbeResult, DcvError> {
            unimplemented!("not used in these tests")
        }
    }

    fn txt_record(name: &str, value: &str) -> Record {
        Record {
            name: name.to_string(),
            class: Class::Internet,
            ttl: StdDuration::from_secs(60),
            resource: Resource::TXT(crate::dns::resource::TXT(vec![value.as_bytes().to_vec()])),
        }
    }

    fn agent(ok: bool, value: &str) -> std::sync::Arc<dyn Agent> {
        std::sync::Arc::new(StubAgent {
            dns_result: if ok {
                Ok(vec![txt_record("_dnsauth.example.com", value)])
            } else {
                Err("simulated failure".to_string())
            },
        })
    }

    #[tokio::test]
    async fn quorum_met_when_enough_secondaries_agree() {
        let svc = MpicService::new(
            "primary",
            agent(true, "R"),
            vec![
                ("sec-1".to_string(), agent(true, "R")),
                ("sec-2".to_string(), agent(true, "R")),
                ("sec-3".to_string(), agent(false, "")),
            ],
            2,
            Duration::from_secs(5),
        );

        let (result, details) = svc.corroborate_dns(&["_dnsauth.example.com".to_string()], Type::TXT).await;
        assert!(result.is_ok());
        assert!(details.corroborated);
        assert_eq!(details.per_agent_corroboration.get("sec-1"), Some(&true));
        assert_eq!(details.per_agent_corroboration.get("sec-2"), Some(&true));
    }

    #[tokio::test]
    async fn quorum_missed_when_too_few_agree() {
        let svc = MpicService::new(
            "primary",
            agent(true, "R"),
            vec![
                ("sec-1".to_string(), agent(true, "R")),
                ("sec-2".to_string(), agent(false, "")),
                ("sec-3".to_string(), agent(false, "")),
            ],
            2,
            Duration::from_secs(5),
        );

        let (result, details) = svc.corroborate_dns(&["_dnsauth.example.com".to_string()], Type::TXT).await;
        assert!(result.is_err());
        assert!(!details.corroborated);
        assert!(details.non_corroboration_reason.is_some());
    }

    #[tokio::test]
    async fn primary_failure_is_terminal() {
        let svc = MpicService::new(
            "primary",
            agent(false, ""),
            vec![("sec-1".to_string(), agent(true, "R")), ("sec-2".to_string(), agent(true, "R"))],
            2,
            Duration::from_secs(5),
        );

        let (result, details) = svc.corroborate_dns(&["_dnsauth.example.com".to_string()], Type::TXT).await;
        assert!(result.is_err());
        assert!(!details.corroborated);
        assert!(details.per_agent_corroboration.is_empty());
    }
}
