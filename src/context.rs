//! Explicit construction root (spec §9's design note: "no DI container").
//!
//! A [`Context`] owns the three collaborators every method handler needs —
//! the [`Config`], a [`DnsClient`], a [`FileClient`] — plus the
//! [`MpicService`] built from them, and hands out `&`/`Arc` references to
//! handler functions. Nothing here is a registry: callers build a `Context`
//! once at startup the way the teacher's `Resolver::new(cfg, exchanger)`
//! is built once, and pass it (or its pieces) explicitly from then on.

use crate::config::Config;
use crate::dns::client::{DnsClient, Exchanger};
use crate::errors::DcvError;
use crate::file_client::{FileClient, FileTransport};
use crate::mpic::{Agent, LocalAgent, MpicService};
use std::sync::Arc;

/// Everything a method handler needs to run prepare/validate for one CA
/// deployment: the validated configuration, a DNS client, a file client,
/// and an MPIC service wired up from a primary plus configured secondary
/// perspectives.
pub struct Context<E: Exchanger + 'static, T: FileTransport + 'static> {
    pub config: Arc<Config>,
    pub dns: Arc<DnsClient<E>>,
    pub file: Arc<FileClient<T>>,
    pub mpic: MpicService,
}

impl<E: Exchanger + 'static, T: FileTransport + 'static> Context<E, T> {
    /// Builds a `Context` with a local primary perspective (this process's
    /// own `dns`/`file` clients) and whatever remote `secondaries` the
    /// caller supplies. An empty `secondaries` list still honors
    /// `config.mpic_quorum` against the local primary only — useful for
    /// development and the crate's own tests, not a real MPIC deployment.
    pub fn new(
        config: Config,
        exchanger: E,
        transport: T,
        secondaries: Vec<(String, Arc<dyn Agent>)>,
    ) -> Result<Self, DcvError> {
        let config = Arc::new(config);
        let dns = Arc::new(DnsClient::new(exchanger, config.dns_servers.clone(), config.dns_retries, false));
        let file = Arc::new(FileClient::new(transport));

        let primary: Arc<dyn Agent> = Arc::new(LocalAgent::new(dns.clone(), file.clone()));
        let mpic = MpicService::new("primary", primary, secondaries, config.mpic_quorum, config.mpic_total_deadline);

        Ok(Context { config, dns, file, mpic })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::client::UdpTcpExchanger;
    use crate::file_client::tests_support::MockTransport;

    #[test]
    fn context_wires_mpic_against_local_primary_when_no_secondaries_configured() {
        let config = Config::builder().dns_servers(vec!["127.0.0.1:53".parse().unwrap()]).build().unwrap();

        let ctx = Context::new(config, UdpTcpExchanger::default(), MockTransport::new(), vec![]).unwrap();

        assert_eq!(ctx.config.mpic_quorum, 2);
        assert_eq!(ctx.config.mpic_total_secondaries, 3);
    }
}
