//! `dcv` implements Domain Control Validation per the CA/Browser Forum
//! Baseline Requirements: email-to-constructed-address (§3.2.2.4.4), DNS
//! change (§3.2.2.4.7), email-to-DNS-contact (§3.2.2.4.13/14),
//! file-authentication over HTTP (§3.2.2.4.18), and ACME (HTTP-01, DNS-01).
//!
//! # What this crate does not do
//!
//! It does not send email, does not persist state across the prepare/
//! validate calls (the caller re-supplies the signed [`state::ValidationState`]
//! handle), does not issue certificates, and does not run the remote MPIC
//! perspectives itself — see [`mpic::Agent`] for the interface it consumes
//! instead.
//!
//! # Usage
//!
//! ```no_run
//! use dcv::config::Config;
//! use dcv::dns::client::{DnsClient, UdpTcpExchanger};
//! use dcv::file_client::{FileClient, ReqwestTransport};
//! use dcv::mpic::{Agent, LocalAgent, MpicService};
//! use dcv::handlers::dns as dns_handler;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder()
//!     .dns_servers(vec!["8.8.8.8:53".parse()?])
//!     .build()?;
//!
//! let dns = Arc::new(DnsClient::new(UdpTcpExchanger::default(), config.dns_servers.clone(), config.dns_retries, false));
//! let file = Arc::new(FileClient::new(ReqwestTransport::new(&config, dns.clone())?));
//!
//! let primary: Arc<dyn Agent> = Arc::new(LocalAgent::new(dns.clone(), file.clone()));
//! let mpic = MpicService::new("primary", primary, vec![], config.mpic_quorum, config.mpic_total_deadline);
//!
//! let prepared = dns_handler::prepare("example.com", dcv::method::Method::DnsTxt);
//! // ... caller publishes `prepared.random_value` as a TXT record, then:
//! let evidence = dns_handler::validate(&config, &mpic, &prepared.state, &prepared.random_value).await?;
//! println!("{}", serde_json::to_string_pretty(&evidence)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod dns;
pub mod domain;
pub mod errors;
pub mod evidence;
pub mod file_client;
pub mod handlers;
pub mod method;
pub mod mpic;
pub mod random;
pub mod state;
pub mod token;

#[cfg(feature = "email")]
pub mod email;

pub use context::Context;
pub use errors::DcvError;
pub use evidence::DomainValidationEvidence;
pub use method::Method;
pub use state::ValidationState;

/// The Baseline Requirements version this crate's evidence records cite
/// (spec §6's canonical wire shape).
pub const BR_VERSION: &str = "v2.1.1";
