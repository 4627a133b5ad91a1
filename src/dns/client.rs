//! Resolver-facing DNS client used by every method that needs to look up a
//! record: candidate-FQDN iteration, UDP-with-TCP-fallback transport,
//! per-query timeouts and retries, and translation of wire-level failures
//! into the crate's [`DcvError`] taxonomy.

use crate::dns::message::{Class, Message, Record, Type};
use crate::errors::DcvError;
use async_trait::async_trait;
use log::{debug, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

/// Performs one request/response exchange with a single resolver. A trait so
/// tests can substitute a mock that returns canned [`Message`]s without any
/// real network I/O.
#[async_trait]
pub trait Exchanger: Send + Sync {
    async fn exchange(&self, server: SocketAddr, query: &Message) -> std::io::Result<Message>;
}

/// The real UDP transport, per [rfc1035#section-4.2.1], falling back to TCP
/// when the response sets the truncation bit, per
/// [rfc1035#section-4.2.2].
///
/// [rfc1035#section-4.2.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.1
/// [rfc1035#section-4.2.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.2
pub struct UdpTcpExchanger {
    pub udp_read_timeout: Duration,
    pub tcp_connect_timeout: Duration,
}

impl Default for UdpTcpExchanger {
    fn default() -> Self {
        UdpTcpExchanger {
            udp_read_timeout: Duration::from_secs(2),
            tcp_connect_timeout: Duration::from_secs(2),
        }
    }
}

impl UdpTcpExchanger {
    async fn exchange_udp(&self, server: SocketAddr, req: &[u8]) -> std::io::Result<Message> {
        let bind_addr = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server).await?;
        socket.send(req).await?;

        let mut buf = [0u8; 4096];
        let len = timeout(self.udp_read_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "udp read timed out"))??;

        Message::from_slice(&buf[..len])
    }

    async fn exchange_tcp(&self, server: SocketAddr, req: &[u8]) -> std::io::Result<Message> {
        let mut stream = timeout(self.tcp_connect_timeout, TcpStream::connect(server))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "tcp connect timed out"))??;
        stream.set_nodelay(true)?;

        stream.write_all(&(req.len() as u16).to_be_bytes()).await?;
        stream.write_all(req).await?;

        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await?;
        let len = u16::from_be_bytes(len_buf) as usize;

        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await?;

        Message::from_slice(&buf)
    }
}

#[async_trait]
impl Exchanger for UdpTcpExchanger {
    async fn exchange(&self, server: SocketAddr, query: &Message) -> std::io::Result<Message> {
        let req = query.to_vec()?;

        let resp = self.exchange_udp(server, &req).await?;
        if !resp.tc {
            return Ok(resp);
        }

        debug!("response from {} truncated, retrying over tcp", server);
        self.exchange_tcp(server, &req).await
    }
}

/// A single DNS lookup's outcome: the records a resolver actually returned,
/// plus whether the resolver's `ad` bit was set for every query this crate
/// sent with the DNSSEC OK bit on. Chain-of-trust validation is never
/// performed here; callers only ever see "the recursive resolver says this
/// is secure".
#[derive(Clone, Debug, Default)]
pub struct DnssecDetails {
    pub secure: bool,
    pub ad_flag: bool,
    pub checked_types: Vec<Type>,
}

/// Performs candidate-FQDN x record-type lookups against a fixed list of
/// resolvers, retrying each resolver before moving to the next, and
/// returning the first resolver's answer that contains a record of the
/// requested type (an empty, non-error answer is a legitimate outcome:
/// callers treat "no record" as `RECORD_NOT_FOUND`, not a transport error).
pub struct DnsClient<E: Exchanger> {
    exchanger: E,
    resolvers: Vec<SocketAddr>,
    retries: u32,
    want_dnssec: bool,
}

impl<E: Exchanger> DnsClient<E> {
    pub fn new(exchanger: E, resolvers: Vec<SocketAddr>, retries: u32, want_dnssec: bool) -> Self {
        DnsClient {
            exchanger,
            resolvers,
            retries,
            want_dnssec,
        }
    }

    /// Looks up `rtype` records for `name` against the configured resolvers,
    /// outer loop over candidate names, inner loop over resolvers: a
    /// candidate name is abandoned (moving to the next candidate) only once
    /// every resolver has been exhausted for it, so a resolver outage never
    /// masks a perfectly valid earlier candidate.
    pub async fn lookup(&self, candidates: &[String], rtype: Type) -> Result<(Vec<Record>, DnssecDetails), DcvError> {
        let mut errors: Vec<DcvError> = Vec::new();

        for name in candidates {
            match self.lookup_one(name, rtype).await {
                Ok(found) => return Ok(found),
                Err(e) => errors.push(e),
            }
        }

        Err(aggregate_errors(candidates, rtype, errors))
    }

    async fn lookup_one(&self, name: &str, rtype: Type) -> Result<(Vec<Record>, DnssecDetails), DcvError> {
        let mut query = Message::default();
        query.add_question(name, rtype, Class::Internet);

        let mut ext = crate::dns::message::Extension::default();
        if self.want_dnssec {
            ext.dnssec_ok = true;
        }
        query.add_extension(ext);

        let mut last_io_err: Option<std::io::Error> = None;

        for server in &self.resolvers {
            for attempt in 0..=self.retries {
                match self.exchanger.exchange(*server, &query).await {
                    Ok(resp) => {
                        let details = DnssecDetails {
                            secure: self.want_dnssec && resp.ad,
                            ad_flag: resp.ad,
                            checked_types: if self.want_dnssec { vec![rtype] } else { Vec::new() },
                        };

                        let records: Vec<Record> = resp
                            .answers
                            .into_iter()
                            .filter(|r| r.r#type() == rtype)
                            .collect();

                        if records.is_empty() {
                            return Err(DcvError::RecordNotFound {
                                name: name.to_string(),
                                rtype,
                            });
                        }

                        return Ok((records, details));
                    }
                    Err(e) => {
                        warn!(
                            "lookup {} {:?} via {} failed (attempt {}/{}): {}",
                            name, rtype, server, attempt + 1, self.retries + 1, e
                        );
                        last_io_err = Some(e);
                    }
                }
            }
        }

        Err(last_io_err
            .map(|e| DcvError::Io(e.to_string()))
            .unwrap_or(DcvError::UnknownHost(name.to_string())))
    }
}

/// Surfaces the union of distinct error kinds observed across every
/// candidate name a lookup tried (spec §4.3, spec §9's error-accumulation
/// design note), instead of only the last one tried. A single-candidate
/// lookup (the common case) passes its one error straight through
/// unwrapped, so existing call sites that match on a specific `DcvError`
/// variant for a single-candidate lookup are unaffected.
fn aggregate_errors(candidates: &[String], rtype: Type, mut errors: Vec<DcvError>) -> DcvError {
    if errors.len() <= 1 {
        return errors.pop().unwrap_or(DcvError::RecordNotFound {
            name: candidates.join(", "),
            rtype,
        });
    }

    let kinds: std::collections::BTreeSet<String> = errors.iter().map(|e| e.to_string()).collect();
    DcvError::Aggregate {
        count: errors.len(),
        kinds: kinds.into_iter().collect::<Vec<_>>().join("; "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::message::QR;

    /// Answers differently depending on which candidate name was queried:
    /// `_label.example.com` gets a response with an empty answer section
    /// (`RECORD_NOT_FOUND`), `example.com` gets a socket error (`IO`) --
    /// two distinct error kinds from the same `lookup` call.
    struct PerNameExchanger;

    #[async_trait]
    impl Exchanger for PerNameExchanger {
        async fn exchange(&self, _server: SocketAddr, query: &Message) -> std::io::Result<Message> {
            let name = query.questions[0].name.trim_end_matches('.');
            if name == "example.com" {
                return Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"));
            }

            let mut resp = query.clone();
            resp.qr = QR::Response;
            resp.answers = Vec::new();
            Ok(resp)
        }
    }

    #[tokio::test]
    async fn lookup_surfaces_the_union_of_error_kinds_across_candidates() {
        let client = DnsClient::new(PerNameExchanger, vec!["127.0.0.1:53".parse().unwrap()], 0, false);

        let candidates = vec!["_label.example.com".to_string(), "example.com".to_string()];
        let err = client.lookup(&candidates, Type::TXT).await.unwrap_err();

        match &err {
            DcvError::Aggregate { count, kinds } => {
                assert_eq!(*count, 2);
                assert!(kinds.contains("record not found"), "kinds: {}", kinds);
                assert!(kinds.contains("i/o error"), "kinds: {}", kinds);
            }
            other => panic!("expected DcvError::Aggregate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn lookup_passes_a_single_candidates_error_through_unwrapped() {
        let client = DnsClient::new(PerNameExchanger, vec!["127.0.0.1:53".parse().unwrap()], 0, false);

        let candidates = vec!["example.com".to_string()];
        let err = client.lookup(&candidates, Type::TXT).await.unwrap_err();

        assert!(matches!(err, DcvError::Io(_)));
    }
}
