//! File client: HTTPS-or-HTTP GET of a precomputed validation URL.
//!
//! [`FileTransport`] is the mockable seam (mirroring [`crate::dns::client::Exchanger`]):
//! the real [`ReqwestTransport`] uses `reqwest` as the out-of-scope "HTTP
//! transport" collaborator named in the spec, supplying it a custom
//! [`reqwest::dns::Resolve`] so `A` lookups are answered by the CA's
//! configured resolvers rather than the host's, per BR requirements on file
//! validation. Tests substitute a canned [`FileTransport`] instead of
//! hitting the network.

use crate::config::Config;
use crate::dns::client::{DnsClient, Exchanger};
use crate::dns::Type;
use crate::errors::DcvError;
use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

/// Result of one GET, mirroring the four-tuple the spec names:
/// `(url, foundUrl, content, status)`.
#[derive(Clone, Debug)]
pub struct FileFetchResult {
    pub url: String,
    pub found_url: String,
    pub content: String,
    pub status: u16,
}

/// One GET of `url`, returning `(status, foundUrl, body)` with no
/// size/status/emptiness policy applied yet — that's [`FileClient::fetch`]'s
/// job, so every transport enforces the same rules.
#[async_trait]
pub trait FileTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<(u16, String, Vec<u8>), DcvError>;
}

/// Routes `reqwest`'s internal `A` lookups through our own [`DnsClient`]
/// instead of the system resolver.
pub(crate) struct CaResolver<E: Exchanger + 'static> {
    dns: Arc<DnsClient<E>>,
}

impl<E: Exchanger + 'static> CaResolver<E> {
    pub(crate) fn new(dns: Arc<DnsClient<E>>) -> Self {
        CaResolver { dns }
    }
}

impl<E: Exchanger + 'static> Resolve for CaResolver<E> {
    fn resolve(&self, name: Name) -> Resolving {
        let dns = self.dns.clone();
        Box::pin(async move {
            let host = name.as_str().to_string();
            let (records, _) = dns
                .lookup(&[format!("{}.", host)], Type::A)
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;

            let addrs: Vec<SocketAddr> = records
                .into_iter()
                .filter_map(|r| match r.resource {
                    crate::dns::resource::Resource::A(ip) => (ip, 0).to_socket_addrs().ok(),
                    _ => None,
                })
                .flatten()
                .collect();

            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

/// The real HTTP(S) transport, built on `reqwest`.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new<E: Exchanger + 'static>(config: &Config, dns: Arc<DnsClient<E>>) -> Result<Self, DcvError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.file_connect_timeout)
            .timeout(config.file_read_timeout)
            .redirect(reqwest::redirect::Policy::limited(1))
            .dns_resolver(Arc::new(CaResolver::new(dns)))
            .build()?;

        Ok(ReqwestTransport { http })
    }
}

#[async_trait]
impl FileTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<(u16, String, Vec<u8>), DcvError> {
        let resp = self.http.get(url).send().await?;
        let found_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        Ok((status, found_url, bytes.to_vec()))
    }
}

/// Applies the spec's response constraints atop whatever [`FileTransport`]
/// actually fetched the bytes: status must be 200, body non-empty, body
/// size capped.
pub struct FileClient<T: FileTransport> {
    transport: T,
}

impl<T: FileTransport> FileClient<T> {
    pub fn new(transport: T) -> Self {
        FileClient { transport }
    }

    /// Fetches `url`, enforcing the spec's response constraints: status
    /// 200, non-empty body, body capped at `max_body_bytes`.
    pub async fn fetch(&self, url: &str, max_body_bytes: usize) -> Result<FileFetchResult, DcvError> {
        let (status, found_url, bytes) = self.transport.get(url).await?;

        if status != 200 {
            return Err(DcvError::TextParse(format!("unexpected status code {}", status)));
        }

        if bytes.is_empty() {
            return Err(DcvError::TextParse("empty response body".to_string()));
        }

        if bytes.len() > max_body_bytes {
            return Err(DcvError::TextParse(format!(
                "response body exceeds {} byte cap",
                max_body_bytes
            )));
        }

        let content = String::from_utf8_lossy(&bytes).into_owned();

        Ok(FileFetchResult {
            url: url.to_string(),
            found_url,
            content,
            status,
        })
    }
}

/// Builds the well-known validation URL for a domain, per BR 3.2.2.4.18.
pub fn validation_url(domain: &str, filename: &str, https: bool) -> String {
    let scheme = if https { "https" } else { "http" };
    format!("{}://{}/.well-known/pki-validation/{}", scheme, domain, filename)
}

/// Builds the ACME HTTP-01 challenge URL.
pub fn acme_http01_url(domain: &str, token: &str) -> String {
    format!("http://{}/.well-known/acme-challenge/{}", domain, token)
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A canned [`FileTransport`] keyed by exact URL, for handler/MPIC tests
    /// that must not touch the network.
    #[derive(Default)]
    pub struct MockTransport {
        responses: Mutex<HashMap<String, Result<(u16, String, Vec<u8>), String>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_ok(&self, url: &str, status: u16, body: &str) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok((status, url.to_string(), body.as_bytes().to_vec())));
        }

        pub fn set_err(&self, url: &str, message: &str) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), Err(message.to_string()));
        }
    }

    #[async_trait]
    impl FileTransport for MockTransport {
        async fn get(&self, url: &str) -> Result<(u16, String, Vec<u8>), DcvError> {
            match self.responses.lock().unwrap().get(url) {
                Some(Ok(v)) => Ok(v.clone()),
                Some(Err(e)) => Err(DcvError::Io(e.clone())),
                None => Err(DcvError::Io(format!("no mock response configured for {}", url))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::MockTransport;
    use super::*;

    #[tokio::test]
    async fn fetch_enforces_status_and_emptiness() {
        let mock = MockTransport::new();
        mock.set_ok("http://example.com/ok", 200, "hello world");
        mock.set_ok("http://example.com/notfound", 404, "nope");
        mock.set_ok("http://example.com/empty", 200, "");

        let client = FileClient::new(mock);

        let ok = client.fetch("http://example.com/ok", 65536).await.unwrap();
        assert_eq!(ok.content, "hello world");

        assert!(client.fetch("http://example.com/notfound", 65536).await.is_err());
        assert!(client.fetch("http://example.com/empty", 65536).await.is_err());
    }

    #[tokio::test]
    async fn fetch_enforces_body_cap() {
        let mock = MockTransport::new();
        mock.set_ok("http://example.com/big", 200, &"x".repeat(100));

        let client = FileClient::new(mock);
        assert!(client.fetch("http://example.com/big", 10).await.is_err());
    }
}
