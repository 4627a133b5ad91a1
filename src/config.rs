//! Immutable configuration for a [`crate::Context`].
//!
//! Constructed once via [`ConfigBuilder`] and shared (by reference) across
//! every component; nothing here is mutated after `build()`.

use crate::errors::DcvError;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub dns_servers: Vec<SocketAddr>,
    pub dns_timeout: Duration,
    pub dns_retries: u32,
    pub dns_udp_read_timeout: Duration,
    pub dns_tcp_connect_timeout: Duration,

    pub random_value_validity_window: Duration,
    pub min_random_value_length: usize,
    pub clock_skew: Duration,

    pub file_validation_filename: String,
    pub file_validation_max_body_bytes: usize,
    pub file_validation_check_https: bool,
    pub file_connect_timeout: Duration,
    pub file_read_timeout: Duration,

    pub dns_domain_label: String,

    pub mpic_quorum: usize,
    pub mpic_total_secondaries: usize,
    pub mpic_total_deadline: Duration,

    pub log_level_for_dcv_errors: log::Level,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

#[derive(Debug)]
pub struct ConfigBuilder {
    dns_servers: Vec<SocketAddr>,
    dns_timeout: Duration,
    dns_retries: u32,
    dns_udp_read_timeout: Duration,
    dns_tcp_connect_timeout: Duration,

    random_value_validity_window: Duration,
    min_random_value_length: usize,
    clock_skew: Duration,

    file_validation_filename: String,
    file_validation_max_body_bytes: usize,
    file_validation_check_https: bool,
    file_connect_timeout: Duration,
    file_read_timeout: Duration,

    dns_domain_label: String,

    mpic_quorum: usize,
    mpic_total_secondaries: usize,
    mpic_total_deadline: Duration,

    log_level_for_dcv_errors: log::Level,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder {
            dns_servers: Vec::new(),
            dns_timeout: Duration::from_millis(2000),
            dns_retries: 3,
            dns_udp_read_timeout: Duration::from_secs(2),
            dns_tcp_connect_timeout: Duration::from_secs(2),

            random_value_validity_window: Duration::from_secs(30 * 24 * 3600),
            min_random_value_length: 32,
            clock_skew: Duration::from_secs(5),

            file_validation_filename: "fileauth.txt".to_string(),
            file_validation_max_body_bytes: 65536,
            file_validation_check_https: false,
            file_connect_timeout: Duration::from_secs(2),
            file_read_timeout: Duration::from_secs(30),

            dns_domain_label: String::new(),

            mpic_quorum: 2,
            mpic_total_secondaries: 3,
            mpic_total_deadline: Duration::from_secs(20),

            log_level_for_dcv_errors: log::Level::Info,
        }
    }
}

impl ConfigBuilder {
    pub fn dns_servers(mut self, servers: Vec<SocketAddr>) -> Self {
        self.dns_servers = servers;
        self
    }

    pub fn dns_timeout(mut self, d: Duration) -> Self {
        self.dns_timeout = d;
        self
    }

    pub fn dns_retries(mut self, n: u32) -> Self {
        self.dns_retries = n;
        self
    }

    pub fn random_value_validity_window(mut self, d: Duration) -> Self {
        self.random_value_validity_window = d;
        self
    }

    pub fn min_random_value_length(mut self, n: usize) -> Self {
        self.min_random_value_length = n;
        self
    }

    pub fn file_validation_filename(mut self, s: impl Into<String>) -> Self {
        self.file_validation_filename = s.into();
        self
    }

    pub fn file_validation_max_body_bytes(mut self, n: usize) -> Self {
        self.file_validation_max_body_bytes = n;
        self
    }

    pub fn file_validation_check_https(mut self, b: bool) -> Self {
        self.file_validation_check_https = b;
        self
    }

    pub fn dns_domain_label(mut self, s: impl Into<String>) -> Self {
        self.dns_domain_label = s.into();
        self
    }

    pub fn mpic_quorum(mut self, n: usize) -> Self {
        self.mpic_quorum = n;
        self
    }

    pub fn mpic_total_secondaries(mut self, n: usize) -> Self {
        self.mpic_total_secondaries = n;
        self
    }

    pub fn mpic_total_deadline(mut self, d: Duration) -> Self {
        self.mpic_total_deadline = d;
        self
    }

    /// Validates and freezes the configuration. `mpicTotalSecondaries` must
    /// be at least `mpicQuorum + 1` (and never below 3, the BRs' minimum
    /// perspective count) — a quorum of 2 needs at least 3 secondaries to
    /// ever be satisfiable. Violating this is rejected here, at
    /// construction time, rather than silently tolerated and discovered
    /// later inside `validate()`.
    pub fn build(self) -> Result<Config, DcvError> {
        if self.dns_servers.is_empty() {
            return Err(DcvError::Config("dnsServers must not be empty".to_string()));
        }

        if self.mpic_quorum == 0 {
            return Err(DcvError::Config("mpicQuorum must be at least 1".to_string()));
        }

        let floor = (self.mpic_quorum + 1).max(3);
        if self.mpic_total_secondaries < floor {
            return Err(DcvError::Config(format!(
                "mpicTotalSecondaries ({}) must be at least {} (mpicQuorum + 1, floored at 3)",
                self.mpic_total_secondaries, floor
            )));
        }

        Ok(Config {
            dns_servers: self.dns_servers,
            dns_timeout: self.dns_timeout,
            dns_retries: self.dns_retries,
            dns_udp_read_timeout: self.dns_udp_read_timeout,
            dns_tcp_connect_timeout: self.dns_tcp_connect_timeout,

            random_value_validity_window: self.random_value_validity_window,
            min_random_value_length: self.min_random_value_length,
            clock_skew: self.clock_skew,

            file_validation_filename: self.file_validation_filename,
            file_validation_max_body_bytes: self.file_validation_max_body_bytes,
            file_validation_check_https: self.file_validation_check_https,
            file_connect_timeout: self.file_connect_timeout,
            file_read_timeout: self.file_read_timeout,

            dns_domain_label: self.dns_domain_label,

            mpic_quorum: self.mpic_quorum,
            mpic_total_secondaries: self.mpic_total_secondaries,
            mpic_total_deadline: self.mpic_total_deadline,

            log_level_for_dcv_errors: self.log_level_for_dcv_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_secondaries_below_the_quorum_floor() {
        let result = Config::builder()
            .dns_servers(vec!["127.0.0.1:53".parse().unwrap()])
            .mpic_quorum(5)
            .mpic_total_secondaries(2)
            .build();

        assert!(matches!(result, Err(DcvError::Config(_))));
    }

    #[test]
    fn build_accepts_secondaries_at_the_quorum_floor() {
        let config = Config::builder()
            .dns_servers(vec!["127.0.0.1:53".parse().unwrap()])
            .mpic_quorum(2)
            .mpic_total_secondaries(3)
            .build()
            .unwrap();

        assert_eq!(config.mpic_total_secondaries, 3);
    }
}
